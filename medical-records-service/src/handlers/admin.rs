use axum::{extract::State, Json};
use service_core::error::AppError;
use service_core::extract::ApiJson;
use validator::Validate;

use crate::dtos::{LoginRequest, LoginResponse};
use crate::services::{invalid_credentials, record_login};
use crate::utils::Password;
use crate::AppState;

/// Every failure, including an unreadable or empty body, is the same 401.
#[tracing::instrument(skip(state, payload))]
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<ApiJson<LoginRequest>, AppError>,
) -> Result<Json<LoginResponse>, AppError> {
    let request = match payload {
        Ok(ApiJson(request)) if request.validate().is_ok() => request,
        Ok(_) => {
            record_login("failure");
            tracing::warn!("Admin login rejected: empty credentials");
            return Err(invalid_credentials());
        }
        Err(e) => {
            record_login("failure");
            tracing::warn!(error = %e, "Admin login rejected: unreadable body");
            return Err(invalid_credentials());
        }
    };

    let username = request.username.clone();
    match state
        .admin
        .login(request.username, Password::new(request.password))
        .await
    {
        Ok(token) => {
            record_login("success");
            tracing::info!(username = %username, "Admin login succeeded");
            Ok(Json(LoginResponse {
                success: true,
                token,
            }))
        }
        Err(e) => {
            record_login("failure");
            tracing::warn!(username = %username, "Admin login rejected");
            Err(e)
        }
    }
}
