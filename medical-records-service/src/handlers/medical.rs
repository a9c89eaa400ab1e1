use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use service_core::error::AppError;
use service_core::extract::{ApiJson, ApiQuery};

use crate::dtos::{CreateRecordResponse, MedicalRecordResponse, MessageResponse, SearchParams};
use crate::models::{validate_new_record, validate_patch, MedicalRecord};
use crate::services::record_operation;
use crate::AppState;

/// Malformed ids are reported the same way as unknown ones.
fn parse_record_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw)
        .map_err(|_| AppError::NotFound(anyhow::anyhow!("Record not found: {}", raw)))
}

fn record_not_found(id: &ObjectId) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Record not found: {}", id.to_hex()))
}

/// Counts the outcome of one record operation and passes the result through.
fn track<T>(operation: &'static str, result: Result<T, AppError>) -> Result<T, AppError> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::BadRequest(_)) | Err(AppError::ValidationError(_)) => "invalid",
        Err(_) => "error",
    };
    record_operation(operation, outcome);
    result
}

#[tracing::instrument(skip(state, payload))]
pub async fn create_record(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<(StatusCode, Json<CreateRecordResponse>), AppError> {
    track(
        "create",
        async {
            let input = validate_new_record(&payload).map_err(|errors| {
                let fields: Vec<&str> = errors.fields().collect();
                tracing::warn!(?fields, "Rejected medical record");
                errors
            })?;

            let record = MedicalRecord::new(input);
            state.store.insert(&record).await?;

            let id = record.id.to_hex();
            tracing::info!(record_id = %id, "Medical record created");

            Ok::<_, AppError>((
                StatusCode::CREATED,
                Json(CreateRecordResponse {
                    message: "Record saved successfully".to_string(),
                    id,
                }),
            ))
        }
        .await,
    )
}

#[tracing::instrument(skip(state))]
pub async fn list_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<MedicalRecordResponse>>, AppError> {
    let records = track("list", state.store.list_newest_first().await)?;
    Ok(Json(
        records
            .into_iter()
            .map(MedicalRecordResponse::from)
            .collect(),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MedicalRecordResponse>, AppError> {
    track(
        "get",
        async {
            let id = parse_record_id(&id)?;
            let record = state
                .store
                .find_by_id(&id)
                .await?
                .ok_or_else(|| record_not_found(&id))?;
            Ok::<_, AppError>(Json(MedicalRecordResponse::from(record)))
        }
        .await,
    )
}

#[tracing::instrument(skip(state))]
pub async fn search_records(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<MedicalRecordResponse>, AppError> {
    track(
        "search",
        async {
            let missing = params.missing();
            if !missing.is_empty() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Missing required query parameters: {}",
                    missing.join(", ")
                )));
            }

            let id_number = params.id_number.unwrap_or_default();
            let service_code = params.service_code.unwrap_or_default();

            let record = state
                .store
                .find_by_subject(&id_number, &service_code)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!(
                        "No record matches idNumber '{}' and serviceCode '{}'",
                        id_number,
                        service_code
                    ))
                })?;
            Ok::<_, AppError>(Json(MedicalRecordResponse::from(record)))
        }
        .await,
    )
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<MedicalRecordResponse>, AppError> {
    track(
        "update",
        async {
            let id = parse_record_id(&id)?;
            let patch = validate_patch(&payload)?;

            let record = state
                .store
                .update(&id, patch)
                .await?
                .ok_or_else(|| record_not_found(&id))?;

            tracing::info!(record_id = %id.to_hex(), "Medical record updated");
            Ok::<_, AppError>(Json(MedicalRecordResponse::from(record)))
        }
        .await,
    )
}

#[tracing::instrument(skip(state))]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    track(
        "delete",
        async {
            let id = parse_record_id(&id)?;
            if !state.store.delete(&id).await? {
                return Err(record_not_found(&id));
            }

            tracing::info!(record_id = %id.to_hex(), "Medical record deleted");
            Ok::<_, AppError>(Json(MessageResponse {
                message: "Record deleted successfully".to_string(),
            }))
        }
        .await,
    )
}
