use crate::config::AdminConfig;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Returned on successful login. It is a fixed marker, not a session: nothing
/// downstream checks it.
pub const PLACEHOLDER_TOKEN: &str = "admin-placeholder-token";

/// Same message for every rejected login, whatever the cause.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn invalid_credentials() -> AppError {
    AppError::Unauthorized(anyhow::anyhow!(INVALID_CREDENTIALS))
}

struct AdminCredentials {
    username: String,
    password_hash: PasswordHashString,
}

impl AdminCredentials {
    fn matches(&self, username: &str, password: &Password) -> bool {
        let username_ok: bool = self.username.as_bytes().ct_eq(username.as_bytes()).into();
        // Always run the hash check so timing does not reveal a bad username.
        let password_ok = verify_password(password, &self.password_hash).is_ok();
        username_ok & password_ok
    }
}

/// Checks login attempts against the single configured admin account.
#[derive(Clone)]
pub struct AdminAuthenticator {
    credentials: Arc<AdminCredentials>,
}

impl AdminAuthenticator {
    /// Hashes the configured password once; the plaintext is not retained.
    pub fn from_config(config: &AdminConfig) -> Result<Self, AppError> {
        let password = Password::new(config.password.expose_secret().clone());
        let password_hash = hash_password(&password).map_err(AppError::ConfigError)?;

        tracing::info!(username = %config.username, "Admin credentials loaded");

        Ok(Self {
            credentials: Arc::new(AdminCredentials {
                username: config.username.clone(),
                password_hash,
            }),
        })
    }

    pub async fn login(&self, username: String, password: Password) -> Result<String, AppError> {
        let credentials = Arc::clone(&self.credentials);
        let matched = tokio::task::spawn_blocking(move || credentials.matches(&username, &password))
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Login task failed: {}", e)))?;

        if matched {
            Ok(PLACEHOLDER_TOKEN.to_string())
        } else {
            Err(invalid_credentials())
        }
    }
}
