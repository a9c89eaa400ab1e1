pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::services::{AdminAuthenticator, MedicalRecordStore};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared request state. Everything here is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MedicalRecordStore>,
    pub admin: AdminAuthenticator,
}

impl AppState {
    pub fn new(store: Arc<dyn MedicalRecordStore>, admin: AdminAuthenticator) -> Self {
        Self { store, admin }
    }
}

/// Builds the HTTP router: record API, admin login, probes, and the static
/// front-end served from `static_dir` with `index.html` for unknown paths.
pub fn build_router(state: AppState, static_dir: &str) -> Router {
    let frontend = ServeDir::new(static_dir)
        .fallback(ServeFile::new(Path::new(static_dir).join("index.html")));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/api/medical",
            post(handlers::create_record).get(handlers::list_records),
        )
        .route("/api/medical/search", get(handlers::search_records))
        .route(
            "/api/medical/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route("/api/admin/login", post(handlers::admin_login))
        .fallback_service(frontend)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
}
