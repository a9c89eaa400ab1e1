#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use medical_records_service::config::AdminConfig;
use medical_records_service::services::{AdminAuthenticator, InMemoryRecordStore};
use medical_records_service::{build_router, AppState};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/public");

/// Router wired to an in-memory store, so tests run without MongoDB.
pub struct TestApp {
    pub router: Router,
    pub store: InMemoryRecordStore,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryRecordStore::new();
        let admin = AdminAuthenticator::from_config(&AdminConfig {
            username: ADMIN_USERNAME.to_string(),
            password: Secret::new(ADMIN_PASSWORD.to_string()),
        })
        .expect("Failed to build admin authenticator");

        let state = AppState::new(Arc::new(store.clone()), admin);

        Self {
            router: build_router(state, STATIC_DIR),
            store,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    /// Sends a body verbatim, with an optional content type.
    pub async fn raw(
        &self,
        method: Method,
        uri: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body: bytes.to_vec(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// Creates a record and returns its id.
    pub async fn create(&self, payload: Value) -> String {
        let response = self.post("/api/medical", payload).await;
        assert_eq!(response.status, StatusCode::CREATED);
        response.json()["id"]
            .as_str()
            .expect("create response should carry an id")
            .to_string()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn sample_record() -> Value {
    json!({
        "serviceCode": "A1",
        "idNumber": "123",
        "name": "X",
        "issueDate": "2024-01-01",
        "startDate": "2024-01-01",
        "endDate": "2024-01-10",
        "duration": 9,
        "doctor": "Dr. Y",
        "jobTitle": "Engineer"
    })
}

pub fn sample_record_with(field: &str, value: Value) -> Value {
    let mut payload = sample_record();
    payload[field] = value;
    payload
}
