mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN_PASSWORD, ADMIN_USERNAME};
use medical_records_service::services::{INVALID_CREDENTIALS, PLACEHOLDER_TOKEN};
use serde_json::json;

#[tokio::test]
async fn login_with_correct_credentials_succeeds() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/admin/login",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["token"], PLACEHOLDER_TOKEN);
}

#[tokio::test]
async fn wrong_password_and_wrong_username_are_indistinguishable() {
    let app = TestApp::new();

    let wrong_password = app
        .post(
            "/api/admin/login",
            json!({ "username": ADMIN_USERNAME, "password": "not it" }),
        )
        .await;
    let wrong_username = app
        .post(
            "/api/admin/login",
            json!({ "username": "someone-else", "password": ADMIN_PASSWORD }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_username.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, wrong_username.body);
    assert_eq!(wrong_password.json()["error"], INVALID_CREDENTIALS);
}

#[tokio::test]
async fn empty_or_unreadable_credentials_get_the_same_401() {
    let app = TestApp::new();

    let wrong_password = app
        .post(
            "/api/admin/login",
            json!({ "username": ADMIN_USERNAME, "password": "not it" }),
        )
        .await;
    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);

    let bodies = [
        json!({ "username": ADMIN_USERNAME, "password": "" }),
        json!({ "username": "", "password": "" }),
        json!({}),
        json!({ "username": 5 }),
    ];
    for body in bodies {
        let response = app.post("/api/admin/login", body.clone()).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "body {}", body);
        assert_eq!(response.body, wrong_password.body, "body {}", body);
    }

    let response = app
        .raw(Method::POST, "/api/admin/login", None, "username=admin")
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json()["error"], INVALID_CREDENTIALS);
}
