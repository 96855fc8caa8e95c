//! The reqwest transport against a local HTTP server.

use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use backoffice_client::{AuthApi, Client, ClientConfig, Error, SettingsApi};
use backoffice_proto::{Credentials, PrincipalKind};

async fn sign_in(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            [(header::SET_COOKIE, "ignored=1; Path=/")],
            Json(json!({"message": "Invalid credentials", "statusCode": 401})),
        );
    }
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "access=valid; Path=/")],
        Json(json!({
            "data": {
                "user": {"id": 1, "username": "root", "role": {"name": "Admin", "value": "admin",
                    "rolePermissions": [{"permission": {"actionKey": "admin-view"}}]}},
                "type": "admin"
            },
            "message": "Signed in",
            "statusCode": 200
        })),
    )
}

async fn me(headers: HeaderMap) -> impl IntoResponse {
    let authenticated = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("access=valid"))
        .unwrap_or(false);

    if !authenticated {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthorized", "statusCode": 401})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "data": {"id": 1, "username": "root", "role": {"name": "Admin", "value": "admin"}},
            "statusCode": 200
        })),
    )
}

async fn refresh() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "No refresh token", "statusCode": 401})),
    )
}

async fn appearance() -> impl IntoResponse {
    Json(json!({
        "data": [{"module": "appearance", "key": "theme", "value": "dark"}],
        "statusCode": 200
    }))
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/me", get(me))
        .route("/auth/refresh", post(refresh))
        .route("/settings/module/appearance", get(appearance));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_cookie_session_round_trip() {
    let base_url = spawn_server().await;
    let client = Arc::new(Client::new(ClientConfig::new(base_url)).unwrap());
    let auth = AuthApi::new(client.clone());

    // No cookie yet: the session check fails and the refresh cannot help.
    let err = auth.who_am_i().await.unwrap_err();
    assert!(err.is_auth_expired());

    let principal = auth
        .sign_in(&Credentials::new("root@example.com", "secret"))
        .await
        .unwrap();
    assert_eq!(principal.kind, PrincipalKind::Admin);
    assert_eq!(principal.role.action_keys().collect::<Vec<_>>(), vec!["admin-view"]);

    // The cookie set by sign-in is sent back automatically.
    let me = auth.who_am_i().await.unwrap();
    assert_eq!(me.id, principal.id);

    let settings = SettingsApi::new(client).by_module("appearance").await.unwrap();
    assert_eq!(settings[0].as_str(), Some("dark"));
}

#[tokio::test]
async fn test_wrong_password_is_a_plain_http_error() {
    let base_url = spawn_server().await;
    let client = Arc::new(Client::new(ClientConfig::new(base_url)).unwrap());
    let auth = AuthApi::new(client);

    let err = auth
        .sign_in(&Credentials::new("root@example.com", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Http {
            status: 401,
            message: "Invalid credentials".into()
        }
    );
}

#[tokio::test]
async fn test_unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(ClientConfig::new(format!("http://{}", addr))).unwrap();
    let err = client.get_data::<serde_json::Value>("/roles").await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}
