mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use shop_admin_api::{
    dto::auth::TokenKind, routes::create_app, services::token_service::encode_token,
};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    create_app(common::offline_state())
}

fn token(kind: TokenKind) -> String {
    encode_token(
        common::JWT_SECRET,
        Uuid::new_v4(),
        kind,
        Uuid::new_v4(),
        Utc::now(),
        Duration::minutes(5),
    )
    .expect("token")
}

async fn send(request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app().oneshot(request).await.expect("response");
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, request_id, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_is_public_and_tagged_with_a_request_id() {
    let (status, request_id, body) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(request_id.is_some());
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn unknown_paths_get_the_not_found_envelope() {
    let (status, _, body) = send(get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["error"], "Not Found");
    assert!(body["meta"].is_object());
}

#[tokio::test]
async fn resources_require_a_bearer_token() {
    let (status, _, body) = send(get("/api/products")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("Authorization"));

    let request = Request::builder()
        .uri("/api/orders")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_tokens_are_not_access_tokens() {
    let request = Request::builder()
        .uri("/api/roles")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token(TokenKind::Refresh)),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized Invalid token type");
}

#[tokio::test]
async fn malformed_list_query_is_rejected_before_any_lookup() {
    let request = Request::builder()
        .uri("/api/products?limit=abc")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token(TokenKind::Access)),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn malformed_json_body_is_a_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/sign-in")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"mobile\":"))
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn wrong_method_is_not_routed() {
    let request = Request::builder()
        .method("PUT")
        .uri("/api/transactions")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
