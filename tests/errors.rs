use axum::{http::StatusCode, response::IntoResponse};
use serde_json::Value;
use shop_admin_api::{error::AppError, services::otp::CodeError};

async fn body_json(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[test]
fn variants_map_to_statuses() {
    assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::OrmError(sea_orm::DbErr::Custom("boom".into())).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        AppError::Internal(anyhow::anyhow!("boom")).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn code_errors_are_bad_requests() {
    let err: AppError = CodeError::Missing.into();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn errors_render_the_envelope() {
    let (status, body) = body_json(AppError::BadRequest("Basket is empty".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request Basket is empty");
    assert_eq!(body["data"]["error"], "Bad Request Basket is empty");
    assert!(body["meta"].is_object());
}

#[tokio::test]
async fn internal_details_are_not_leaked() {
    let (status, body) =
        body_json(AppError::OrmError(sea_orm::DbErr::Custom("password=hunter2".into()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.to_string().contains("hunter2"));
}
