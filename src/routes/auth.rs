use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::auth::{
        CodeIssued, ForgotPasswordRequest, RefreshRequest, ResetPasswordRequest, SignInRequest,
        SignUpRequest, TokenPair, VerifyRequest,
    },
    error::AppResult,
    extract::AppJson,
    middleware::auth::AuthUser,
    models::UserProfile,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/verify", post(verify))
        .route("/sign-in", post(sign_in))
        .route("/refresh", post(refresh))
        .route("/sign-out", post(sign_out))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "Verification code sent", body = ApiResponse<CodeIssued>),
        (status = 400, description = "Mobile already registered or code requests blocked")
    ),
    tag = "Auth"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignUpRequest>,
) -> AppResult<Json<ApiResponse<CodeIssued>>> {
    let resp = auth_service::sign_up(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Account verified", body = ApiResponse<TokenPair>),
        (status = 400, description = "Invalid, expired or blocked code"),
        (status = 404, description = "Unknown mobile")
    ),
    tag = "Auth"
)]
pub async fn verify(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = auth_service::verify(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<TokenPair>),
        (status = 400, description = "Invalid credentials"),
        (status = 403, description = "Account disabled")
    ),
    tag = "Auth"
)]
pub async fn sign_in(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignInRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = auth_service::sign_in(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Refresh token invalid, expired or revoked")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let resp = auth_service::refresh(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh token revoked"),
        (status = 401, description = "Refresh token invalid")
    ),
    tag = "Auth"
)]
pub async fn sign_out(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::sign_out(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code sent", body = ApiResponse<CodeIssued>),
        (status = 400, description = "Code requests blocked"),
        (status = 404, description = "Unknown or unverified mobile")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<CodeIssued>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset, all sessions revoked"),
        (status = 400, description = "Invalid, expired or blocked code"),
        (status = 404, description = "Unknown or unverified mobile")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = auth_service::me(&state, &user).await?;
    Ok(Json(resp))
}
