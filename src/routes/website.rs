use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::website::UpsertWebsiteRequest,
    error::AppResult,
    extract::AppJson,
    middleware::auth::AuthUser,
    models::WebsiteInfo,
    response::ApiResponse,
    services::website_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_website).put(upsert_website))
}

#[utoipa::path(
    get,
    path = "/api/website",
    responses(
        (status = 200, description = "Website information", body = ApiResponse<WebsiteInfo>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not configured yet")
    ),
    security(("bearer_auth" = [])),
    tag = "Website"
)]
pub async fn get_website(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WebsiteInfo>>> {
    let resp = website_service::get_website(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/website",
    request_body = UpsertWebsiteRequest,
    responses(
        (status = 200, description = "Website information saved", body = ApiResponse<WebsiteInfo>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Website"
)]
pub async fn upsert_website(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpsertWebsiteRequest>,
) -> AppResult<Json<ApiResponse<WebsiteInfo>>> {
    let resp = website_service::upsert_website(&state, &user, payload).await?;
    Ok(Json(resp))
}
