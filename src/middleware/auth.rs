use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use uuid::Uuid;

use crate::{
    dto::auth::TokenKind, error::AppError, services::token_service::decode_token,
    state::AppState,
};

/// Caller identity taken from a valid access token. Says nothing about permissions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        let claims = decode_token(&state.config.jwt_secret, token, TokenKind::Access)?;
        Ok(AuthUser {
            user_id: claims.user_id()?,
        })
    }
}
