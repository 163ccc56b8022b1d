use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, prelude::DateTimeWithTimeZone,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::auth::{Claims, TokenKind, TokenPair},
    entity::{RefreshTokens, refresh_tokens},
    error::{AppError, AppResult},
    state::AppState,
};

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))
    }

    pub fn token_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.jti)
            .map_err(|_| AppError::Unauthorized("Invalid token id".into()))
    }
}

pub fn encode_token(
    secret: &str,
    user_id: Uuid,
    kind: TokenKind,
    jti: Uuid,
    now: DateTime<Utc>,
    ttl: Duration,
) -> AppResult<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        kind,
        jti: jti.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Validates signature, expiry and that the token is of the `expected` kind.
pub fn decode_token(secret: &str, token: &str, expected: TokenKind) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if decoded.claims.kind != expected {
        return Err(AppError::Unauthorized("Invalid token type".into()));
    }
    Ok(decoded.claims)
}

/// Signs an access/refresh pair and records the refresh token so it can be rotated or revoked.
pub async fn issue_pair(state: &AppState, user_id: Uuid) -> AppResult<TokenPair> {
    let config = &state.config;
    let now = Utc::now();

    let access_token = encode_token(
        &config.jwt_secret,
        user_id,
        TokenKind::Access,
        Uuid::new_v4(),
        now,
        config.access_token_ttl,
    )?;

    let refresh_id = Uuid::new_v4();
    let refresh_token = encode_token(
        &config.jwt_secret,
        user_id,
        TokenKind::Refresh,
        refresh_id,
        now,
        config.refresh_token_ttl,
    )?;

    refresh_tokens::ActiveModel {
        id: Set(refresh_id),
        user_id: Set(user_id),
        expires_at: Set((now + config.refresh_token_ttl).into()),
        revoked_at: Set(None),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl.num_seconds(),
    })
}

/// Marks one live refresh token revoked. Returns false when it was unknown or already revoked.
pub async fn revoke(state: &AppState, token_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = RefreshTokens::update_many()
        .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(now))
        .filter(refresh_tokens::Column::Id.eq(token_id))
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .filter(refresh_tokens::Column::RevokedAt.is_null())
        .exec(&state.orm)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn revoke_all(state: &AppState, user_id: Uuid) -> AppResult<u64> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = RefreshTokens::update_many()
        .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(now))
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .filter(refresh_tokens::Column::RevokedAt.is_null())
        .exec(&state.orm)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn decoded_claims_carry_subject_and_kind() {
        let user_id = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let token = encode_token(
            SECRET,
            user_id,
            TokenKind::Refresh,
            jti,
            Utc::now(),
            Duration::minutes(5),
        )
        .expect("encode");

        let claims = decode_token(SECRET, &token, TokenKind::Refresh).expect("decode");
        assert_eq!(claims.user_id().expect("sub"), user_id);
        assert_eq!(claims.token_id().expect("jti"), jti);
    }

    #[test]
    fn wrong_kind_or_secret_is_unauthorized() {
        let token = encode_token(
            SECRET,
            Uuid::new_v4(),
            TokenKind::Refresh,
            Uuid::new_v4(),
            Utc::now(),
            Duration::minutes(5),
        )
        .expect("encode");

        assert!(matches!(
            decode_token(SECRET, &token, TokenKind::Access),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            decode_token("other-secret", &token, TokenKind::Refresh),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issued = Utc::now() - Duration::hours(2);
        let token = encode_token(
            SECRET,
            Uuid::new_v4(),
            TokenKind::Access,
            Uuid::new_v4(),
            issued,
            Duration::minutes(5),
        )
        .expect("encode");
        assert!(decode_token(SECRET, &token, TokenKind::Access).is_err());
    }
}
