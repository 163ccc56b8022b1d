use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    admin_log::record_auth_event,
    dto::auth::{
        CodeIssued, ForgotPasswordRequest, RefreshRequest, ResetPasswordRequest, SignInRequest,
        SignUpRequest, TokenKind, TokenPair, VerifyRequest,
    },
    entity::{ForgotPasswords, RefreshTokens, Users, forgot_passwords, users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::UserProfile,
    notify::CodePurpose,
    response::{ApiResponse, Meta},
    services::{
        otp::{self, CodeState},
        password::{hash_secret, validate_password, verify_secret},
        resource::ensure_absent,
        token_service,
    },
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid mobile or password";

/// Trims and checks a mobile number: optional leading `+`, then 7 to 15 digits.
pub fn normalize_mobile(raw: &str) -> AppResult<String> {
    let mobile = raw.trim();
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Invalid mobile number".into()));
    }
    Ok(mobile.to_string())
}

fn verify_state(user: &users::Model) -> CodeState {
    CodeState {
        code_hash: user.verify_code_hash.clone(),
        expires_at: user.verify_code_expires_at.map(|at| at.with_timezone(&Utc)),
        attempts: user.verify_attempts,
        blocked_until: user.verify_blocked_until.map(|at| at.with_timezone(&Utc)),
    }
}

fn apply_verify_state(active: &mut users::ActiveModel, code: &CodeState) {
    active.verify_code_hash = Set(code.code_hash.clone());
    active.verify_code_expires_at = Set(code.expires_at.map(Into::into));
    active.verify_attempts = Set(code.attempts);
    active.verify_blocked_until = Set(code.blocked_until.map(Into::into));
}

fn reset_state(row: &forgot_passwords::Model) -> CodeState {
    CodeState {
        code_hash: row.code_hash.clone(),
        expires_at: row.expires_at.map(|at| at.with_timezone(&Utc)),
        attempts: row.attempts,
        blocked_until: row.blocked_until.map(|at| at.with_timezone(&Utc)),
    }
}

fn apply_reset_state(active: &mut forgot_passwords::ActiveModel, code: &CodeState) {
    active.code_hash = Set(code.code_hash.clone());
    active.expires_at = Set(code.expires_at.map(Into::into));
    active.attempts = Set(code.attempts);
    active.blocked_until = Set(code.blocked_until.map(Into::into));
}

async fn find_by_mobile(state: &AppState, mobile: &str) -> AppResult<Option<users::Model>> {
    Ok(Users::find()
        .filter(users::Column::Mobile.eq(mobile))
        .one(&state.orm)
        .await?)
}

fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
}

pub async fn sign_up(
    state: &AppState,
    payload: SignUpRequest,
) -> AppResult<ApiResponse<CodeIssued>> {
    let mobile = normalize_mobile(&payload.mobile)?;
    validate_password(&payload.password)?;
    let email = normalize_email(payload.email);
    let password_hash = hash_secret(&payload.password)?;
    let now = Utc::now();

    let existing = find_by_mobile(state, &mobile).await?;
    if let Some(email) = &email {
        let mut taken = Users::find().filter(users::Column::Email.eq(email.as_str()));
        if let Some(user) = &existing {
            taken = taken.filter(users::Column::Id.ne(user.id));
        }
        ensure_absent(state, taken, "Email is already taken").await?;
    }

    if let Some(user) = existing.as_ref().filter(|user| user.is_verified) {
        record_auth_event(
            state,
            Some(user.id),
            &mobile,
            "sign_up",
            false,
            Some("already registered".into()),
        )
        .await;
        return Err(AppError::BadRequest("Mobile is already registered".into()));
    }

    // The code is issued before anything is written so a blocked account stays untouched.
    let mut code_state = existing.as_ref().map(verify_state).unwrap_or_default();
    let code = otp::generate_code();
    let expires_at = match code_state.issue(hash_secret(&code)?, now, &state.config.otp) {
        Ok(expires_at) => expires_at,
        Err(err) => {
            record_auth_event(
                state,
                existing.as_ref().map(|user| user.id),
                &mobile,
                "sign_up",
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err.into());
        }
    };

    let user = match existing {
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.password_hash = Set(password_hash);
            active.first_name = Set(payload.first_name);
            active.last_name = Set(payload.last_name);
            active.email = Set(email);
            apply_verify_state(&mut active, &code_state);
            active.updated_at = Set(now.into());
            active.update(&state.orm).await?
        }
        None => {
            let mut active = users::ActiveModel {
                id: Set(Uuid::new_v4()),
                code: NotSet,
                mobile: Set(mobile.clone()),
                email: Set(email),
                first_name: Set(payload.first_name),
                last_name: Set(payload.last_name),
                password_hash: Set(password_hash),
                is_verified: Set(false),
                is_staff: Set(false),
                is_super_admin: Set(false),
                is_active: Set(true),
                roles: Set(Vec::new()),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            apply_verify_state(&mut active, &code_state);
            active.insert(&state.orm).await?
        }
    };
    let user_id = user.id;

    state.codes.send(&mobile, &code, CodePurpose::Verification)?;
    record_auth_event(state, Some(user_id), &mobile, "sign_up", true, None).await;

    Ok(ApiResponse::success(
        "Verification code sent",
        CodeIssued { mobile, expires_at },
        Some(Meta::empty()),
    ))
}

pub async fn verify(state: &AppState, payload: VerifyRequest) -> AppResult<ApiResponse<TokenPair>> {
    let mobile = normalize_mobile(&payload.mobile)?;
    let user = match find_by_mobile(state, &mobile).await? {
        Some(user) => user,
        None => return Err(AppError::NotFound),
    };
    if user.is_verified {
        return Err(AppError::BadRequest("Account is already verified".into()));
    }

    let now = Utc::now();
    let mut code_state = verify_state(&user);
    let outcome = code_state.check(
        |hash| verify_secret(payload.code.trim(), hash),
        now,
        &state.config.otp,
    );

    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    apply_verify_state(&mut active, &code_state);
    if outcome.is_ok() {
        active.is_verified = Set(true);
    }
    active.updated_at = Set(now.into());
    active.update(&state.orm).await?;

    if let Err(err) = outcome {
        record_auth_event(state, Some(user_id), &mobile, "verify", false, Some(err.to_string()))
            .await;
        return Err(err.into());
    }
    record_auth_event(state, Some(user_id), &mobile, "verify", true, None).await;

    let pair = token_service::issue_pair(state, user_id).await?;
    Ok(ApiResponse::success("Account verified", pair, Some(Meta::empty())))
}

pub async fn sign_in(
    state: &AppState,
    payload: SignInRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let mobile = normalize_mobile(&payload.mobile)
        .map_err(|_| AppError::BadRequest(INVALID_CREDENTIALS.into()))?;

    let user = match find_by_mobile(state, &mobile).await? {
        Some(user) => user,
        None => {
            record_auth_event(state, None, &mobile, "sign_in", false, Some("unknown mobile".into()))
                .await;
            return Err(AppError::BadRequest(INVALID_CREDENTIALS.into()));
        }
    };

    if !verify_secret(&payload.password, &user.password_hash) {
        let reason = Some("wrong password".to_string());
        record_auth_event(state, Some(user.id), &mobile, "sign_in", false, reason).await;
        return Err(AppError::BadRequest(INVALID_CREDENTIALS.into()));
    }
    if !user.is_verified {
        return Err(AppError::BadRequest("Account is not verified".into()));
    }
    if !user.is_active {
        record_auth_event(state, Some(user.id), &mobile, "sign_in", false, Some("inactive".into()))
            .await;
        return Err(AppError::Forbidden);
    }

    let pair = token_service::issue_pair(state, user.id).await?;
    record_auth_event(state, Some(user.id), &mobile, "sign_in", true, None).await;
    Ok(ApiResponse::success("Signed in", pair, Some(Meta::empty())))
}

/// Rotates a refresh token: the presented one is revoked and a new pair is issued.
pub async fn refresh(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<TokenPair>> {
    let claims = token_service::decode_token(
        &state.config.jwt_secret,
        &payload.refresh_token,
        TokenKind::Refresh,
    )?;
    let user_id = claims.user_id()?;
    let token_id = claims.token_id()?;

    let row = RefreshTokens::find_by_id(token_id)
        .one(&state.orm)
        .await?
        .filter(|row| row.user_id == user_id)
        .ok_or_else(|| AppError::Unauthorized("Refresh token is not recognised".into()))?;

    if row.revoked_at.is_some() {
        let revoked = token_service::revoke_all(state, user_id).await?;
        tracing::warn!(%user_id, %token_id, revoked, "revoked refresh token presented again");
        return Err(AppError::Unauthorized("Refresh token has been revoked".into()));
    }
    if row.expires_at.with_timezone(&Utc) <= Utc::now() {
        return Err(AppError::Unauthorized("Refresh token has expired".into()));
    }

    let user = Users::find_by_id(user_id).one(&state.orm).await?;
    let user = match user {
        Some(user) if user.is_active => user,
        _ => return Err(AppError::Unauthorized("User is not active".into())),
    };

    if !token_service::revoke(state, token_id, user_id).await? {
        return Err(AppError::Unauthorized("Refresh token has been revoked".into()));
    }
    let pair = token_service::issue_pair(state, user_id).await?;
    record_auth_event(state, Some(user_id), &user.mobile, "refresh", true, None).await;

    Ok(ApiResponse::success("Token refreshed", pair, Some(Meta::empty())))
}

pub async fn sign_out(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let claims = token_service::decode_token(
        &state.config.jwt_secret,
        &payload.refresh_token,
        TokenKind::Refresh,
    )?;
    let user_id = claims.user_id()?;
    let revoked = token_service::revoke(state, claims.token_id()?, user_id).await?;

    if let Some(user) = Users::find_by_id(user_id).one(&state.orm).await? {
        record_auth_event(state, Some(user_id), &user.mobile, "sign_out", true, None).await;
    }
    Ok(ApiResponse::success(
        "Signed out",
        serde_json::json!({ "revoked": revoked }),
        Some(Meta::empty()),
    ))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<CodeIssued>> {
    let mobile = normalize_mobile(&payload.mobile)?;
    let user = match find_by_mobile(state, &mobile).await? {
        Some(user) if user.is_verified => user,
        _ => return Err(AppError::NotFound),
    };

    let now = Utc::now();
    let existing = ForgotPasswords::find()
        .filter(forgot_passwords::Column::UserId.eq(user.id))
        .one(&state.orm)
        .await?;
    let mut code_state = existing.as_ref().map(reset_state).unwrap_or_default();

    let code = otp::generate_code();
    let expires_at = match code_state.issue(hash_secret(&code)?, now, &state.config.otp) {
        Ok(expires_at) => expires_at,
        Err(err) => {
            record_auth_event(
                state,
                Some(user.id),
                &mobile,
                "forgot_password",
                false,
                Some(err.to_string()),
            )
            .await;
            return Err(err.into());
        }
    };

    match existing {
        Some(row) => {
            let mut active: forgot_passwords::ActiveModel = row.into();
            apply_reset_state(&mut active, &code_state);
            active.used_at = Set(None);
            active.updated_at = Set(now.into());
            active.update(&state.orm).await?;
        }
        None => {
            let mut active = forgot_passwords::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.id),
                used_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };
            apply_reset_state(&mut active, &code_state);
            active.insert(&state.orm).await?;
        }
    }

    state.codes.send(&mobile, &code, CodePurpose::PasswordReset)?;
    record_auth_event(state, Some(user.id), &mobile, "forgot_password", true, None).await;

    Ok(ApiResponse::success(
        "Password reset code sent",
        CodeIssued { mobile, expires_at },
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let mobile = normalize_mobile(&payload.mobile)?;
    validate_password(&payload.password)?;
    let user = match find_by_mobile(state, &mobile).await? {
        Some(user) if user.is_verified => user,
        _ => return Err(AppError::NotFound),
    };

    let row = ForgotPasswords::find()
        .filter(forgot_passwords::Column::UserId.eq(user.id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("No password reset was requested".into()))?;

    let now = Utc::now();
    let mut code_state = reset_state(&row);
    let outcome = code_state.check(
        |hash| verify_secret(payload.code.trim(), hash),
        now,
        &state.config.otp,
    );

    let mut active: forgot_passwords::ActiveModel = row.into();
    apply_reset_state(&mut active, &code_state);
    if outcome.is_ok() {
        active.used_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());
    active.update(&state.orm).await?;

    if let Err(err) = outcome {
        record_auth_event(
            state,
            Some(user.id),
            &mobile,
            "reset_password",
            false,
            Some(err.to_string()),
        )
        .await;
        return Err(err.into());
    }

    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(hash_secret(&payload.password)?);
    active.updated_at = Set(now.into());
    active.update(&state.orm).await?;

    let revoked = token_service::revoke_all(state, user_id).await?;
    record_auth_event(state, Some(user_id), &mobile, "reset_password", true, None).await;
    tracing::info!(%user_id, revoked, "password reset");

    Ok(ApiResponse::success(
        "Password has been reset",
        serde_json::json!({ "revoked_sessions": revoked }),
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let profile = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let profile = match profile {
        Some(profile) => profile,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Profile",
        UserProfile::from(profile),
        Some(Meta::empty()),
    ))
}
