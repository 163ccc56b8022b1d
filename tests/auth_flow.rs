mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use shop_admin_api::{
    dto::auth::{
        ForgotPasswordRequest, RefreshRequest, ResetPasswordRequest, SignInRequest,
        SignUpRequest, VerifyRequest,
    },
    entity::{AuthHistories, RefreshTokens, Users, auth_histories, refresh_tokens, users},
    error::AppError,
    middleware::auth::AuthUser,
    notify::CodePurpose,
    services::{auth_service, password::verify_secret, token_service},
};

const MOBILE: &str = "+15550001111";

fn sign_in_request(password: &str) -> SignInRequest {
    SignInRequest {
        mobile: MOBILE.into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn account_lifecycle_flow() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let (state, sender) = common::setup_state(&database_url).await?;

    // Sign up sends a verification code.
    let issued = auth_service::sign_up(
        &state,
        SignUpRequest {
            mobile: format!(" {MOBILE} "),
            password: "correct-horse".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            email: Some("Ada@Example.com".into()),
        },
    )
    .await?;
    assert_eq!(issued.data.as_ref().map(|d| d.mobile.as_str()), Some(MOBILE));
    let code = sender
        .last_code(MOBILE, CodePurpose::Verification)
        .expect("verification code sent");

    // Unverified accounts cannot sign in.
    let err = auth_service::sign_in(&state, sign_in_request("correct-horse"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("not verified")));

    // A wrong code counts an attempt, the right one verifies and issues tokens.
    let wrong = if code == "000000" { "111111" } else { "000000" };
    let err = auth_service::verify(
        &state,
        VerifyRequest {
            mobile: MOBILE.into(),
            code: wrong.into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("2 attempts left")));

    let verified = auth_service::verify(
        &state,
        VerifyRequest {
            mobile: MOBILE.into(),
            code: code.clone(),
        },
    )
    .await?;
    let pair = verified.data.expect("token pair");
    assert_eq!(pair.token_type, "Bearer");

    let access = token_service::decode_token(
        &state.config.jwt_secret,
        &pair.access_token,
        shop_admin_api::dto::auth::TokenKind::Access,
    )?;
    let user_id = access.user_id()?;
    let profile = auth_service::me(&state, &AuthUser { user_id }).await?;
    let profile = profile.data.expect("profile");
    assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    assert!(profile.is_verified);

    // Duplicate sign-up of a verified mobile is refused.
    let err = auth_service::sign_up(
        &state,
        SignUpRequest {
            mobile: MOBILE.into(),
            password: "another-pass".into(),
            first_name: None,
            last_name: None,
            email: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Wrong password and unknown mobile share one message.
    let wrong_password = auth_service::sign_in(&state, sign_in_request("nope-nope"))
        .await
        .unwrap_err();
    let unknown = auth_service::sign_in(
        &state,
        SignInRequest {
            mobile: "+15559999999".into(),
            password: "correct-horse".into(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown.to_string());

    // Refresh rotates; presenting the old token again revokes every session.
    let signed_in = auth_service::sign_in(&state, sign_in_request("correct-horse"))
        .await?
        .data
        .expect("pair");
    let rotated = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: signed_in.refresh_token.clone(),
        },
    )
    .await?
    .data
    .expect("rotated pair");
    assert_ne!(rotated.refresh_token, signed_in.refresh_token);

    let reused = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: signed_in.refresh_token,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(reused, AppError::Unauthorized(_)));
    let after_reuse = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: rotated.refresh_token,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(after_reuse, AppError::Unauthorized(_)));

    // Sign out revokes only the presented token.
    let session = auth_service::sign_in(&state, sign_in_request("correct-horse"))
        .await?
        .data
        .expect("pair");
    let out = auth_service::sign_out(
        &state,
        RefreshRequest {
            refresh_token: session.refresh_token.clone(),
        },
    )
    .await?;
    assert_eq!(out.data.expect("revoked flag")["revoked"], true);

    // Password reset revokes live sessions and changes the password.
    let live = auth_service::sign_in(&state, sign_in_request("correct-horse"))
        .await?
        .data
        .expect("pair");
    auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            mobile: MOBILE.into(),
        },
    )
    .await?;
    let reset_code = sender
        .last_code(MOBILE, CodePurpose::PasswordReset)
        .expect("reset code sent");
    let reset = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            mobile: MOBILE.into(),
            code: reset_code.clone(),
            password: "new-password-1".into(),
        },
    )
    .await?;
    assert_eq!(reset.data.expect("count")["revoked_sessions"], 1);

    let live_refresh = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh_token: live.refresh_token,
        },
    )
    .await;
    assert!(live_refresh.is_err());
    assert!(
        auth_service::sign_in(&state, sign_in_request("correct-horse"))
            .await
            .is_err()
    );
    auth_service::sign_in(&state, sign_in_request("new-password-1")).await?;

    // A used reset code cannot be replayed.
    let replay = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            mobile: MOBILE.into(),
            code: reset_code,
            password: "third-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(replay, AppError::BadRequest(_)));

    // Exhausting attempts blocks further codes.
    auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            mobile: MOBILE.into(),
        },
    )
    .await?;
    let code = sender
        .last_code(MOBILE, CodePurpose::PasswordReset)
        .expect("second reset code");
    let wrong = if code == "000000" { "111111" } else { "000000" };
    for _ in 0..3 {
        let _ = auth_service::reset_password(
            &state,
            ResetPasswordRequest {
                mobile: MOBILE.into(),
                code: wrong.into(),
                password: "third-password".into(),
            },
        )
        .await;
    }
    let blocked = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            mobile: MOBILE.into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(blocked, AppError::BadRequest(msg) if msg.contains("Too many attempts")));

    // Every step left an auth history row.
    let failures = AuthHistories::find()
        .filter(auth_histories::Column::Success.eq(false))
        .count(&state.orm)
        .await?;
    assert!(failures >= 5);
    let live_tokens = RefreshTokens::find()
        .filter(refresh_tokens::Column::UserId.eq(user_id))
        .filter(refresh_tokens::Column::RevokedAt.is_null())
        .count(&state.orm)
        .await?;
    assert_eq!(live_tokens, 1);

    // A blocked, unverified account cannot be re-registered with new details.
    let pending = "+15550002222";
    let sign_up_as = |password: &str| SignUpRequest {
        mobile: pending.into(),
        password: password.into(),
        first_name: Some("First".into()),
        last_name: None,
        email: None,
    };
    auth_service::sign_up(&state, sign_up_as("original-pass")).await?;
    let code = sender
        .last_code(pending, CodePurpose::Verification)
        .expect("pending code");
    let wrong = if code == "000000" { "111111" } else { "000000" };
    for _ in 0..3 {
        let _ = auth_service::verify(
            &state,
            VerifyRequest {
                mobile: pending.into(),
                code: wrong.into(),
            },
        )
        .await;
    }
    let mut takeover = sign_up_as("attacker-pass");
    takeover.first_name = Some("Mallory".into());
    let err = auth_service::sign_up(&state, takeover).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Too many attempts")));

    let stored = Users::find()
        .filter(users::Column::Mobile.eq(pending))
        .one(&state.orm)
        .await?
        .expect("pending user");
    assert!(verify_secret("original-pass", &stored.password_hash));
    assert!(!verify_secret("attacker-pass", &stored.password_hash));
    assert_eq!(stored.first_name.as_deref(), Some("First"));

    Ok(())
}
