use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::{admin_logs, auth_histories},
    error::AppResult,
    state::AppState,
};

pub async fn log_admin_action(
    state: &AppState,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    resource_id: Option<Uuid>,
    metadata: Option<Value>,
) -> AppResult<()> {
    admin_logs::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: NotSet,
        user_id: Set(user_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        resource_id: Set(resource_id),
        metadata: Set(metadata),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(())
}

/// Best-effort variant: the CRUD write already happened, so a failed log only warns.
pub async fn record_admin_action(
    state: &AppState,
    user_id: Uuid,
    action: &str,
    resource: &str,
    resource_id: Uuid,
    metadata: Option<Value>,
) {
    if let Err(err) = log_admin_action(
        state,
        Some(user_id),
        action,
        Some(resource),
        Some(resource_id),
        metadata,
    )
    .await
    {
        tracing::warn!(error = %err, %action, "admin log failed");
    }
}

pub async fn record_auth_event(
    state: &AppState,
    user_id: Option<Uuid>,
    mobile: &str,
    action: &str,
    success: bool,
    detail: Option<String>,
) {
    let row = auth_histories::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: NotSet,
        user_id: Set(user_id),
        mobile: Set(mobile.to_string()),
        action: Set(action.to_string()),
        success: Set(success),
        detail: Set(detail),
        created_at: NotSet,
    };
    if let Err(err) = row.insert(&state.orm).await {
        tracing::warn!(error = %err, %action, "auth history write failed");
    }
}
