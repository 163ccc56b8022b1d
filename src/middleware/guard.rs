//! Permission checks for staff endpoints.
//!
//! Permissions are strings of the form `<resource>.<action>`, for example
//! `products.create`. Super admins bypass the check entirely.

use std::fmt;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    entity::{Roles, Users, roles, users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn permission(resource: &str, action: Action) -> String {
    format!("{resource}.{action}")
}

/// Decides access from an already loaded user and the roles it references.
pub fn check_access(
    user: &users::Model,
    roles: &[roles::Model],
    required: &str,
) -> AppResult<()> {
    if user.is_super_admin {
        return Ok(());
    }
    if !user.is_staff {
        return Err(AppError::Forbidden);
    }

    let granted = roles
        .iter()
        .filter(|role| user.roles.contains(&role.id))
        .any(|role| role.permissions.iter().any(|p| p == required));
    if granted {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Loads the caller fresh from the database and checks `required` against its roles.
pub async fn authorize(
    state: &AppState,
    auth: &AuthUser,
    required: &str,
) -> AppResult<users::Model> {
    let user = Users::find_by_id(auth.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;
    if !user.is_active {
        return Err(AppError::Unauthorized("User is inactive".into()));
    }

    let roles = if user.is_super_admin || !user.is_staff || user.roles.is_empty() {
        Vec::new()
    } else {
        Roles::find()
            .filter(roles::Column::Id.is_in(user.roles.clone()))
            .all(&state.orm)
            .await?
    };

    if let Err(err) = check_access(&user, &roles, required) {
        tracing::debug!(user_id = %user.id, %required, "permission denied");
        return Err(err);
    }
    Ok(user)
}
