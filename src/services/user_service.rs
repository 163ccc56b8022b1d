use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::users::UpdateUserRequest,
    entity::{Orders, Roles, Users, orders, roles, users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::resource::{Resource, Updatable, ensure_absent, load_by_ids, to_json},
    state::AppState,
};

pub struct UserResource;

impl Resource for UserResource {
    type Entity = Users;
    const NAME: &'static str = "users";
    const LABEL: &'static str = "User";
    const HIDDEN: &'static [&'static str] = &[
        "password_hash",
        "verify_code_hash",
        "verify_code_expires_at",
        "verify_attempts",
        "verify_blocked_until",
    ];

    fn id(model: &users::Model) -> Uuid {
        model.id
    }

    /// Replaces each user's role ids with the role records that still exist.
    async fn populate(state: &AppState, models: Vec<users::Model>) -> AppResult<Vec<Value>> {
        let role_ids = models.iter().flat_map(|m| m.roles.iter().copied()).collect();
        let roles = load_by_ids::<Roles>(state, roles::Column::Id, role_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                let held: Vec<Value> = model
                    .roles
                    .iter()
                    .filter_map(|id| roles.get(id).cloned())
                    .collect();
                if let Value::Object(object) = &mut item {
                    object.insert("roles".into(), Value::Array(held));
                }
                Ok(item)
            })
            .collect()
    }

    async fn before_delete(state: &AppState, model: &users::Model) -> AppResult<()> {
        if model.is_super_admin {
            return Err(AppError::BadRequest("A super admin cannot be deleted".into()));
        }
        ensure_absent(
            state,
            Orders::find().filter(orders::Column::UserId.eq(model.id)),
            "User has orders and cannot be deleted",
        )
        .await
    }
}

async fn ensure_roles_exist(state: &AppState, role_ids: &[Uuid]) -> AppResult<Vec<Uuid>> {
    let distinct: Vec<Uuid> = role_ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if distinct.is_empty() {
        return Ok(distinct);
    }

    let found = Roles::find()
        .filter(roles::Column::Id.is_in(distinct.clone()))
        .count(&state.orm)
        .await?;
    if found != distinct.len() as u64 {
        return Err(AppError::BadRequest("One or more roles do not exist".into()));
    }
    Ok(distinct)
}

/// Only super admins may edit super admins, and nobody changes their own access.
fn check_user_update(
    caller: &users::Model,
    target: &users::Model,
    payload: &UpdateUserRequest,
) -> AppResult<()> {
    if target.is_super_admin && !caller.is_super_admin {
        return Err(AppError::Forbidden);
    }
    let changes_access =
        payload.roles.is_some() || payload.is_staff.is_some() || payload.is_active.is_some();
    if caller.id == target.id && changes_access {
        return Err(AppError::BadRequest(
            "Roles, staff and active flags cannot be changed on your own account".into(),
        ));
    }
    Ok(())
}

impl Updatable for UserResource {
    type Update = UpdateUserRequest;

    async fn update(
        state: &AppState,
        user: &AuthUser,
        current: users::Model,
        payload: UpdateUserRequest,
    ) -> AppResult<users::Model> {
        let caller = Users::find_by_id(user.user_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;
        check_user_update(&caller, &current, &payload)?;

        let id = current.id;
        let mut active: users::ActiveModel = current.into();

        if let Some(email) = payload.email {
            let email = email
                .map(|email| email.trim().to_lowercase())
                .filter(|email| !email.is_empty());
            if let Some(email) = &email {
                ensure_absent(
                    state,
                    Users::find()
                        .filter(users::Column::Email.eq(email.as_str()))
                        .filter(users::Column::Id.ne(id)),
                    "Email is already taken",
                )
                .await?;
            }
            active.email = Set(email);
        }
        if let Some(first_name) = payload.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = payload.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(is_staff) = payload.is_staff {
            active.is_staff = Set(is_staff);
        }
        if let Some(is_active) = payload.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(role_ids) = payload.roles {
            active.roles = Set(ensure_roles_exist(state, &role_ids).await?);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(is_super_admin: bool) -> users::Model {
        let now = Utc::now();
        users::Model {
            id: Uuid::new_v4(),
            code: 1,
            mobile: "+15550000009".into(),
            email: None,
            first_name: None,
            last_name: None,
            password_hash: String::new(),
            is_verified: true,
            is_staff: true,
            is_super_admin,
            is_active: true,
            roles: Vec::new(),
            verify_code_hash: None,
            verify_code_expires_at: None,
            verify_attempts: 0,
            verify_blocked_until: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn request() -> UpdateUserRequest {
        UpdateUserRequest {
            first_name: None,
            last_name: None,
            email: None,
            is_staff: None,
            is_active: None,
            roles: None,
        }
    }

    #[test]
    fn staff_cannot_touch_a_super_admin() {
        let staff = user(false);
        let admin = user(true);
        let deactivate = UpdateUserRequest {
            is_active: Some(false),
            ..request()
        };
        assert!(matches!(
            check_user_update(&staff, &admin, &deactivate),
            Err(AppError::Forbidden)
        ));
        assert!(check_user_update(&user(true), &admin, &deactivate).is_ok());
    }

    #[test]
    fn nobody_changes_their_own_access() {
        let staff = user(false);
        for payload in [
            UpdateUserRequest {
                roles: Some(vec![Uuid::new_v4()]),
                ..request()
            },
            UpdateUserRequest {
                is_staff: Some(true),
                ..request()
            },
            UpdateUserRequest {
                is_active: Some(true),
                ..request()
            },
        ] {
            assert!(matches!(
                check_user_update(&staff, &staff, &payload),
                Err(AppError::BadRequest(_))
            ));
        }

        let rename = UpdateUserRequest {
            first_name: Some(Some("Sam".into())),
            ..request()
        };
        assert!(check_user_update(&staff, &staff, &rename).is_ok());
        assert!(check_user_update(&staff, &user(false), &request()).is_ok());
    }
}
