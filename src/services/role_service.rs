use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
    UpdateMany, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::roles::{CreateRoleRequest, UpdateRoleRequest},
    entity::{Roles, Users, roles, users},
    error::{AppError, AppResult},
    middleware::{auth::AuthUser, guard::Action},
    services::resource::{Creatable, Resource, Updatable, ensure_absent, required},
    state::AppState,
};

/// Normalizes and checks `<resource>.<action>` strings, dropping duplicates.
pub fn validate_permissions(permissions: Vec<String>) -> AppResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(permissions.len());
    for permission in permissions {
        let permission = permission.trim().to_string();
        let valid = match permission.split_once('.') {
            Some((resource, action)) => {
                !resource.is_empty() && Action::ALL.iter().any(|a| a.as_str() == action)
            }
            None => false,
        };
        if !valid {
            return Err(AppError::BadRequest(format!(
                "Invalid permission: {permission}"
            )));
        }
        if !normalized.contains(&permission) {
            normalized.push(permission);
        }
    }
    Ok(normalized)
}

/// Removes `role_id` from the `roles` array of every user holding it.
fn detach_role(role_id: Uuid) -> UpdateMany<Users> {
    Users::update_many()
        .col_expr(
            users::Column::Roles,
            Expr::cust_with_values("array_remove(roles, $1)", [role_id]),
        )
        .filter(Expr::cust_with_values("$1 = ANY(roles)", [role_id]))
}

pub struct RoleResource;

impl Resource for RoleResource {
    type Entity = Roles;
    const NAME: &'static str = "roles";
    const LABEL: &'static str = "Role";

    fn id(model: &roles::Model) -> Uuid {
        model.id
    }

    /// Detaches the role from every user that holds it.
    async fn before_delete(state: &AppState, model: &roles::Model) -> AppResult<()> {
        let result = detach_role(model.id).exec(&state.orm).await?;
        tracing::debug!(
            role_id = %model.id,
            users = result.rows_affected,
            "role detached from users"
        );
        Ok(())
    }
}

impl Creatable for RoleResource {
    type Create = CreateRoleRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateRoleRequest,
    ) -> AppResult<roles::Model> {
        let name = required("name", &payload.name)?;
        let permissions = validate_permissions(payload.permissions)?;
        ensure_absent(
            state,
            Roles::find().filter(roles::Column::Name.eq(name.as_str())),
            "Role name is already taken",
        )
        .await?;

        let now = Utc::now();
        let model = roles::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            name: Set(name),
            description: Set(payload.description),
            permissions: Set(permissions),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for RoleResource {
    type Update = UpdateRoleRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: roles::Model,
        payload: UpdateRoleRequest,
    ) -> AppResult<roles::Model> {
        let id = current.id;
        let mut active: roles::ActiveModel = current.into();

        if let Some(name) = payload.name {
            let name = required("name", &name)?;
            ensure_absent(
                state,
                Roles::find()
                    .filter(roles::Column::Name.eq(name.as_str()))
                    .filter(roles::Column::Id.ne(id)),
                "Role name is already taken",
            )
            .await?;
            active.name = Set(name);
        }
        if let Some(description) = payload.description {
            active.description = Set(description);
        }
        if let Some(permissions) = payload.permissions {
            active.permissions = Set(validate_permissions(permissions)?);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DbBackend, QueryTrait};

    use super::*;

    #[test]
    fn detaching_a_role_binds_the_id_in_both_places() {
        let role_id = Uuid::nil();
        let sql = detach_role(role_id).build(DbBackend::Postgres).to_string();
        assert!(!sql.contains('?'), "{sql}");
        assert!(
            sql.contains(&format!("array_remove(roles, '{role_id}')")),
            "{sql}"
        );
        assert!(sql.contains(&format!("'{role_id}' = ANY(roles)")), "{sql}");
    }

    #[test]
    fn permissions_are_trimmed_and_deduplicated() {
        let permissions = validate_permissions(vec![
            " products.read".into(),
            "products.read".into(),
            "orders.update".into(),
        ])
        .expect("valid permissions");
        assert_eq!(permissions, vec!["products.read", "orders.update"]);
    }

    #[test]
    fn malformed_permissions_are_rejected() {
        for bad in ["products", "products.publish", ".read", ""] {
            assert!(
                validate_permissions(vec![bad.to_string()]).is_err(),
                "{bad} should be rejected"
            );
        }
    }
}
