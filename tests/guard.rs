use chrono::Utc;
use shop_admin_api::{
    entity::{roles, users},
    error::AppError,
    middleware::guard::{Action, check_access, permission},
};
use uuid::Uuid;

fn user(is_staff: bool, is_super_admin: bool, roles: Vec<Uuid>) -> users::Model {
    let now = Utc::now();
    users::Model {
        id: Uuid::new_v4(),
        code: 1,
        mobile: "+15550000001".into(),
        email: None,
        first_name: None,
        last_name: None,
        password_hash: String::new(),
        is_verified: true,
        is_staff,
        is_super_admin,
        is_active: true,
        roles,
        verify_code_hash: None,
        verify_code_expires_at: None,
        verify_attempts: 0,
        verify_blocked_until: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn role(permissions: &[&str]) -> roles::Model {
    let now = Utc::now();
    roles::Model {
        id: Uuid::new_v4(),
        code: 1,
        name: "catalog".into(),
        description: None,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[test]
fn permission_strings_are_resource_dot_action() {
    assert_eq!(permission("products", Action::Create), "products.create");
    assert_eq!(permission("admin-logs", Action::Read), "admin-logs.read");
}

#[test]
fn super_admin_bypasses_everything() {
    let admin = user(false, true, Vec::new());
    assert!(check_access(&admin, &[], "orders.delete").is_ok());
}

#[test]
fn non_staff_is_forbidden_even_with_roles() {
    let catalog = role(&["products.read"]);
    let customer = user(false, false, vec![catalog.id]);
    assert!(matches!(
        check_access(&customer, &[catalog], "products.read"),
        Err(AppError::Forbidden)
    ));
}

#[test]
fn staff_needs_a_role_granting_the_permission() {
    let catalog = role(&["products.read", "products.update"]);
    let staff = user(true, false, vec![catalog.id]);

    assert!(check_access(&staff, std::slice::from_ref(&catalog), "products.update").is_ok());
    assert!(matches!(
        check_access(&staff, std::slice::from_ref(&catalog), "products.delete"),
        Err(AppError::Forbidden)
    ));
}

#[test]
fn roles_the_user_does_not_hold_are_ignored() {
    let granted = role(&["orders.read"]);
    let staff = user(true, false, Vec::new());
    assert!(check_access(&staff, &[granted], "orders.read").is_err());
}
