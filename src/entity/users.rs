use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: i64,
    #[sea_orm(unique)]
    pub mobile: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub is_staff: bool,
    pub is_super_admin: bool,
    pub is_active: bool,
    pub roles: Vec<Uuid>,
    #[serde(skip_serializing)]
    pub verify_code_hash: Option<String>,
    #[serde(skip_serializing)]
    pub verify_code_expires_at: Option<DateTimeWithTimeZone>,
    #[serde(skip_serializing)]
    pub verify_attempts: i32,
    #[serde(skip_serializing)]
    pub verify_blocked_until: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::refresh_tokens::Entity")]
    RefreshTokens,
    #[sea_orm(has_many = "super::baskets::Entity")]
    Baskets,
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
    #[sea_orm(has_many = "super::admin_logs::Entity")]
    AdminLogs,
}

impl Related<super::refresh_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshTokens.def()
    }
}

impl Related<super::baskets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Baskets.def()
    }
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::admin_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdminLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
