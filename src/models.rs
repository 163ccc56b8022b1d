use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{users, website_informations};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub code: i64,
    pub mobile: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_verified: bool,
    pub is_staff: bool,
    pub is_super_admin: bool,
    pub roles: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserProfile {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            mobile: model.mobile,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_verified: model.is_verified,
            is_staff: model.is_staff,
            is_super_admin: model.is_super_admin,
            roles: model.roles,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebsiteInfo {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub socials: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl From<website_informations::Model> for WebsiteInfo {
    fn from(model: website_informations::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            email: model.email,
            phone: model.phone,
            address: model.address,
            logo: model.logo,
            socials: model.socials,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
