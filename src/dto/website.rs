use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpsertWebsiteRequest {
    pub name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub logo: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub socials: Option<Value>,
}
