use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::double_option;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBrandRequest {
    pub name: String,
    pub logo: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateBrandRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub logo: Option<Option<String>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub stock: i32,
    pub category_id: Uuid,
    pub brand_id: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<Option<Uuid>>,
    pub images: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

pub(crate) fn default_true() -> bool {
    true
}
