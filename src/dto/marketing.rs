use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{catalog::default_true, double_option};

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateCouponRequest {
    pub title: String,
    pub percent: i32,
    #[serde(default = "default_max_uses")]
    pub max_uses: i32,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateCouponRequest {
    pub title: Option<String>,
    pub percent: Option<i32>,
    pub max_uses: Option<i32>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBannerRequest {
    pub title: String,
    pub image: String,
    pub link: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateBannerRequest {
    pub title: Option<String>,
    pub image: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub link: Option<Option<String>>,
    pub is_active: Option<bool>,
}

fn default_max_uses() -> i32 {
    1
}
