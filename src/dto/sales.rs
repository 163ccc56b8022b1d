use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateBasketRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateBasketRequest {
    pub quantity: i32,
}

/// Checkout of a user's basket.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub address: String,
    pub coupon_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub method: String,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdatePaymentRequest {
    pub status: String,
    pub reference: Option<String>,
}
