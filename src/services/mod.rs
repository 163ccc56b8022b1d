pub mod auth_service;
pub mod catalog_service;
pub mod feedback_service;
pub mod history_service;
pub mod listing;
pub mod marketing_service;
pub mod order_service;
pub mod otp;
pub mod password;
pub mod resource;
pub mod role_service;
pub mod token_service;
pub mod user_service;
pub mod website_service;
