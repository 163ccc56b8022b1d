use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateCommentRequest {
    pub product_id: Uuid,
    pub body: String,
    pub rating: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UpdateCommentRequest {
    pub body: Option<String>,
    pub rating: Option<i32>,
    pub is_approved: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateQuestionRequest {
    pub product_id: Uuid,
    pub body: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateAnswerRequest {
    pub question_id: Uuid,
    pub body: String,
}

/// Shared by questions and answers.
#[derive(Debug, Deserialize, Serialize)]
pub struct UpdatePostRequest {
    pub body: Option<String>,
    pub is_approved: Option<bool>,
}
