use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::feedback::{
        CreateAnswerRequest, CreateCommentRequest, CreateQuestionRequest, UpdateCommentRequest,
        UpdatePostRequest,
    },
    entity::{
        Answers, Comments, Products, Questions, Users, answers, comments, products, questions,
        users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::resource::{
        Creatable, Resource, Updatable, embed, ensure_exists, load_by_ids, required, to_json,
    },
    state::AppState,
};

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    Ok(())
}

pub struct CommentResource;

impl Resource for CommentResource {
    type Entity = Comments;
    const NAME: &'static str = "comments";
    const LABEL: &'static str = "Comment";

    fn id(model: &comments::Model) -> Uuid {
        model.id
    }

    async fn populate(state: &AppState, models: Vec<comments::Model>) -> AppResult<Vec<Value>> {
        let product_ids = models.iter().map(|m| m.product_id).collect();
        let user_ids = models.iter().map(|m| m.user_id).collect();
        let products = load_by_ids::<Products>(state, products::Column::Id, product_ids).await?;
        let users = load_by_ids::<Users>(state, users::Column::Id, user_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "product", products.get(&model.product_id));
                embed(&mut item, "user", users.get(&model.user_id));
                Ok(item)
            })
            .collect()
    }
}

impl Creatable for CommentResource {
    type Create = CreateCommentRequest;

    async fn create(
        state: &AppState,
        user: &AuthUser,
        payload: CreateCommentRequest,
    ) -> AppResult<comments::Model> {
        let body = required("body", &payload.body)?;
        validate_rating(payload.rating)?;
        ensure_exists::<Products>(state, payload.product_id, "Product").await?;

        let now = Utc::now();
        let model = comments::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            user_id: Set(user.user_id),
            product_id: Set(payload.product_id),
            body: Set(body),
            rating: Set(payload.rating),
            is_approved: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for CommentResource {
    type Update = UpdateCommentRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: comments::Model,
        payload: UpdateCommentRequest,
    ) -> AppResult<comments::Model> {
        let mut active: comments::ActiveModel = current.into();
        if let Some(body) = payload.body {
            active.body = Set(required("body", &body)?);
        }
        if let Some(rating) = payload.rating {
            validate_rating(rating)?;
            active.rating = Set(rating);
        }
        if let Some(is_approved) = payload.is_approved {
            active.is_approved = Set(is_approved);
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct QuestionResource;

impl Resource for QuestionResource {
    type Entity = Questions;
    const NAME: &'static str = "questions";
    const LABEL: &'static str = "Question";

    fn id(model: &questions::Model) -> Uuid {
        model.id
    }

    async fn populate(state: &AppState, models: Vec<questions::Model>) -> AppResult<Vec<Value>> {
        let product_ids = models.iter().map(|m| m.product_id).collect();
        let products = load_by_ids::<Products>(state, products::Column::Id, product_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "product", products.get(&model.product_id));
                Ok(item)
            })
            .collect()
    }
}

impl Creatable for QuestionResource {
    type Create = CreateQuestionRequest;

    async fn create(
        state: &AppState,
        user: &AuthUser,
        payload: CreateQuestionRequest,
    ) -> AppResult<questions::Model> {
        let body = required("body", &payload.body)?;
        ensure_exists::<Products>(state, payload.product_id, "Product").await?;

        let now = Utc::now();
        let model = questions::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            user_id: Set(user.user_id),
            product_id: Set(payload.product_id),
            body: Set(body),
            is_approved: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for QuestionResource {
    type Update = UpdatePostRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: questions::Model,
        payload: UpdatePostRequest,
    ) -> AppResult<questions::Model> {
        let mut active: questions::ActiveModel = current.into();
        if let Some(body) = payload.body {
            active.body = Set(required("body", &body)?);
        }
        if let Some(is_approved) = payload.is_approved {
            active.is_approved = Set(is_approved);
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct AnswerResource;

impl Resource for AnswerResource {
    type Entity = Answers;
    const NAME: &'static str = "answers";
    const LABEL: &'static str = "Answer";

    fn id(model: &answers::Model) -> Uuid {
        model.id
    }

    async fn populate(state: &AppState, models: Vec<answers::Model>) -> AppResult<Vec<Value>> {
        let question_ids = models.iter().map(|m| m.question_id).collect();
        let questions =
            load_by_ids::<Questions>(state, questions::Column::Id, question_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "question", questions.get(&model.question_id));
                Ok(item)
            })
            .collect()
    }
}

impl Creatable for AnswerResource {
    type Create = CreateAnswerRequest;

    async fn create(
        state: &AppState,
        user: &AuthUser,
        payload: CreateAnswerRequest,
    ) -> AppResult<answers::Model> {
        let body = required("body", &payload.body)?;
        ensure_exists::<Questions>(state, payload.question_id, "Question").await?;

        let now = Utc::now();
        let model = answers::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            question_id: Set(payload.question_id),
            user_id: Set(user.user_id),
            body: Set(body),
            is_approved: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for AnswerResource {
    type Update = UpdatePostRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: answers::Model,
        payload: UpdatePostRequest,
    ) -> AppResult<answers::Model> {
        let mut active: answers::ActiveModel = current.into();
        if let Some(body) = payload.body {
            active.body = Set(required("body", &body)?);
        }
        if let Some(is_approved) = payload.is_approved {
            active.is_approved = Set(is_approved);
        }
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}
