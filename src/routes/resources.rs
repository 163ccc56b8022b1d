//! HTTP surface of the generic resource pipeline.
//!
//! Every handler authenticates through [`AuthUser`], checks the
//! `<resource>.<action>` permission, then calls into `services::resource`.
//! Bodies are parsed after the permission check so callers without access
//! always see 403, whatever they sent.

use std::marker::PhantomData;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    routing::{MethodRouter, get},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::{
        auth::AuthUser,
        guard::{Action, authorize, permission},
    },
    response::ApiResponse,
    routes::params::ListQuery,
    services::resource::{self, Creatable, Resource, Updatable},
    state::AppState,
};

pub async fn list_records<R: Resource>(
    State(state): State<AppState>,
    user: AuthUser,
    query: ListQuery,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    authorize(&state, &user, &permission(R::NAME, Action::Read)).await?;
    let resp = resource::list::<R>(&state, &query).await?;
    Ok(Json(resp))
}

pub async fn get_record<R: Resource>(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    authorize(&state, &user, &permission(R::NAME, Action::Read)).await?;
    let resp = resource::get::<R>(&state, id).await?;
    Ok(Json(resp))
}

pub async fn create_record<R: Creatable>(
    State(state): State<AppState>,
    user: AuthUser,
    request: Request,
) -> AppResult<(StatusCode, Json<ApiResponse<Value>>)> {
    authorize(&state, &user, &permission(R::NAME, Action::Create)).await?;
    let AppJson(payload) = AppJson::<R::Create>::from_request(request, &state).await?;
    let resp = resource::create::<R>(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn update_record<R: Updatable>(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    request: Request,
) -> AppResult<Json<ApiResponse<Value>>> {
    authorize(&state, &user, &permission(R::NAME, Action::Update)).await?;
    let AppJson(payload) = AppJson::<R::Update>::from_request(request, &state).await?;
    let resp = resource::update::<R>(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

pub async fn delete_record<R: Resource>(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Value>>> {
    authorize(&state, &user, &permission(R::NAME, Action::Delete)).await?;
    let resp = resource::delete::<R>(&state, &user, id).await?;
    Ok(Json(resp))
}

/// Collects the routes one resource supports; list and get are always mounted.
pub struct ResourceRouter<R> {
    collection: MethodRouter<AppState>,
    item: MethodRouter<AppState>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Default for ResourceRouter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> ResourceRouter<R> {
    pub fn new() -> Self {
        Self {
            collection: get(list_records::<R>),
            item: get(get_record::<R>),
            _resource: PhantomData,
        }
    }

    pub fn with_delete(mut self) -> Self {
        self.item = self.item.delete(delete_record::<R>);
        self
    }

    pub fn into_router(self) -> Router<AppState> {
        Router::new()
            .route("/", self.collection)
            .route("/{id}", self.item)
    }
}

impl<R: Creatable> ResourceRouter<R> {
    pub fn with_create(mut self) -> Self {
        self.collection = self.collection.post(create_record::<R>);
        self
    }
}

impl<R: Updatable> ResourceRouter<R> {
    pub fn with_update(mut self) -> Self {
        self.item = self.item.patch(update_record::<R>);
        self
    }
}

impl<R: Creatable + Updatable> ResourceRouter<R> {
    /// Create, update and delete on top of the read routes.
    pub fn crud() -> Self {
        Self::new().with_create().with_update().with_delete()
    }
}
