//! Generic list/get/create/update/delete shared by every staff-managed resource.
//!
//! A resource names its entity and label; [`Creatable`] and [`Updatable`]
//! add the write paths. Handlers in `routes::resources` check permissions
//! before calling in here.

use std::{
    collections::{HashMap, HashSet},
    future::Future,
};

use sea_orm::{
    ColumnTrait, EntityTrait, ModelTrait, PrimaryKeyTrait, QueryFilter, Select,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    admin_log::record_admin_action,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::ListQuery,
    services::listing,
    state::AppState,
    storage,
};

pub type ModelOf<R> = <<R as Resource>::Entity as EntityTrait>::Model;

pub trait Resource: Send + Sync + 'static {
    type Entity: EntityTrait<
            Model: Serialize + Sync,
            PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>,
        >;

    /// Path segment and permission prefix, e.g. `products`.
    const NAME: &'static str;
    /// Singular label used in response messages, e.g. `Product`.
    const LABEL: &'static str;
    /// Columns that list queries may neither filter nor sort on.
    const HIDDEN: &'static [&'static str] = &[];

    fn id(model: &ModelOf<Self>) -> Uuid;

    /// Stored upload paths owned by the record; removed after delete.
    fn images(_model: &ModelOf<Self>) -> Vec<String> {
        Vec::new()
    }

    /// Serializes a page of records, embedding whatever they reference.
    fn populate(
        _state: &AppState,
        models: Vec<ModelOf<Self>>,
    ) -> impl Future<Output = AppResult<Vec<Value>>> + Send {
        std::future::ready(models.iter().map(to_json).collect())
    }

    fn before_delete(
        _state: &AppState,
        _model: &ModelOf<Self>,
    ) -> impl Future<Output = AppResult<()>> + Send {
        std::future::ready(Ok(()))
    }
}

pub trait Creatable: Resource {
    type Create: DeserializeOwned + Serialize + Send + 'static;

    fn create(
        state: &AppState,
        user: &AuthUser,
        payload: Self::Create,
    ) -> impl Future<Output = AppResult<ModelOf<Self>>> + Send;
}

pub trait Updatable: Resource {
    type Update: DeserializeOwned + Serialize + Send + 'static;

    fn update(
        state: &AppState,
        user: &AuthUser,
        current: ModelOf<Self>,
        payload: Self::Update,
    ) -> impl Future<Output = AppResult<ModelOf<Self>>> + Send;
}

pub async fn find_or_404<R: Resource>(state: &AppState, id: Uuid) -> AppResult<ModelOf<R>> {
    let model = R::Entity::find_by_id(id).one(&state.orm).await?;
    match model {
        Some(model) => Ok(model),
        None => Err(AppError::NotFound),
    }
}

pub async fn list<R: Resource>(
    state: &AppState,
    query: &ListQuery,
) -> AppResult<ApiResponse<Vec<Value>>> {
    let (models, meta) =
        listing::fetch_page(&state.orm, R::Entity::find(), query, R::HIDDEN).await?;
    let items = R::populate(state, models)
        .await?
        .into_iter()
        .map(|item| query.projection.apply(item))
        .collect();
    Ok(ApiResponse::success("Ok", items, Some(meta)))
}

pub async fn get<R: Resource>(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Value>> {
    let model = find_or_404::<R>(state, id).await?;
    let item = populate_one::<R>(state, model).await?;
    Ok(ApiResponse::success(R::LABEL, item, Some(Meta::empty())))
}

pub async fn create<R: Creatable>(
    state: &AppState,
    user: &AuthUser,
    payload: R::Create,
) -> AppResult<ApiResponse<Value>> {
    let metadata = serde_json::to_value(&payload).ok();
    let model = R::create(state, user, payload).await?;
    let id = R::id(&model);
    tracing::info!(resource = R::NAME, %id, user_id = %user.user_id, "record created");

    record_admin_action(
        state,
        user.user_id,
        &format!("{}.create", R::NAME),
        R::NAME,
        id,
        metadata,
    )
    .await;

    let item = populate_one::<R>(state, model).await?;
    Ok(ApiResponse::success(
        format!("{} created", R::LABEL),
        item,
        Some(Meta::empty()),
    ))
}

pub async fn update<R: Updatable>(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: R::Update,
) -> AppResult<ApiResponse<Value>> {
    let current = find_or_404::<R>(state, id).await?;
    let metadata = serde_json::to_value(&payload).ok();
    let model = R::update(state, user, current, payload).await?;
    tracing::info!(resource = R::NAME, %id, user_id = %user.user_id, "record updated");

    record_admin_action(
        state,
        user.user_id,
        &format!("{}.update", R::NAME),
        R::NAME,
        id,
        metadata,
    )
    .await;

    let item = populate_one::<R>(state, model).await?;
    Ok(ApiResponse::success(
        format!("{} updated", R::LABEL),
        item,
        Some(Meta::empty()),
    ))
}

pub async fn delete<R: Resource>(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Value>> {
    let model = find_or_404::<R>(state, id).await?;
    R::before_delete(state, &model).await?;

    let result = R::Entity::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    tracing::info!(resource = R::NAME, %id, user_id = %user.user_id, "record deleted");

    record_admin_action(
        state,
        user.user_id,
        &format!("{}.delete", R::NAME),
        R::NAME,
        id,
        None,
    )
    .await;
    storage::remove_uploads(&state.config.upload_dir, &R::images(&model)).await;

    Ok(ApiResponse::success(
        format!("{} deleted", R::LABEL),
        json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

async fn populate_one<R: Resource>(state: &AppState, model: ModelOf<R>) -> AppResult<Value> {
    R::populate(state, vec![model])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("{} populate returned nothing", R::NAME)))
}

pub fn to_json<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

/// 400 unless a row with this id exists in `E`.
pub async fn ensure_exists<E>(state: &AppState, id: Uuid, label: &str) -> AppResult<E::Model>
where
    E: EntityTrait<PrimaryKey: PrimaryKeyTrait<ValueType = Uuid>>,
{
    E::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("{label} {id} does not exist")))
}

/// 400 with `message` when `select` matches any row.
pub async fn ensure_absent<E: EntityTrait>(
    state: &AppState,
    select: Select<E>,
    message: &str,
) -> AppResult<()> {
    if select.one(&state.orm).await?.is_some() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(())
}

/// Loads the distinct `ids` from `E` in one query, keyed by `column`'s value.
pub async fn load_by_ids<E>(
    state: &AppState,
    column: E::Column,
    ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Value>>
where
    E: EntityTrait<Model: Serialize>,
{
    let ids: Vec<Uuid> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = E::find()
        .filter(column.is_in(ids))
        .all(&state.orm)
        .await?;

    let mut by_id = HashMap::with_capacity(rows.len());
    for row in rows {
        let Some(id) = uuid_of(&row.get(column)) else {
            continue;
        };
        by_id.insert(id, to_json(&row)?);
    }
    Ok(by_id)
}

/// Sets `key` on a serialized record to the referenced row, or `null` when it is gone.
pub fn embed(item: &mut Value, key: &str, referenced: Option<&Value>) {
    if let Value::Object(object) = item {
        object.insert(key.to_string(), referenced.cloned().unwrap_or(Value::Null));
    }
}

fn uuid_of(value: &sea_orm::Value) -> Option<Uuid> {
    match value {
        sea_orm::Value::Uuid(Some(id)) => Some(**id),
        _ => None,
    }
}

/// Trimmed, non-empty text or 400.
pub fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}
