use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    admin_log::record_admin_action,
    dto::website::UpsertWebsiteRequest,
    entity::{WebsiteInformations, website_informations},
    error::{AppError, AppResult},
    middleware::{
        auth::AuthUser,
        guard::{Action, authorize, permission},
    },
    models::WebsiteInfo,
    response::{ApiResponse, Meta},
    services::resource::required,
    state::AppState,
};

const RESOURCE: &str = "website";

async fn current(state: &AppState) -> AppResult<Option<website_informations::Model>> {
    Ok(WebsiteInformations::find()
        .order_by_asc(website_informations::Column::CreatedAt)
        .one(&state.orm)
        .await?)
}

pub async fn get_website(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<WebsiteInfo>> {
    authorize(state, user, &permission(RESOURCE, Action::Read)).await?;
    let info = match current(state).await? {
        Some(info) => info,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Website information",
        WebsiteInfo::from(info),
        Some(Meta::empty()),
    ))
}

/// Creates the single website row on first call and overwrites it afterwards.
pub async fn upsert_website(
    state: &AppState,
    user: &AuthUser,
    payload: UpsertWebsiteRequest,
) -> AppResult<ApiResponse<WebsiteInfo>> {
    authorize(state, user, &permission(RESOURCE, Action::Update)).await?;
    let name = required("name", &payload.name)?;
    let now = Utc::now();

    let info = match current(state).await? {
        Some(existing) => {
            let mut active: website_informations::ActiveModel = existing.into();
            active.name = Set(name);
            active.description = Set(payload.description);
            active.email = Set(payload.email);
            active.phone = Set(payload.phone);
            active.address = Set(payload.address);
            active.logo = Set(payload.logo);
            active.socials = Set(payload.socials);
            active.updated_at = Set(now.into());
            active.update(&state.orm).await?
        }
        None => {
            website_informations::ActiveModel {
                id: Set(Uuid::new_v4()),
                code: NotSet,
                name: Set(name),
                description: Set(payload.description),
                email: Set(payload.email),
                phone: Set(payload.phone),
                address: Set(payload.address),
                logo: Set(payload.logo),
                socials: Set(payload.socials),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&state.orm)
            .await?
        }
    };

    record_admin_action(
        state,
        user.user_id,
        "website.update",
        RESOURCE,
        info.id,
        None,
    )
    .await;

    Ok(ApiResponse::success(
        "Website information updated",
        WebsiteInfo::from(info),
        Some(Meta::empty()),
    ))
}
