use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    dto::marketing::{
        CreateBannerRequest, CreateCouponRequest, UpdateBannerRequest, UpdateCouponRequest,
    },
    entity::{Banners, Coupons, banners, coupons},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::resource::{Creatable, Resource, Updatable, ensure_absent, required},
    state::AppState,
};

pub struct CouponResource;

impl Resource for CouponResource {
    type Entity = Coupons;
    const NAME: &'static str = "coupons";
    const LABEL: &'static str = "Coupon";

    fn id(model: &coupons::Model) -> Uuid {
        model.id
    }
}

fn validate_coupon_limits(percent: Option<i32>, max_uses: Option<i32>) -> AppResult<()> {
    if percent.is_some_and(|percent| !(1..=100).contains(&percent)) {
        return Err(AppError::BadRequest(
            "percent must be between 1 and 100".into(),
        ));
    }
    if max_uses.is_some_and(|max_uses| max_uses < 1) {
        return Err(AppError::BadRequest("max_uses must be at least 1".into()));
    }
    Ok(())
}

impl Creatable for CouponResource {
    type Create = CreateCouponRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateCouponRequest,
    ) -> AppResult<coupons::Model> {
        let title = required("title", &payload.title)?;
        validate_coupon_limits(Some(payload.percent), Some(payload.max_uses))?;
        ensure_absent(
            state,
            Coupons::find().filter(coupons::Column::Title.eq(title.as_str())),
            "Coupon title is already taken",
        )
        .await?;

        let now = Utc::now();
        let model = coupons::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            title: Set(title),
            percent: Set(payload.percent),
            max_uses: Set(payload.max_uses),
            used_count: Set(0),
            expires_at: Set(payload.expires_at.map(Into::into)),
            is_active: Set(payload.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for CouponResource {
    type Update = UpdateCouponRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: coupons::Model,
        payload: UpdateCouponRequest,
    ) -> AppResult<coupons::Model> {
        validate_coupon_limits(payload.percent, payload.max_uses)?;
        let id = current.id;
        let mut active: coupons::ActiveModel = current.into();

        if let Some(title) = payload.title {
            let title = required("title", &title)?;
            ensure_absent(
                state,
                Coupons::find()
                    .filter(coupons::Column::Title.eq(title.as_str()))
                    .filter(coupons::Column::Id.ne(id)),
                "Coupon title is already taken",
            )
            .await?;
            active.title = Set(title);
        }
        if let Some(percent) = payload.percent {
            active.percent = Set(percent);
        }
        if let Some(max_uses) = payload.max_uses {
            active.max_uses = Set(max_uses);
        }
        if let Some(expires_at) = payload.expires_at {
            active.expires_at = Set(expires_at.map(Into::into));
        }
        if let Some(is_active) = payload.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct BannerResource;

impl Resource for BannerResource {
    type Entity = Banners;
    const NAME: &'static str = "banners";
    const LABEL: &'static str = "Banner";

    fn id(model: &banners::Model) -> Uuid {
        model.id
    }

    fn images(model: &banners::Model) -> Vec<String> {
        vec![model.image.clone()]
    }
}

impl Creatable for BannerResource {
    type Create = CreateBannerRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateBannerRequest,
    ) -> AppResult<banners::Model> {
        let now = Utc::now();
        let model = banners::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            title: Set(required("title", &payload.title)?),
            image: Set(required("image", &payload.image)?),
            link: Set(payload.link),
            is_active: Set(payload.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for BannerResource {
    type Update = UpdateBannerRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: banners::Model,
        payload: UpdateBannerRequest,
    ) -> AppResult<banners::Model> {
        let mut active: banners::ActiveModel = current.into();
        if let Some(title) = payload.title {
            active.title = Set(required("title", &title)?);
        }
        if let Some(image) = payload.image {
            active.image = Set(required("image", &image)?);
        }
        if let Some(link) = payload.link {
            active.link = Set(link);
        }
        if let Some(is_active) = payload.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}
