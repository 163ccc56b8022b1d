use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::catalog::{
        CreateBrandRequest, CreateCategoryRequest, CreateProductRequest, UpdateBrandRequest,
        UpdateCategoryRequest, UpdateProductRequest,
    },
    entity::{Brands, Categories, Products, brands, categories, products},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::resource::{
        Creatable, Resource, Updatable, embed, ensure_absent, ensure_exists, load_by_ids,
        required, to_json,
    },
    state::AppState,
};

pub struct CategoryResource;

impl Resource for CategoryResource {
    type Entity = Categories;
    const NAME: &'static str = "categories";
    const LABEL: &'static str = "Category";

    fn id(model: &categories::Model) -> Uuid {
        model.id
    }

    fn images(model: &categories::Model) -> Vec<String> {
        model.image.iter().cloned().collect()
    }

    async fn populate(state: &AppState, models: Vec<categories::Model>) -> AppResult<Vec<Value>> {
        let parent_ids = models.iter().filter_map(|m| m.parent_id).collect();
        let parents = load_by_ids::<Categories>(state, categories::Column::Id, parent_ids).await?;
        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "parent", model.parent_id.and_then(|id| parents.get(&id)));
                Ok(item)
            })
            .collect()
    }

    async fn before_delete(state: &AppState, model: &categories::Model) -> AppResult<()> {
        ensure_absent(
            state,
            Products::find().filter(products::Column::CategoryId.eq(model.id)),
            "Category still has products",
        )
        .await
    }
}

impl Creatable for CategoryResource {
    type Create = CreateCategoryRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateCategoryRequest,
    ) -> AppResult<categories::Model> {
        let name = required("name", &payload.name)?;
        ensure_absent(
            state,
            Categories::find().filter(categories::Column::Name.eq(name.as_str())),
            "Category name is already taken",
        )
        .await?;
        if let Some(parent_id) = payload.parent_id {
            ensure_exists::<Categories>(state, parent_id, "Category").await?;
        }

        let now = Utc::now();
        let model = categories::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            name: Set(name),
            parent_id: Set(payload.parent_id),
            image: Set(payload.image),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for CategoryResource {
    type Update = UpdateCategoryRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: categories::Model,
        payload: UpdateCategoryRequest,
    ) -> AppResult<categories::Model> {
        let id = current.id;
        let mut active: categories::ActiveModel = current.into();

        if let Some(name) = payload.name {
            let name = required("name", &name)?;
            ensure_absent(
                state,
                Categories::find()
                    .filter(categories::Column::Name.eq(name.as_str()))
                    .filter(categories::Column::Id.ne(id)),
                "Category name is already taken",
            )
            .await?;
            active.name = Set(name);
        }
        if let Some(parent_id) = payload.parent_id {
            if let Some(parent_id) = parent_id {
                if parent_id == id {
                    return Err(AppError::BadRequest(
                        "A category cannot be its own parent".into(),
                    ));
                }
                ensure_exists::<Categories>(state, parent_id, "Category").await?;
            }
            active.parent_id = Set(parent_id);
        }
        if let Some(image) = payload.image {
            active.image = Set(image);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct BrandResource;

impl Resource for BrandResource {
    type Entity = Brands;
    const NAME: &'static str = "brands";
    const LABEL: &'static str = "Brand";

    fn id(model: &brands::Model) -> Uuid {
        model.id
    }

    fn images(model: &brands::Model) -> Vec<String> {
        model.logo.iter().cloned().collect()
    }
}

impl Creatable for BrandResource {
    type Create = CreateBrandRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateBrandRequest,
    ) -> AppResult<brands::Model> {
        let name = required("name", &payload.name)?;
        ensure_absent(
            state,
            Brands::find().filter(brands::Column::Name.eq(name.as_str())),
            "Brand name is already taken",
        )
        .await?;

        let now = Utc::now();
        let model = brands::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            name: Set(name),
            logo: Set(payload.logo),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for BrandResource {
    type Update = UpdateBrandRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: brands::Model,
        payload: UpdateBrandRequest,
    ) -> AppResult<brands::Model> {
        let id = current.id;
        let mut active: brands::ActiveModel = current.into();

        if let Some(name) = payload.name {
            let name = required("name", &name)?;
            ensure_absent(
                state,
                Brands::find()
                    .filter(brands::Column::Name.eq(name.as_str()))
                    .filter(brands::Column::Id.ne(id)),
                "Brand name is already taken",
            )
            .await?;
            active.name = Set(name);
        }
        if let Some(logo) = payload.logo {
            active.logo = Set(logo);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}

pub struct ProductResource;

impl Resource for ProductResource {
    type Entity = Products;
    const NAME: &'static str = "products";
    const LABEL: &'static str = "Product";

    fn id(model: &products::Model) -> Uuid {
        model.id
    }

    fn images(model: &products::Model) -> Vec<String> {
        model.images.clone()
    }

    async fn populate(state: &AppState, models: Vec<products::Model>) -> AppResult<Vec<Value>> {
        let category_ids = models.iter().map(|m| m.category_id).collect();
        let brand_ids = models.iter().filter_map(|m| m.brand_id).collect();
        let categories =
            load_by_ids::<Categories>(state, categories::Column::Id, category_ids).await?;
        let brands = load_by_ids::<Brands>(state, brands::Column::Id, brand_ids).await?;

        models
            .iter()
            .map(|model| -> AppResult<Value> {
                let mut item = to_json(model)?;
                embed(&mut item, "category", categories.get(&model.category_id));
                embed(&mut item, "brand", model.brand_id.and_then(|id| brands.get(&id)));
                Ok(item)
            })
            .collect()
    }
}

fn validate_stock_and_price(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|price| price < 0) {
        return Err(AppError::BadRequest("price cannot be negative".into()));
    }
    if stock.is_some_and(|stock| stock < 0) {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }
    Ok(())
}

impl Creatable for ProductResource {
    type Create = CreateProductRequest;

    async fn create(
        state: &AppState,
        _user: &AuthUser,
        payload: CreateProductRequest,
    ) -> AppResult<products::Model> {
        let title = required("title", &payload.title)?;
        validate_stock_and_price(Some(payload.price), Some(payload.stock))?;
        ensure_absent(
            state,
            Products::find().filter(products::Column::Title.eq(title.as_str())),
            "Product title is already taken",
        )
        .await?;
        ensure_exists::<Categories>(state, payload.category_id, "Category").await?;
        if let Some(brand_id) = payload.brand_id {
            ensure_exists::<Brands>(state, brand_id, "Brand").await?;
        }

        let now = Utc::now();
        let model = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: NotSet,
            title: Set(title),
            description: Set(payload.description),
            price: Set(payload.price),
            stock: Set(payload.stock),
            category_id: Set(payload.category_id),
            brand_id: Set(payload.brand_id),
            images: Set(payload.images),
            is_active: Set(payload.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&state.orm)
        .await?;
        Ok(model)
    }
}

impl Updatable for ProductResource {
    type Update = UpdateProductRequest;

    async fn update(
        state: &AppState,
        _user: &AuthUser,
        current: products::Model,
        payload: UpdateProductRequest,
    ) -> AppResult<products::Model> {
        validate_stock_and_price(payload.price, payload.stock)?;
        let id = current.id;
        let mut active: products::ActiveModel = current.into();

        if let Some(title) = payload.title {
            let title = required("title", &title)?;
            ensure_absent(
                state,
                Products::find()
                    .filter(products::Column::Title.eq(title.as_str()))
                    .filter(products::Column::Id.ne(id)),
                "Product title is already taken",
            )
            .await?;
            active.title = Set(title);
        }
        if let Some(category_id) = payload.category_id {
            ensure_exists::<Categories>(state, category_id, "Category").await?;
            active.category_id = Set(category_id);
        }
        if let Some(brand_id) = payload.brand_id {
            if let Some(brand_id) = brand_id {
                ensure_exists::<Brands>(state, brand_id, "Brand").await?;
            }
            active.brand_id = Set(brand_id);
        }
        if let Some(description) = payload.description {
            active.description = Set(description);
        }
        if let Some(price) = payload.price {
            active.price = Set(price);
        }
        if let Some(stock) = payload.stock {
            active.stock = Set(stock);
        }
        if let Some(images) = payload.images {
            active.images = Set(images);
        }
        if let Some(is_active) = payload.is_active {
            active.is_active = Set(is_active);
        }

        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&state.orm).await?)
    }
}
