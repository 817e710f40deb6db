use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{CategoryList, CreateCategoryRequest, CreateStoreRequest, StoreList},
    entity::{
        categories::{self, Column as CategoryCol, Entity as Categories},
        stores::{self, Column as StoreCol, Entity as Stores},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Store},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_stores(state: &AppState) -> AppResult<ApiResponse<StoreList>> {
    let items: Vec<Store> = Stores::find()
        .order_by_asc(StoreCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Store::from)
        .collect();
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Stores", StoreList { items }, Some(meta)))
}

pub async fn create_store(
    state: &AppState,
    user: &AuthUser,
    payload: CreateStoreRequest,
) -> AppResult<ApiResponse<Store>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let exists = Stores::find()
        .filter(StoreCol::Name.eq(name.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("Store already exists: {name}")));
    }

    let store = stores::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        location: Set(payload.location.trim().to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "store_create",
        "stores",
        serde_json::json!({ "store_id": store.id }),
    )
    .await;

    Ok(ApiResponse::ok("Store created", Store::from(store)))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<Category> = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(meta),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }

    let exists = Categories::find()
        .filter(Expr::expr(Func::lower(Expr::col(CategoryCol::Name))).eq(name.to_lowercase()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(format!("Category already exists: {name}")));
    }

    let category = categories::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::ok("Category created", Category::from(category)))
}
