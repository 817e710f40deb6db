use axum::extract::Multipart;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        Categories, Stores,
        order_items::{Column as ItemCol, Entity as OrderItems},
        products::{self, Column, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    uploads::{MultipartForm, save_image},
};

const PRODUCT_IMAGE_DIR: &str = "products";

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(store_id) = query.store_id {
        condition = condition.add(Column::StoreId.eq(store_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    Ok(ApiResponse::ok("Product", Product::from(product)))
}

fn validate_fields(name: Option<&str>, price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if name.is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::BadRequest("name is required".into()));
    }
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must be >= 0".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must be >= 0".into()));
    }
    Ok(())
}

async fn ensure_references(
    state: &AppState,
    category_id: Option<Uuid>,
    store_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(id) = category_id {
        Categories::find_by_id(id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound("Category"))?;
    }
    if let Some(id) = store_id {
        Stores::find_by_id(id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound("Store"))?;
    }
    Ok(())
}

async fn insert_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
    image_url: Option<String>,
) -> AppResult<Product> {
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.filter(|d| !d.trim().is_empty())),
        price: Set(payload.price),
        stock: Set(payload.stock),
        category_id: Set(payload.category_id),
        store_id: Set(payload.store_id),
        image_url: Set(image_url),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(Product::from(product))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_fields(Some(&payload.name), Some(payload.price), Some(payload.stock))?;
    ensure_references(state, payload.category_id, payload.store_id).await?;
    let product = insert_product(state, user, payload, None).await?;
    Ok(ApiResponse::ok("Product created", product))
}

/// Multipart product creation: text fields `name`, `description`, `price`,
/// `stock`, `category_id`, `store_id` and an optional `image` file.
pub async fn create_product_with_image(
    state: &AppState,
    user: &AuthUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let mut form = MultipartForm::read(multipart).await?;

    let payload = CreateProductRequest {
        name: form.required_text("name")?.to_string(),
        description: form.text("description").map(str::to_string),
        price: form
            .parsed::<i64>("price")?
            .ok_or_else(|| AppError::BadRequest("price is required".into()))?,
        stock: form.parsed::<i32>("stock")?.unwrap_or(0),
        category_id: form.parsed::<Uuid>("category_id")?,
        store_id: form.parsed::<Uuid>("store_id")?,
    };
    validate_fields(Some(&payload.name), Some(payload.price), Some(payload.stock))?;
    // Store the image only once the product row is known to be insertable.
    ensure_references(state, payload.category_id, payload.store_id).await?;

    let image_url = match form.take_file("image") {
        Some(file) => Some(save_image(&state.config.upload_dir, PRODUCT_IMAGE_DIR, &file).await?),
        None => None,
    };

    let product = insert_product(state, user, payload, image_url).await?;
    Ok(ApiResponse::ok("Product created", product))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_fields(payload.name.as_deref(), payload.price, payload.stock)?;
    ensure_references(state, payload.category_id, payload.store_id).await?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let mut active = existing.into_active_model();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(store_id) = payload.store_id {
        active.store_id = Set(Some(store_id));
    }

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::ok("Updated", Product::from(product)))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let ordered = OrderItems::find()
        .filter(ItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if ordered > 0 {
        return Err(AppError::Conflict(
            "Product has been ordered and cannot be deleted".into(),
        ));
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Deleted", serde_json::json!({ "id": id })))
}
