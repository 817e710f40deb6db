use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::{
    dto::catalog::{CreateStoreRequest, StoreList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Store,
    response::ApiResponse,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_stores).post(create_store))
}

#[utoipa::path(
    get,
    path = "/api/stores",
    responses((status = 200, description = "List stores", body = ApiResponse<StoreList>)),
    tag = "Catalog"
)]
pub async fn list_stores(State(state): State<AppState>) -> AppResult<Json<ApiResponse<StoreList>>> {
    let resp = catalog_service::list_stores(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = ApiResponse<Store>),
        (status = 409, description = "Store already exists")
    ),
    tag = "Catalog"
)]
pub async fn create_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Store>>)> {
    let resp = catalog_service::create_store(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
