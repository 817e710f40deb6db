use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AssignRequest, AvailabilityRequest, CreateDeliveryPartnerRequest, DashboardStats,
            DeliveryStatsSummary, InventoryAdjustRequest, LimitQuery, LowStockQuery,
            ProcessReturnRequest, SalesChart, SalesChartQuery, StatusChart, TopProductList,
            UpdateUserRequest, UserDetails, UserList, UserStats,
        },
        notifications::{NotificationList, SendNotificationRequest, SentNotification},
        orders::{OrderList, OrderWithItems, ReturnList},
        products::ProductList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{OrderItem, Product, User},
    response::ApiResponse,
    routes::params::Pagination,
    services::{
        admin_service, delivery_service, notification_service, order_service, product_service,
    },
    state::AppState,
    uploads::MAX_UPLOAD_BYTES,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/orders/recent", get(recent_orders))
        .route("/orders/unassigned", get(unassigned_orders))
        .route("/orders/assigned", get(assigned_orders))
        .route("/orders/{id}/assign", post(assign_order))
        .route("/returns", get(list_returns))
        .route("/returns/{item_id}/process", post(process_return))
        .route("/charts/sales", get(sales_chart))
        .route("/charts/orders-by-status", get(orders_by_status))
        .route(
            "/notifications",
            get(list_notifications).post(send_notification),
        )
        .route(
            "/products",
            post(create_product).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/products/top", get(top_products))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/inventory/{id}", patch(adjust_inventory))
        .route("/delivery-persons", get(delivery_persons))
        .route("/delivery-partners", post(create_delivery_partner))
        .route("/delivery/{id}/availability", post(set_availability))
        .route("/delivery/stats", get(delivery_stats))
        .route("/users/stats", get(user_stats))
        .route("/users/{id}", get(user_details).put(update_user))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses((status = 200, description = "Dashboard figures", body = ApiResponse<DashboardStats>)),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let resp = admin_service::dashboard(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/recent",
    params(("limit" = Option<u64>, Query, description = "Default 10, max 100")),
    responses((status = 200, description = "Most recent orders", body = ApiResponse<OrderList>)),
    tag = "Admin"
)]
pub async fn recent_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::recent_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/unassigned",
    params(Pagination),
    responses((status = 200, description = "Placed orders without a delivery person", body = ApiResponse<OrderList>)),
    tag = "Admin"
)]
pub async fn unassigned_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::unassigned_orders(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/assigned",
    params(Pagination),
    responses((status = 200, description = "Orders out for delivery", body = ApiResponse<OrderList>)),
    tag = "Admin"
)]
pub async fn assigned_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::assigned_orders(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/assign",
    request_body = AssignRequest,
    responses((status = 200, description = "Order assigned", body = ApiResponse<OrderWithItems>)),
    tag = "Admin"
)]
pub async fn assign_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp =
        delivery_service::assign_order(&state, &user, id, payload.delivery_person_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/returns",
    responses((status = 200, description = "Return requests", body = ApiResponse<ReturnList>)),
    tag = "Admin"
)]
pub async fn list_returns(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReturnList>>> {
    let resp = admin_service::list_returns(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/returns/{item_id}/process",
    request_body = ProcessReturnRequest,
    responses((status = 200, description = "Return processed", body = ApiResponse<OrderItem>)),
    tag = "Admin"
)]
pub async fn process_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<ProcessReturnRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    let resp = order_service::process_return(&state, &user, None, item_id, payload.action).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/charts/sales",
    params(("days" = Option<i64>, Query, description = "Default 7, between 1 and 90")),
    responses((status = 200, description = "Daily sales", body = ApiResponse<SalesChart>)),
    tag = "Admin"
)]
pub async fn sales_chart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SalesChartQuery>,
) -> AppResult<Json<ApiResponse<SalesChart>>> {
    let resp = admin_service::sales_chart(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/charts/orders-by-status",
    responses((status = 200, description = "Order counts per status", body = ApiResponse<StatusChart>)),
    tag = "Admin"
)]
pub async fn orders_by_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<StatusChart>>> {
    let resp = admin_service::orders_by_status(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    responses((status = 200, description = "All notifications", body = ApiResponse<NotificationList>)),
    tag = "Admin"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let resp = notification_service::list_notifications(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/notifications",
    request_body = SendNotificationRequest,
    responses((status = 201, description = "Notification stored", body = ApiResponse<SentNotification>)),
    tag = "Admin"
)]
pub async fn send_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SendNotificationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SentNotification>>)> {
    let resp = notification_service::send_notification(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body(content_type = "multipart/form-data", description = "Product fields and an optional `image` file"),
    responses((status = 201, description = "Product created", body = ApiResponse<Product>)),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product_with_image(&state, &user, multipart).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/admin/products/top",
    params(("limit" = Option<u64>, Query, description = "Default 10, max 100")),
    responses((status = 200, description = "Best sellers by quantity", body = ApiResponse<TopProductList>)),
    tag = "Admin"
)]
pub async fn top_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<TopProductList>>> {
    let resp = admin_service::top_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Default 10"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses((status = 200, description = "Products at or below the threshold", body = ApiResponse<ProductList>)),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = admin_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventory/{id}",
    request_body = InventoryAdjustRequest,
    responses((status = 200, description = "Stock adjusted", body = ApiResponse<Product>)),
    tag = "Admin"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = admin_service::adjust_inventory(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/delivery-persons",
    responses((status = 200, description = "All delivery persons", body = ApiResponse<UserList>)),
    tag = "Admin"
)]
pub async fn delivery_persons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = delivery_service::list_delivery_persons(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/delivery-partners",
    request_body = CreateDeliveryPartnerRequest,
    responses(
        (status = 201, description = "Delivery partner created", body = ApiResponse<User>),
        (status = 409, description = "Email already taken")
    ),
    tag = "Admin"
)]
pub async fn create_delivery_partner(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDeliveryPartnerRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = admin_service::create_delivery_partner(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/admin/delivery/{id}/availability",
    request_body = AvailabilityRequest,
    responses((status = 200, description = "Availability updated", body = ApiResponse<User>)),
    tag = "Admin"
)]
pub async fn set_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AvailabilityRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::set_availability(&state, &user, id, payload.is_available).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/delivery/stats",
    responses((status = 200, description = "Delivery fleet figures", body = ApiResponse<DeliveryStatsSummary>)),
    tag = "Admin"
)]
pub async fn delivery_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DeliveryStatsSummary>>> {
    let resp = admin_service::delivery_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/stats",
    responses((status = 200, description = "User counts per role", body = ApiResponse<UserStats>)),
    tag = "Admin"
)]
pub async fn user_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserStats>>> {
    let resp = admin_service::user_stats(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    responses((status = 200, description = "User details", body = ApiResponse<UserDetails>)),
    tag = "Admin"
)]
pub async fn user_details(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserDetails>>> {
    let resp = admin_service::user_details(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    request_body = UpdateUserRequest,
    responses((status = 200, description = "User updated", body = ApiResponse<User>)),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::update_user(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
