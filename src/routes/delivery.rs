use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::UserList,
        delivery::{
            AssignOrderRequest, EarningsQuery, EarningsSummary, LocationRequest, OnlineStatus,
            OnlineStatusRequest, ProofUploaded, ReportIssueRequest, UpdateStatusRequest,
        },
        orders::{OrderList, OrderWithItems},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{DeliveryIssue, User},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::delivery_service,
    state::AppState,
    uploads::MAX_UPLOAD_BYTES,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-orders", get(my_orders))
        .route("/assign", post(assign_order))
        .route("/orders/{id}/status", post(update_status))
        .route(
            "/orders/{id}/proof",
            post(upload_proof).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/report-issue", post(report_issue))
        .route("/location", post(update_location))
        .route("/online-status", post(set_online_status))
        .route("/earnings/summary", get(earnings_summary))
        .route("/persons", get(list_delivery_persons))
}

#[utoipa::path(
    get,
    path = "/api/delivery/my-orders",
    params(OrderListQuery),
    responses((status = 200, description = "Orders assigned to the caller", body = ApiResponse<OrderList>)),
    tag = "Delivery"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = delivery_service::my_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/assign",
    request_body = AssignOrderRequest,
    responses((status = 200, description = "Order assigned", body = ApiResponse<OrderWithItems>)),
    tag = "Delivery"
)]
pub async fn assign_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AssignOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = delivery_service::assign_order(
        &state,
        &user,
        payload.order_id,
        payload.delivery_person_id,
    )
    .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/orders/{id}/status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Transition not allowed from the current status"),
        (status = 403, description = "Order not assigned to the caller")
    ),
    tag = "Delivery"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = delivery_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/orders/{id}/proof",
    request_body(content_type = "multipart/form-data", description = "Image in the `file` field"),
    responses((status = 200, description = "Proof stored", body = ApiResponse<ProofUploaded>)),
    tag = "Delivery"
)]
pub async fn upload_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProofUploaded>>> {
    let resp = delivery_service::upload_proof(&state, &user, id, multipart).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/report-issue",
    request_body = ReportIssueRequest,
    responses((status = 200, description = "Issue reported", body = ApiResponse<DeliveryIssue>)),
    tag = "Delivery"
)]
pub async fn report_issue(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ReportIssueRequest>,
) -> AppResult<Json<ApiResponse<DeliveryIssue>>> {
    let resp = delivery_service::report_issue(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/location",
    request_body = LocationRequest,
    responses((status = 200, description = "Location updated", body = ApiResponse<User>)),
    tag = "Delivery"
)]
pub async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<LocationRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = delivery_service::update_location(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/delivery/online-status",
    request_body = OnlineStatusRequest,
    responses((status = 200, description = "Online status updated", body = ApiResponse<OnlineStatus>)),
    tag = "Delivery"
)]
pub async fn set_online_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<OnlineStatusRequest>,
) -> AppResult<Json<ApiResponse<OnlineStatus>>> {
    let resp = delivery_service::set_online_status(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/delivery/earnings/summary",
    params(("period" = String, Query, description = "daily or weekly")),
    responses((status = 200, description = "Earnings for the period", body = ApiResponse<EarningsSummary>)),
    tag = "Delivery"
)]
pub async fn earnings_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<EarningsQuery>,
) -> AppResult<Json<ApiResponse<EarningsSummary>>> {
    let resp = delivery_service::earnings_summary(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/delivery/persons",
    responses((status = 200, description = "All delivery persons", body = ApiResponse<UserList>)),
    tag = "Delivery"
)]
pub async fn list_delivery_persons(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = delivery_service::list_delivery_persons(&state, &user).await?;
    Ok(Json(resp))
}
