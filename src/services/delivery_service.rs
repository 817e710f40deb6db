use axum::extract::Multipart;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::UserList,
        delivery::{
            EarningsQuery, EarningsSummary, IssueStatus, LocationRequest, OnlineStatus,
            OnlineStatusRequest, ProofUploaded, ReportIssueRequest, UpdateStatusRequest,
        },
        orders::{OrderList, OrderWithItems},
    },
    entity::{
        delivery_issues,
        delivery_sessions::{self, Column as SessionCol, Entity as DeliverySessions},
        orders::{self, Column as OrderCol, Entity as Orders},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    lifecycle::{
        DELIVERY_FEE, DeliveryStats, OrderStatus, PaymentStatus, Role, Transition,
    },
    middleware::auth::{AuthUser, ensure_admin, ensure_delivery},
    models::{DeliveryIssue, Order, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::{lock_order, with_items},
    state::AppState,
    uploads::{MultipartForm, save_image},
};

const PROOF_DIR: &str = "delivery-proofs";

fn ensure_assigned_to(user: &AuthUser, order: &orders::Model) -> AppResult<()> {
    if order.delivery_person_id != Some(user.user_id) {
        return Err(AppError::forbidden("Order is not assigned to you"));
    }
    Ok(())
}

async fn find_delivery_person(state: &AppState, id: Uuid) -> AppResult<users::Model> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Delivery person"))
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_delivery(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::DeliveryPersonId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn assign_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    delivery_person_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;

    let person = find_delivery_person(state, delivery_person_id).await?;
    if person.role != Role::Delivery {
        return Err(AppError::BadRequest("User is not a delivery person".into()));
    }

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let next = order.status.apply(Transition::Assign)?;
    let now = Utc::now();

    let mut active = order.into_active_model();
    active.status = Set(next);
    active.delivery_person_id = Set(Some(person.id));
    active.assigned_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(%order_id, status = %next, delivery_person_id = %person.id, "order assigned");
    audit::record(
        &state.pool,
        user.user_id,
        "order_assign",
        "orders",
        serde_json::json!({ "order_id": order_id, "delivery_person_id": person.id }),
    )
    .await;

    Ok(ApiResponse::ok("Order assigned", data))
}

/// Moves an order along the delivery side of the lifecycle: pickup, payment
/// confirmation and hand-over. Delivering credits the fee to the caller.
pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: UpdateStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_delivery(user)?;
    let transition = Transition::for_delivery_update(payload.status)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    ensure_assigned_to(user, &order)?;

    let next = order.status.apply(transition)?;
    let now = Utc::now();

    let mut active = order.into_active_model();
    active.status = Set(next);
    active.updated_at = Set(now.into());
    match transition {
        Transition::Pickup => active.picked_up_at = Set(Some(now.into())),
        Transition::ConfirmPayment => {
            active.payment_received_at = Set(Some(now.into()));
            active.payment_status = Set(PaymentStatus::Completed);
            if let Some(collected) = payload.cod_collected {
                active.cod_collected = Set(collected);
            }
        }
        Transition::Deliver => active.delivered_at = Set(Some(now.into())),
        Transition::Assign | Transition::Cancel => {}
    }
    let order = active.update(&txn).await?;

    if transition == Transition::Deliver {
        let person = Users::find_by_id(user.user_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("Delivery person"))?;

        let mut stats = DeliveryStats {
            total_deliveries: person.total_deliveries,
            total_earnings: person.total_earnings,
            rating: person.rating,
        };
        let badge = stats.record_delivery();

        let mut person = person.into_active_model();
        person.total_deliveries = Set(stats.total_deliveries);
        person.total_earnings = Set(stats.total_earnings);
        person.performance_badge = Set(badge);
        person.updated_at = Set(now.into());
        person.update(&txn).await?;
    }

    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(%order_id, status = %next, "order status updated");
    audit::record(
        &state.pool,
        user.user_id,
        "order_status",
        "orders",
        serde_json::json!({ "order_id": order_id, "status": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::ok("Order status updated", data))
}

pub async fn upload_proof(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    multipart: Multipart,
) -> AppResult<ApiResponse<ProofUploaded>> {
    ensure_delivery(user)?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    ensure_assigned_to(user, &order)?;

    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::BadRequest("file is required".into()))?;
    let image_url = save_image(&state.config.upload_dir, PROOF_DIR, &file).await?;

    let mut active = order.into_active_model();
    active.delivery_proof_image_url = Set(Some(image_url.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "delivery_proof",
        "orders",
        serde_json::json!({ "order_id": order_id, "image_url": image_url }),
    )
    .await;

    Ok(ApiResponse::ok("Proof uploaded", ProofUploaded { image_url }))
}

pub async fn report_issue(
    state: &AppState,
    user: &AuthUser,
    payload: ReportIssueRequest,
) -> AppResult<ApiResponse<DeliveryIssue>> {
    ensure_delivery(user)?;
    let description = payload.description.trim().to_string();
    if description.is_empty() {
        return Err(AppError::BadRequest("description is required".into()));
    }

    let order = Orders::find_by_id(payload.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    ensure_assigned_to(user, &order)?;

    let issue = delivery_issues::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        reported_by: Set(user.user_id),
        issue_type: Set(payload.issue_type),
        description: Set(description),
        status: Set(IssueStatus::Open),
        reported_at: Set(Utc::now().into()),
        resolved_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(order_id = %order.id, issue_id = %issue.id, "delivery issue reported");

    Ok(ApiResponse::ok("Issue reported", DeliveryIssue::from(issue)))
}

pub async fn update_location(
    state: &AppState,
    user: &AuthUser,
    payload: LocationRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_delivery(user)?;
    if !payload.is_valid() {
        return Err(AppError::BadRequest(
            "latitude must be within [-90, 90] and longitude within [-180, 180]".into(),
        ));
    }

    let person = find_delivery_person(state, user.user_id).await?;
    let mut active = person.into_active_model();
    active.current_location = Set(Some(payload.as_location()));
    active.updated_at = Set(Utc::now().into());
    let person = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Location updated", User::from(person)))
}

/// Going online opens a session unless one is already open; going offline
/// closes every open session.
pub async fn set_online_status(
    state: &AppState,
    user: &AuthUser,
    payload: OnlineStatusRequest,
) -> AppResult<ApiResponse<OnlineStatus>> {
    ensure_delivery(user)?;
    let now = Utc::now();

    let txn = state.orm.begin().await?;
    let person = Users::find_by_id(user.user_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Delivery person"))?;

    let open_session = DeliverySessions::find()
        .filter(SessionCol::DeliveryPersonId.eq(user.user_id))
        .filter(SessionCol::EndedAt.is_null())
        .one(&txn)
        .await?;

    let mut active = person.into_active_model();
    active.online_status = Set(payload.online);
    active.updated_at = Set(now.into());

    if payload.online {
        if open_session.is_none() {
            delivery_sessions::ActiveModel {
                id: Set(Uuid::new_v4()),
                delivery_person_id: Set(user.user_id),
                started_at: Set(now.into()),
                ended_at: Set(None),
            }
            .insert(&txn)
            .await?;
            active.last_online_at = Set(Some(now.into()));
        }
    } else {
        DeliverySessions::update_many()
            .col_expr(SessionCol::EndedAt, Expr::value(now))
            .filter(SessionCol::DeliveryPersonId.eq(user.user_id))
            .filter(SessionCol::EndedAt.is_null())
            .exec(&txn)
            .await?;
    }

    let person = active.update(&txn).await?;
    txn.commit().await?;

    tracing::debug!(user_id = %user.user_id, online = payload.online, "online status changed");

    Ok(ApiResponse::ok(
        "Online status updated",
        OnlineStatus {
            online: person.online_status,
            last_online_at: person.last_online_at.map(|at| at.with_timezone(&Utc)),
        },
    ))
}

pub async fn earnings_summary(
    state: &AppState,
    user: &AuthUser,
    query: EarningsQuery,
) -> AppResult<ApiResponse<EarningsSummary>> {
    ensure_delivery(user)?;
    let person = find_delivery_person(state, user.user_id).await?;
    let since = query.period.window_start(Utc::now());

    let total_deliveries = Orders::find()
        .filter(OrderCol::DeliveryPersonId.eq(user.user_id))
        .filter(OrderCol::Status.eq(OrderStatus::Delivered))
        .filter(OrderCol::DeliveredAt.gte(since))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::ok(
        "Earnings summary",
        EarningsSummary {
            period: query.period,
            total_deliveries,
            total_earnings: total_deliveries * DELIVERY_FEE,
            incentives: person.incentives,
            bonus: person.bonus,
            performance_badge: person.performance_badge,
        },
    ))
}

pub async fn list_delivery_persons(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let items: Vec<User> = Users::find()
        .filter(UserCol::Role.eq(Role::Delivery))
        .order_by_asc(UserCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success(
        "Delivery persons",
        UserList { items },
        Some(meta),
    ))
}
