use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        CancelOrderRequest, NotesRequest, OrderList, OrderWithItems, PlaceOrderRequest,
        ReturnRequest,
    },
    entity::{
        order_items::{self, Column as ItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    lifecycle::{
        LifecycleError, OrderStatus, OrderTotals, PaymentStatus, ReturnStatus, Role, Transition,
        ensure_returnable, refund_amount, reserve_stock,
    },
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

const MAX_NOTES_LEN: usize = 500;
const DEFAULT_CANCEL_REASON: &str = "Customer requested cancellation";

pub(crate) async fn items_for<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    let items = OrderItems::find()
        .filter(ItemCol::OrderId.eq(order_id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(items)
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
) -> AppResult<OrderWithItems> {
    let items = items_for(conn, order.id).await?;
    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

/// Loads an order and holds its row lock until `txn` ends.
pub(crate) async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<orders::Model> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

fn can_view(user: &AuthUser, order: &orders::Model) -> bool {
    user.is_admin()
        || order.user_id == user.user_id
        || order.delivery_person_id == Some(user.user_id)
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    match user.role {
        Role::Admin => {}
        Role::Customer => condition = condition.add(OrderCol::UserId.eq(user.user_id)),
        Role::Delivery => condition = condition.add(OrderCol::DeliveryPersonId.eq(user.user_id)),
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let delivery_address = payload.delivery_address.trim().to_string();
    if delivery_address.is_empty() {
        return Err(AppError::BadRequest("delivery_address is required".into()));
    }
    if payload.items.is_empty() {
        return Err(LifecycleError::EmptyOrder.into());
    }

    // Merge repeated products; the sorted map also fixes the row-lock order.
    let mut requested: BTreeMap<Uuid, i32> = BTreeMap::new();
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(LifecycleError::InvalidQuantity.into());
        }
        let merged = requested.entry(item.product_id).or_default();
        *merged = merged
            .checked_add(item.quantity)
            .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
    }

    let txn = state.orm.begin().await?;

    let mut lines = Vec::with_capacity(requested.len());
    for (product_id, quantity) in requested {
        let product = Products::find_by_id(product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        reserve_stock(&product.name, product.stock, quantity)?;

        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .filter(ProdCol::Stock.gte(quantity))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(LifecycleError::InsufficientStock {
                product: product.name,
            }
            .into());
        }

        lines.push((product, quantity));
    }

    let totals = OrderTotals::from_lines(lines.iter().map(|(p, q)| (p.price, *q)));
    let now = Utc::now();

    let order = orders::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        delivery_address: Set(delivery_address),
        status: Set(OrderStatus::Placed),
        subtotal: Set(totals.subtotal),
        tax: Set(totals.tax),
        total: Set(totals.total),
        promo_code: Set(payload
            .promo_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())),
        payment_method: Set(payload.payment_method.unwrap_or_default()),
        payment_status: Set(PaymentStatus::Pending),
        cod_collected: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (product, quantity) in &lines {
        let item = order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(*quantity),
            price_at_purchase: Set(product.price),
            return_status: Set(ReturnStatus::NotRequested),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    txn.commit().await?;

    tracing::info!(order_id = %order.id, status = %order.status, total = order.total, "order placed");
    audit::record(
        &state.pool,
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Order placed",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if !can_view(user, &order) {
        return Err(AppError::forbidden("You do not have access to this order"));
    }

    Ok(ApiResponse::ok("OK", with_items(&state.orm, order).await?))
}

pub async fn update_notes(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: NotesRequest,
) -> AppResult<ApiResponse<Order>> {
    let notes = payload.notes.trim().to_string();
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(AppError::BadRequest(format!(
            "notes must be at most {MAX_NOTES_LEN} characters"
        )));
    }

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if !can_view(user, &order) {
        return Err(AppError::forbidden("You do not have access to this order"));
    }

    let mut active = order.into_active_model();
    active.delivery_notes = Set(Some(notes).filter(|n| !n.is_empty()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Notes updated", Order::from(order)))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CancelOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, id).await?;

    let allowed = user.is_admin() || (user.role == Role::Customer && order.user_id == user.user_id);
    if !allowed {
        return Err(AppError::forbidden("You can only cancel your own orders"));
    }

    let next = order.status.apply(Transition::Cancel)?;

    let items = OrderItems::find()
        .filter(ItemCol::OrderId.eq(order.id))
        .order_by_asc(ItemCol::ProductId)
        .all(&txn)
        .await?;
    for item in &items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(&txn)
            .await?;
    }

    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
    let now = Utc::now();

    let mut active = order.into_active_model();
    active.status = Set(next);
    active.payment_status = Set(PaymentStatus::Cancelled);
    active.cancelled_at = Set(Some(now.into()));
    active.cancelled_by = Set(Some(user.user_id));
    active.cancel_reason = Set(Some(reason));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    let data = with_items(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, status = %next, "order cancelled");
    audit::record(
        &state.pool,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Order cancelled", data))
}

pub async fn request_return(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    item_id: Uuid,
    payload: ReturnRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    let reason = payload.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::BadRequest("reason is required".into()));
    }

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if order.user_id != user.user_id {
        return Err(AppError::forbidden("You can only return items from your own orders"));
    }

    let item = OrderItems::find_by_id(item_id)
        .filter(ItemCol::OrderId.eq(order_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order item"))?;

    let now = Utc::now();
    ensure_returnable(
        item.return_status,
        order.status,
        order.delivered_at.map(|at| at.with_timezone(&Utc)),
        now,
    )?;

    let refund = refund_amount(item.price_at_purchase, item.quantity);
    let mut active = item.into_active_model();
    active.return_status = Set(ReturnStatus::Requested);
    active.return_reason = Set(Some(reason));
    active.return_description = Set(payload.description.filter(|d| !d.trim().is_empty()));
    active.return_requested_at = Set(Some(now.into()));
    active.refund_amount = Set(Some(refund));
    let item = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(%order_id, %item_id, "return requested");
    audit::record(
        &state.pool,
        user.user_id,
        "return_request",
        "order_items",
        serde_json::json!({ "order_id": order_id, "item_id": item_id, "refund_amount": refund }),
    )
    .await;

    Ok(ApiResponse::ok("Return requested", OrderItem::from(item)))
}

/// Admin decision on a pending return. When `order_id` is given the item must
/// belong to that order.
pub async fn process_return(
    state: &AppState,
    user: &AuthUser,
    order_id: Option<Uuid>,
    item_id: Uuid,
    target: ReturnStatus,
) -> AppResult<ApiResponse<OrderItem>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let mut finder = OrderItems::find_by_id(item_id);
    if let Some(order_id) = order_id {
        finder = finder.filter(ItemCol::OrderId.eq(order_id));
    }
    let item = finder
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order item"))?;

    let next = item.return_status.process(target)?;
    let order_id = item.order_id;

    let mut active = item.into_active_model();
    active.return_status = Set(next);
    active.return_processed_at = Set(Some(Utc::now().into()));
    let item = active.update(&txn).await?;

    if next == ReturnStatus::Refunded {
        let order = lock_order(&txn, order_id).await?;
        let mut order = order.into_active_model();
        order.payment_status = Set(PaymentStatus::Refunded);
        order.updated_at = Set(Utc::now().into());
        order.update(&txn).await?;
    }

    txn.commit().await?;

    tracing::info!(%order_id, %item_id, status = %next, "return processed");
    audit::record(
        &state.pool,
        user.user_id,
        "return_process",
        "order_items",
        serde_json::json!({ "order_id": order_id, "item_id": item_id, "status": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::ok("Return updated", OrderItem::from(item)))
}
