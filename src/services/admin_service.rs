use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            CreateDeliveryPartnerRequest, DashboardStats, DeliveryStatsSummary,
            InventoryAdjustRequest, LimitQuery, LowStockQuery, SalesChart, SalesChartQuery,
            StatusChart, TodayStats, TopProduct, TopProductList, UpdateUserRequest, UserDetails,
            UserStats,
        },
        orders::{OrderList, ReturnEntry, ReturnList},
        products::ProductList,
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    lifecycle::{OrderStatus, ReturnStatus, Role},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product, User},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::auth_service::{hash_password, normalize_email, validate_password},
    state::AppState,
};

const IN_PROGRESS: [OrderStatus; 3] = [
    OrderStatus::Assigned,
    OrderStatus::PickedUp,
    OrderStatus::PaymentReceived,
];

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let (total_revenue, total_orders): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total) FILTER (WHERE status <> 'CANCELLED'), 0)::BIGINT,
               COUNT(*)::BIGINT
        FROM orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let (total_customers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*)::BIGINT FROM users WHERE role = 'CUSTOMER'")
            .fetch_one(&state.pool)
            .await?;

    let (pending_returns,): (i64,) =
        sqlx::query_as("SELECT COUNT(*)::BIGINT FROM order_items WHERE return_status = 'REQUESTED'")
            .fetch_one(&state.pool)
            .await?;

    let (sales, orders, customers): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total) FILTER (WHERE status <> 'CANCELLED'), 0)::BIGINT,
               COUNT(*)::BIGINT,
               COUNT(DISTINCT user_id)::BIGINT
        FROM orders
        WHERE created_at >= $1
        "#,
    )
    .bind(start_of_day(Utc::now()))
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::ok(
        "Dashboard",
        DashboardStats {
            total_revenue,
            total_orders,
            total_customers,
            pending_returns,
            today: TodayStats {
                sales,
                orders,
                customers,
            },
        },
    ))
}

pub async fn recent_orders(
    state: &AppState,
    user: &AuthUser,
    query: LimitQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let items: Vec<Order> = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .limit(query.normalize())
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Recent orders", OrderList { items }, Some(meta)))
}

async fn paged_orders(
    state: &AppState,
    condition: Condition,
    pagination: Pagination,
    message: &str,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt);

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
        message,
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn unassigned_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let condition = Condition::all()
        .add(OrderCol::Status.eq(OrderStatus::Placed))
        .add(OrderCol::DeliveryPersonId.is_null());
    paged_orders(state, condition, pagination, "Unassigned orders").await
}

pub async fn assigned_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let condition = Condition::all()
        .add(OrderCol::DeliveryPersonId.is_not_null())
        .add(OrderCol::Status.is_in(IN_PROGRESS));
    paged_orders(state, condition, pagination, "Assigned orders").await
}

#[derive(Debug, sqlx::FromRow)]
struct ReturnRow {
    item_id: Uuid,
    order_id: Uuid,
    customer_name: String,
    customer_email: String,
    product_name: String,
    quantity: i32,
    price_at_purchase: i64,
    return_status: String,
    return_reason: Option<String>,
    return_requested_at: Option<DateTime<Utc>>,
    refund_amount: Option<i64>,
}

impl TryFrom<ReturnRow> for ReturnEntry {
    type Error = AppError;

    fn try_from(row: ReturnRow) -> Result<Self, Self::Error> {
        Ok(ReturnEntry {
            item_id: row.item_id,
            order_id: row.order_id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            product_name: row.product_name,
            quantity: row.quantity,
            price_at_purchase: row.price_at_purchase,
            return_status: row.return_status.parse::<ReturnStatus>()?,
            return_reason: row.return_reason,
            return_requested_at: row.return_requested_at,
            refund_amount: row.refund_amount,
        })
    }
}

pub async fn list_returns(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ReturnList>> {
    ensure_admin(user)?;
    let rows: Vec<ReturnRow> = sqlx::query_as(
        r#"
        SELECT oi.id AS item_id,
               oi.order_id,
               u.name AS customer_name,
               u.email AS customer_email,
               p.name AS product_name,
               oi.quantity,
               oi.price_at_purchase,
               oi.return_status,
               oi.return_reason,
               oi.return_requested_at,
               oi.refund_amount
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN users u ON u.id = o.user_id
        JOIN products p ON p.id = oi.product_id
        WHERE oi.return_status <> 'NONE'
        ORDER BY oi.return_requested_at DESC NULLS LAST
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(ReturnEntry::try_from)
        .collect::<AppResult<Vec<_>>>()?;
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Returns", ReturnList { items }, Some(meta)))
}

/// One point per day ending at `today`, oldest first; days without sales are zero.
pub fn daily_series(today: NaiveDate, days: i64, totals: &[(NaiveDate, i64)]) -> SalesChart {
    let by_day: HashMap<NaiveDate, i64> = totals.iter().copied().collect();
    let (labels, values) = (0..days)
        .rev()
        .map(|back| {
            let day = today - Duration::days(back);
            (
                day.format("%Y-%m-%d").to_string(),
                by_day.get(&day).copied().unwrap_or(0),
            )
        })
        .unzip();
    SalesChart { labels, values }
}

/// Counts for every order status in lifecycle order, zero when absent.
pub fn status_series(counts: &[(OrderStatus, i64)]) -> StatusChart {
    let values = OrderStatus::ALL
        .iter()
        .map(|status| {
            counts
                .iter()
                .filter(|(s, _)| s == status)
                .map(|(_, n)| n)
                .sum::<i64>()
        })
        .collect();
    StatusChart {
        labels: OrderStatus::ALL.to_vec(),
        values,
    }
}

pub async fn sales_chart(
    state: &AppState,
    user: &AuthUser,
    query: SalesChartQuery,
) -> AppResult<ApiResponse<SalesChart>> {
    ensure_admin(user)?;
    let days = query.normalize();
    let today = Utc::now().date_naive();
    let since = start_of_day(Utc::now()) - Duration::days(days - 1);

    let rows: Vec<(NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
               COALESCE(SUM(total), 0)::BIGINT
        FROM orders
        WHERE status <> 'CANCELLED' AND created_at >= $1
        GROUP BY day
        "#,
    )
    .bind(since)
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::ok("Sales chart", daily_series(today, days, &rows)))
}

pub async fn orders_by_status(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<StatusChart>> {
    ensure_admin(user)?;
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*)::BIGINT FROM orders GROUP BY status")
            .fetch_all(&state.pool)
            .await?;

    let counts: Vec<(OrderStatus, i64)> = rows
        .into_iter()
        .filter_map(|(status, n)| status.parse::<OrderStatus>().ok().map(|s| (s, n)))
        .collect();

    Ok(ApiResponse::ok("Orders by status", status_series(&counts)))
}

pub async fn top_products(
    state: &AppState,
    user: &AuthUser,
    query: LimitQuery,
) -> AppResult<ApiResponse<TopProductList>> {
    ensure_admin(user)?;
    let rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"
        SELECT oi.product_id, SUM(oi.quantity)::BIGINT AS sold
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.status <> 'CANCELLED'
        GROUP BY oi.product_id
        ORDER BY sold DESC
        LIMIT $1
        "#,
    )
    .bind(query.normalize() as i64)
    .fetch_all(&state.pool)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|(id, _)| *id).collect();
    let mut products: HashMap<Uuid, Product> = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, Product::from(p)))
        .collect();

    let items: Vec<TopProduct> = rows
        .into_iter()
        .filter_map(|(id, sales_count)| {
            products
                .remove(&id)
                .map(|product| TopProduct { product, sales_count })
        })
        .collect();

    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Top products", TopProductList { items }, Some(meta)))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(query.threshold()))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);

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
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    let txn = state.orm.begin().await?;
    let product = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let new_stock = product.stock + payload.delta;
    if new_stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".into()));
    }

    let mut active = product.into_active_model();
    active.stock = Set(new_stock);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "inventory_adjust",
        "products",
        serde_json::json!({ "product_id": updated.id, "delta": payload.delta }),
    )
    .await;

    Ok(ApiResponse::ok("Inventory updated", Product::from(updated)))
}

pub async fn user_stats(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserStats>> {
    ensure_admin(user)?;
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT role, COUNT(*)::BIGINT FROM users GROUP BY role")
            .fetch_all(&state.pool)
            .await?;

    let mut by_role: BTreeMap<String, i64> = [Role::Customer, Role::Delivery, Role::Admin]
        .iter()
        .map(|role| (role.as_str().to_string(), 0))
        .collect();
    for (role, count) in rows {
        *by_role.entry(role).or_default() += count;
    }
    let total = by_role.values().sum();

    Ok(ApiResponse::ok("User stats", UserStats { by_role, total }))
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<users::Model> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn user_details(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<UserDetails>> {
    ensure_admin(user)?;
    let found = find_user(state, id).await?;

    let (completed_deliveries, active_deliveries) = if found.role == Role::Delivery {
        let completed = Orders::find()
            .filter(OrderCol::DeliveryPersonId.eq(id))
            .filter(OrderCol::Status.eq(OrderStatus::Delivered))
            .count(&state.orm)
            .await? as i64;
        let active = Orders::find()
            .filter(OrderCol::DeliveryPersonId.eq(id))
            .filter(OrderCol::Status.is_in(IN_PROGRESS))
            .count(&state.orm)
            .await? as i64;
        (Some(completed), Some(active))
    } else {
        (None, None)
    };

    Ok(ApiResponse::ok(
        "User details",
        UserDetails {
            user: User::from(found),
            completed_deliveries,
            active_deliveries,
        },
    ))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let found = find_user(state, id).await?;

    let mut active = found.into_active_model();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(phone) = payload.phone {
        let phone = phone.trim().to_string();
        if phone.is_empty() {
            return Err(AppError::BadRequest("phone must not be empty".into()));
        }
        active.phone = Set(phone);
    }
    if let Some(vehicle_type) = payload.vehicle_type {
        active.vehicle_type = Set(Some(vehicle_type));
    }
    if let Some(vehicle_number) = payload.vehicle_number {
        active.vehicle_number = Set(Some(vehicle_number));
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    if let Some(location) = payload.current_location {
        active.current_location = Set(Some(location));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_update",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("User updated", User::from(updated)))
}

pub async fn create_delivery_partner(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDeliveryPartnerRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let email = normalize_email(&payload.email)?;
    validate_password(&email, &payload.password)?;
    let phone = payload.phone.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::BadRequest("phone is required".into()));
    }

    let exists = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Email is already taken".into()));
    }

    let now = Utc::now();
    let partner = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(Role::Delivery),
        name: Set(payload.name.trim().to_string()),
        phone: Set(phone),
        vehicle_type: Set(payload.vehicle_type),
        vehicle_number: Set(payload.vehicle_number),
        is_available: Set(true),
        rating: Set(5.0),
        total_deliveries: Set(0),
        total_earnings: Set(0),
        incentives: Set(0),
        bonus: Set(0),
        online_status: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "delivery_partner_create",
        "users",
        serde_json::json!({ "user_id": partner.id }),
    )
    .await;

    Ok(ApiResponse::ok("Delivery partner created", User::from(partner)))
}

pub async fn set_availability(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    is_available: bool,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let found = find_user(state, id).await?;
    if found.role != Role::Delivery {
        return Err(AppError::BadRequest("User is not a delivery person".into()));
    }

    let mut active = found.into_active_model();
    active.is_available = Set(is_available);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Availability updated", User::from(updated)))
}

pub async fn delivery_stats(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DeliveryStatsSummary>> {
    ensure_admin(user)?;
    let (total, available, average_rating, deliveries): (i64, i64, f64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*)::BIGINT,
               COUNT(*) FILTER (WHERE is_available)::BIGINT,
               COALESCE(AVG(rating), 0)::FLOAT8,
               COALESCE(SUM(total_deliveries), 0)::BIGINT
        FROM users
        WHERE role = 'DELIVERY'
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::ok(
        "Delivery stats",
        DeliveryStatsSummary {
            total_delivery_persons: total,
            available_delivery_persons: available,
            average_rating,
            total_deliveries: deliveries,
        },
    ))
}
