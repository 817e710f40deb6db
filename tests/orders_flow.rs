use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{Request, header},
};
use chrono::{Duration, Utc};
use local_grocery::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        delivery::{OnlineStatusRequest, UpdateStatusRequest},
        notifications::{NotificationKind, SendNotificationRequest, TargetAudience},
        orders::{CancelOrderRequest, PlaceOrderItem, PlaceOrderRequest, ReturnRequest},
    },
    entity::{
        Orders, Products, Users, orders::ActiveModel as OrderActive,
        products::ActiveModel as ProductActive, users::ActiveModel as UserActive,
    },
    error::AppError,
    lifecycle::{Badge, DELIVERY_FEE, OrderStatus, PaymentStatus, ReturnStatus, Role},
    middleware::auth::AuthUser,
    services::{delivery_service, notification_service, order_service, product_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<()> = OnceCell::const_new();

// Each test creates its own users and products, so tests can share one database.

fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    MIGRATED
        .get_or_try_init(|| run_migrations(&orm))
        .await?;
    let pool = create_pool(database_url).await?;
    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        upload_dir: std::env::temp_dir().join(format!("local-grocery-tests-{}", Uuid::new_v4())),
    };
    Ok(AppState::new(pool, orm, config))
}

async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let now = Utc::now();
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}@test.local", Uuid::new_v4())),
        password_hash: Set("dummy".into()),
        role: Set(role),
        name: Set(format!("{} user", role.as_str())),
        phone: Set("555-0101".into()),
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

    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

async fn create_product(state: &AppState, price: i64, stock: i32) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("Test product {}", Uuid::new_v4())),
        description: Set(Some("for tests".into())),
        price: Set(price),
        stock: Set(stock),
        category_id: Set(None),
        store_id: Set(None),
        image_url: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product missing"))?;
    Ok(product.stock)
}

fn order_request(items: Vec<(Uuid, i32)>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        delivery_address: "1 Test Lane".into(),
        items: items
            .into_iter()
            .map(|(product_id, quantity)| PlaceOrderItem {
                product_id,
                quantity,
            })
            .collect(),
        payment_method: None,
        promo_code: None,
    }
}

fn status(status: OrderStatus) -> UpdateStatusRequest {
    UpdateStatusRequest {
        status,
        cod_collected: Some(true),
    }
}

#[tokio::test]
async fn order_lifecycle_from_placement_to_refund() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let courier = create_user(&state, Role::Delivery).await?;
    let apples = create_product(&state, 399, 10).await?;
    let milk = create_product(&state, 189, 5).await?;

    let placed = order_service::place_order(
        &state,
        &customer,
        order_request(vec![(apples, 2), (milk, 1)]),
    )
    .await?
    .data
    .expect("order data");
    assert_eq!(placed.order.status, OrderStatus::Placed);
    assert_eq!(placed.order.subtotal, 987);
    assert_eq!(placed.order.tax, 128);
    assert_eq!(placed.order.total, 1115);
    assert_eq!(placed.items.len(), 2);
    assert_eq!(stock_of(&state, apples).await?, 8);
    assert_eq!(stock_of(&state, milk).await?, 4);
    let order_id = placed.order.id;

    // Delivery steps are refused until the order is assigned.
    let err = delivery_service::update_status(&state, &courier, order_id, status(OrderStatus::PickedUp))
        .await
        .expect_err("not assigned yet");
    assert!(matches!(err, AppError::Forbidden(_)));

    delivery_service::assign_order(&state, &admin, order_id, courier.user_id).await?;

    let err = delivery_service::update_status(&state, &courier, order_id, status(OrderStatus::Delivered))
        .await
        .expect_err("deliver before payment");
    assert!(
        matches!(err, AppError::BadRequest(ref msg) if msg == "Order cannot be delivered at current status: ASSIGNED")
    );

    for next in [
        OrderStatus::PickedUp,
        OrderStatus::PaymentReceived,
        OrderStatus::Delivered,
    ] {
        let updated = delivery_service::update_status(&state, &courier, order_id, status(next))
            .await?
            .data
            .expect("order data");
        assert_eq!(updated.order.status, next);
    }

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.payment_status, PaymentStatus::Completed);
    assert!(order.cod_collected);
    assert!(order.assigned_at.is_some());
    assert!(order.picked_up_at.is_some());
    assert!(order.payment_received_at.is_some());
    assert!(order.delivered_at.is_some());

    let person = Users::find_by_id(courier.user_id)
        .one(&state.orm)
        .await?
        .expect("courier row");
    assert_eq!(person.total_deliveries, 1);
    assert_eq!(person.total_earnings, DELIVERY_FEE);
    assert_eq!(person.performance_badge, None::<Badge>);

    // Delivered orders cannot be cancelled.
    let err = order_service::cancel_order(&state, &customer, order_id, CancelOrderRequest::default())
        .await
        .expect_err("delivered order");
    assert!(matches!(err, AppError::BadRequest(_)));

    let item_id = placed.items[0].id;
    let returned = order_service::request_return(
        &state,
        &customer,
        order_id,
        item_id,
        ReturnRequest {
            reason: "Bruised".into(),
            description: None,
        },
    )
    .await?
    .data
    .expect("item data");
    assert_eq!(returned.return_status, ReturnStatus::Requested);
    assert_eq!(
        returned.refund_amount,
        Some(placed.items[0].price_at_purchase * i64::from(placed.items[0].quantity))
    );

    let err = order_service::request_return(
        &state,
        &customer,
        order_id,
        item_id,
        ReturnRequest {
            reason: "Again".into(),
            description: None,
        },
    )
    .await
    .expect_err("second request");
    assert!(matches!(err, AppError::BadRequest(_)));

    order_service::process_return(&state, &admin, Some(order_id), item_id, ReturnStatus::Approved)
        .await?;
    let refunded = order_service::process_return(&state, &admin, None, item_id, ReturnStatus::Refunded)
        .await?
        .data
        .expect("item data");
    assert_eq!(refunded.return_status, ReturnStatus::Refunded);
    assert!(refunded.return_processed_at.is_some());

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order row");
    assert_eq!(order.payment_status, PaymentStatus::Refunded);

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_leaves_nothing_behind() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let customer = create_user(&state, Role::Customer).await?;
    let plenty = create_product(&state, 100, 50).await?;
    let scarce = create_product(&state, 100, 1).await?;

    let err = order_service::place_order(
        &state,
        &customer,
        order_request(vec![(plenty, 3), (scarce, 2)]),
    )
    .await
    .expect_err("not enough stock");
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.starts_with("Not enough stock for:")));

    assert_eq!(stock_of(&state, plenty).await?, 50);
    assert_eq!(stock_of(&state, scarce).await?, 1);

    let err = order_service::place_order(&state, &customer, order_request(vec![]))
        .await
        .expect_err("empty order");
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::place_order(&state, &customer, order_request(vec![(plenty, 0)]))
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn cancelling_restores_stock_and_checks_ownership() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let owner = create_user(&state, Role::Customer).await?;
    let stranger = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, 250, 4).await?;

    let placed = order_service::place_order(&state, &owner, order_request(vec![(product, 3)]))
        .await?
        .data
        .expect("order data");
    assert_eq!(stock_of(&state, product).await?, 1);

    let err = order_service::cancel_order(&state, &stranger, placed.order.id, CancelOrderRequest::default())
        .await
        .expect_err("not the owner");
    assert!(matches!(err, AppError::Forbidden(_)));

    let cancelled = order_service::cancel_order(
        &state,
        &owner,
        placed.order.id,
        CancelOrderRequest::default(),
    )
    .await?
    .data
    .expect("order data");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.order.payment_status, PaymentStatus::Cancelled);
    assert_eq!(cancelled.order.cancelled_by, Some(owner.user_id));
    assert_eq!(
        cancelled.order.cancel_reason.as_deref(),
        Some("Customer requested cancellation")
    );
    assert_eq!(stock_of(&state, product).await?, 4);

    Ok(())
}

#[tokio::test]
async fn returns_close_seven_days_after_delivery() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, 500, 3).await?;
    let placed = order_service::place_order(&state, &customer, order_request(vec![(product, 1)]))
        .await?
        .data
        .expect("order data");

    let order = Orders::find_by_id(placed.order.id)
        .one(&state.orm)
        .await?
        .expect("order row");
    let mut active: OrderActive = order.into_active_model();
    active.status = Set(OrderStatus::Delivered);
    active.delivered_at = Set(Some((Utc::now() - Duration::days(8)).into()));
    active.update(&state.orm).await?;

    let err = order_service::request_return(
        &state,
        &customer,
        placed.order.id,
        placed.items[0].id,
        ReturnRequest {
            reason: "Too late".into(),
            description: None,
        },
    )
    .await
    .expect_err("window expired");
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("expired")));

    Ok(())
}

#[tokio::test]
async fn online_sessions_and_notification_fan_out() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let admin = create_user(&state, Role::Admin).await?;
    let courier = create_user(&state, Role::Delivery).await?;

    let went_online = delivery_service::set_online_status(
        &state,
        &courier,
        OnlineStatusRequest { online: true },
    )
    .await?
    .data
    .expect("status data");
    assert!(went_online.online);
    let first_seen = went_online.last_online_at.expect("stamped when going online");

    // Repeated calls change nothing.
    for online in [true, false, false] {
        let resp = delivery_service::set_online_status(&state, &courier, OnlineStatusRequest { online })
            .await?
            .data
            .expect("status data");
        assert_eq!(resp.online, online);
        assert_eq!(resp.last_online_at, Some(first_seen));
    }

    let sent = notification_service::send_notification(
        &state,
        &admin,
        SendNotificationRequest {
            title: "Shift bonus".into(),
            message: "Double fees tonight".into(),
            kind: NotificationKind::Deal,
            target_audience: TargetAudience::Delivery,
            scheduled_for: None,
        },
    )
    .await?
    .data
    .expect("notification data");
    assert!(sent.recipients >= 1);

    let inbox = notification_service::my_notifications(&state, &courier)
        .await?
        .data
        .expect("inbox data");
    let entry = inbox
        .items
        .iter()
        .find(|e| e.notification.id == sent.notification.id)
        .expect("courier received the notification");
    assert!(entry.read_at.is_none());

    notification_service::mark_read(&state, &courier, entry.id).await?;
    let err = notification_service::mark_read(&state, &admin, entry.id)
        .await
        .expect_err("someone else's log");
    assert!(matches!(err, AppError::NotFound(_)));

    let scheduled = notification_service::send_notification(
        &state,
        &admin,
        SendNotificationRequest {
            title: "Tomorrow".into(),
            message: "Store opens late".into(),
            kind: NotificationKind::Info,
            target_audience: TargetAudience::All,
            scheduled_for: Some(Utc::now() + Duration::days(1)),
        },
    )
    .await?
    .data
    .expect("notification data");
    assert_eq!(scheduled.recipients, 0);

    Ok(())
}

#[tokio::test]
async fn merged_quantities_that_overflow_are_rejected() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, 100, 5).await?;

    let err = order_service::place_order(
        &state,
        &customer,
        order_request(vec![(product, i32::MAX), (product, 1)]),
    )
    .await
    .expect_err("merged quantity overflows");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(stock_of(&state, product).await?, 5);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let initial_stock = 3;
    let product = create_product(&state, 150, initial_stock).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let customer = create_user(&state, Role::Customer).await?;
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            order_service::place_order(&state, &customer, order_request(vec![(product, 1)])).await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(AppError::BadRequest(msg)) => assert!(msg.starts_with("Not enough stock for:")),
            Err(other) => return Err(anyhow::anyhow!("unexpected error: {other}")),
        }
    }

    assert_eq!(placed, initial_stock);
    assert_eq!(stock_of(&state, product).await?, 0);

    Ok(())
}

fn product_form(category_id: Uuid) -> anyhow::Result<Request<Body>> {
    let boundary = "grocery-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"name\"\r\n\r\nPears\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"price\"\r\n\r\n300\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"category_id\"\r\n\r\n{category_id}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"image\"; filename=\"pear.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         not-really-a-png\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/products")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))?;
    Ok(request)
}

#[tokio::test]
async fn unknown_category_keeps_the_image_off_disk() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let admin = create_user(&state, Role::Admin).await?;

    let multipart = Multipart::from_request(product_form(Uuid::new_v4())?, &()).await?;
    let err = product_service::create_product_with_image(&state, &admin, multipart)
        .await
        .expect_err("category does not exist");
    assert!(matches!(err, AppError::NotFound("Category")));
    assert!(!state.config.upload_dir.join("products").exists());

    Ok(())
}

#[tokio::test]
async fn large_audiences_get_one_log_per_user() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let admin = create_user(&state, Role::Admin).await?;

    // Enough customers that a per-row parameter list would exceed Postgres' bind limit.
    let batch = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, role, name, phone)
        SELECT gen_random_uuid(), $1 || '-' || n || '@test.local', 'dummy', 'CUSTOMER', 'bulk', '555-0100'
        FROM generate_series(1, 14000) AS n
        "#,
    )
    .bind(batch.to_string())
    .execute(&state.pool)
    .await?;

    let sent = notification_service::send_notification(
        &state,
        &admin,
        SendNotificationRequest {
            title: "Weekend deal".into(),
            message: "Fruit is half price".into(),
            kind: NotificationKind::Offer,
            target_audience: TargetAudience::Customers,
            scheduled_for: None,
        },
    )
    .await?
    .data
    .expect("notification data");
    assert!(sent.recipients >= 14_000);

    let logged: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM notification_logs WHERE notification_id = $1",
    )
    .bind(sent.notification.id)
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(logged as usize, sent.recipients);

    Ok(())
}
