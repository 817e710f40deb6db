use local_grocery::{
    config::AppConfig,
    db::{DbPool, create_orm_conn, create_pool, run_migrations},
    lifecycle::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(&config.database_url).await?;

    let admin_id = ensure_user(&pool, "admin@grocery.local", "admin-pass-123", "Admin", Role::Admin).await?;
    let customer_id =
        ensure_user(&pool, "customer@grocery.local", "customer-pass-123", "Casey Customer", Role::Customer)
            .await?;
    let courier_id =
        ensure_user(&pool, "courier@grocery.local", "courier-pass-123", "Dana Driver", Role::Delivery)
            .await?;

    let store_id = ensure_store(&pool, "Corner Market", "12 Main Street").await?;
    let produce = ensure_category(&pool, "Produce").await?;
    let dairy = ensure_category(&pool, "Dairy").await?;
    let bakery = ensure_category(&pool, "Bakery").await?;

    let products = [
        ("Bananas (1 kg)", "Ripe yellow bananas", 249, 120, produce),
        ("Gala Apples (1 kg)", "Crisp and sweet", 399, 80, produce),
        ("Whole Milk (1 L)", "Fresh whole milk", 189, 60, dairy),
        ("Cheddar Block (400 g)", "Aged cheddar", 649, 25, dairy),
        ("Sourdough Loaf", "Baked this morning", 499, 15, bakery),
        ("Butter Croissant", "Flaky and buttery", 229, 8, bakery),
    ];
    for (name, description, price, stock, category_id) in products {
        ensure_product(&pool, name, description, price, stock, category_id, store_id).await?;
    }

    println!(
        "Seed completed. Admin: {admin_id}, customer: {customer_id}, delivery: {courier_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &DbPool,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role, name, phone)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .bind(name)
    .bind("555-0100")
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(id)
}

async fn ensure_store(pool: &DbPool, name: &str, location: &str) -> anyhow::Result<Uuid> {
    sqlx::query("INSERT INTO stores (id, name, location) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(location)
        .execute(pool)
        .await?;
    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM stores WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

async fn ensure_category(pool: &DbPool, name: &str) -> anyhow::Result<Uuid> {
    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(name)
        .execute(pool)
        .await?;
    let (id,): (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE lower(name) = lower($1)")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

async fn ensure_product(
    pool: &DbPool,
    name: &str,
    description: &str,
    price: i64,
    stock: i32,
    category_id: Uuid,
    store_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO products (id, name, description, price, stock, category_id, store_id)
        SELECT $1, $2, $3, $4, $5, $6, $7
        WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .bind(price)
    .bind(stock)
    .bind(category_id)
    .bind(store_id)
    .execute(pool)
    .await?;
    Ok(())
}
