use shop_admin_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    middleware::guard::{Action, permission},
    services::password::hash_secret,
};
use sqlx::PgPool;
use uuid::Uuid;

const CATALOG_RESOURCES: [&str; 6] = [
    "products",
    "categories",
    "brands",
    "coupons",
    "banners",
    "website",
];
const SALES_RESOURCES: [&str; 4] = ["orders", "payments", "baskets", "transactions"];
const SUPPORT_RESOURCES: [&str; 3] = ["comments", "questions", "answers"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool();

    let mobile = std::env::var("SEED_ADMIN_MOBILE").unwrap_or_else(|_| "+10000000000".into());
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin12345".into());
    let admin_id = ensure_super_admin(pool, &mobile, &password).await?;

    ensure_role(
        pool,
        "catalog-manager",
        "Manages the catalog and storefront",
        &all_actions(&CATALOG_RESOURCES),
    )
    .await?;
    ensure_role(
        pool,
        "sales-manager",
        "Handles orders and payments",
        &all_actions(&SALES_RESOURCES),
    )
    .await?;
    ensure_role(
        pool,
        "support",
        "Moderates comments and Q&A",
        &SUPPORT_RESOURCES
            .iter()
            .flat_map(|resource| {
                [
                    permission(resource, Action::Read),
                    permission(resource, Action::Update),
                ]
            })
            .collect::<Vec<_>>(),
    )
    .await?;

    seed_catalog(pool).await?;

    println!("Seed completed. Super admin ID: {admin_id} (mobile {mobile})");
    Ok(())
}

fn all_actions(resources: &[&str]) -> Vec<String> {
    resources
        .iter()
        .flat_map(|resource| Action::ALL.map(|action| permission(resource, action)))
        .collect()
}

async fn ensure_super_admin(pool: &PgPool, mobile: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_secret(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users
            (id, mobile, password_hash, is_verified, is_staff, is_super_admin, is_active)
        VALUES ($1, $2, $3, TRUE, TRUE, TRUE, TRUE)
        ON CONFLICT (mobile) DO UPDATE
            SET is_verified = TRUE, is_staff = TRUE, is_super_admin = TRUE, is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(mobile)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Ensured super admin {mobile}");
    Ok(id)
}

async fn ensure_role(
    pool: &PgPool,
    name: &str,
    description: &str,
    permissions: &[String],
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO roles (id, name, description, permissions)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (name) DO UPDATE SET permissions = EXCLUDED.permissions
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(description)
    .bind(permissions)
    .execute(pool)
    .await?;

    println!("Ensured role {name} ({} permissions)", permissions.len());
    Ok(())
}

async fn seed_catalog(pool: &PgPool) -> anyhow::Result<()> {
    let (category_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name)
        VALUES ($1, 'Merchandise')
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await?;

    let (brand_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO brands (id, name)
        VALUES ($1, 'Ferris & Co')
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .fetch_one(pool)
    .await?;

    let products = vec![
        ("Axum Hoodie", "Warm hoodie for Rustaceans", 550000_i64, 50_i32),
        ("Ferris Mug", "Coffee tastes better with Ferris", 120000, 100),
        ("Rust Sticker Pack", "Decorate your laptop", 50000, 200),
        ("E-book: Async Rust", "Learn async Rust patterns", 250000, 75),
    ];

    for (title, description, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, description, price, stock, category_id, brand_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (title) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(category_id)
        .bind(brand_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
