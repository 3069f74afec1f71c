use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{QueryBuilder, Row};
use tracing::{debug, info, warn};

/// Moderation lifecycle of an advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdStatus {
    Pending,
    Approved,
    Rejected,
    Sold,
}

impl AdStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdStatus::Pending => "pending",
            AdStatus::Approved => "approved",
            AdStatus::Rejected => "rejected",
            AdStatus::Sold => "sold",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => AdStatus::Pending,
            "approved" => AdStatus::Approved,
            "rejected" => AdStatus::Rejected,
            "sold" => AdStatus::Sold,
            other => {
                warn!(status = %other, "unknown advertisement status, treating as pending");
                AdStatus::Pending
            }
        }
    }
}

/// Represents a user in the database
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub role: String,
    pub language: String,
    pub state: String,
    pub draft: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_moderator(&self) -> bool {
        self.role == "moderator"
    }
}

/// Represents a product category
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name_ru: String,
    pub name_uz: String,
}

impl Category {
    pub fn name_for(&self, language: &str) -> &str {
        if language == "uz" {
            &self.name_uz
        } else {
            &self.name_ru
        }
    }
}

/// Represents a brand within a category
#[derive(Debug, Clone, PartialEq)]
pub struct Brand {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

/// Fields needed to insert a new advertisement
#[derive(Debug, Clone, PartialEq)]
pub struct NewAdvertisement {
    pub user_id: i64,
    pub category_id: i64,
    pub brand_id: i64,
    pub model: String,
    pub price: i64,
    pub description: String,
    pub city: String,
    pub photo_path: String,
    pub phone: String,
}

/// An advertisement joined with the names needed to render it
#[derive(Debug, Clone, PartialEq)]
pub struct AdCard {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub brand_id: i64,
    pub model: String,
    pub price: i64,
    pub description: String,
    pub city: String,
    pub photo_path: String,
    pub phone: String,
    pub status: AdStatus,
    pub created_at: DateTime<Utc>,
    pub category_name_ru: String,
    pub category_name_uz: String,
    pub brand_name: String,
    pub seller_username: Option<String>,
    pub seller_telegram_id: i64,
}

impl AdCard {
    pub fn category_name_for(&self, language: &str) -> &str {
        if language == "uz" {
            &self.category_name_uz
        } else {
            &self.category_name_ru
        }
    }
}

/// Search filters for browsing approved listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdSearchFilters {
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub city: Option<String>,
    /// Defaults to approved when unset
    pub status: Option<AdStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result cap for a single search, newest first
pub const SEARCH_LIMIT: i64 = 50;

const AD_CARD_COLUMNS: &str = "a.id, a.user_id, a.category_id, a.brand_id, a.model, a.price, \
     a.description, a.city, a.photo_path, a.phone, a.status, a.created_at, \
     c.name_ru, c.name_uz, b.name, u.username, u.telegram_id";

fn ad_card_from_row(row: &sqlx::postgres::PgRow) -> AdCard {
    let status: String = row.get(10);
    AdCard {
        id: row.get(0),
        user_id: row.get(1),
        category_id: row.get(2),
        brand_id: row.get(3),
        model: row.get(4),
        price: row.get(5),
        description: row.get(6),
        city: row.get(7),
        photo_path: row.get(8),
        phone: row.get(9),
        status: AdStatus::parse(&status),
        created_at: row.get(11),
        category_name_ru: row.get(12),
        category_name_uz: row.get(13),
        brand_name: row.get(14),
        seller_username: row.get(15),
        seller_telegram_id: row.get(16),
    }
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema");

    // Create users table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT UNIQUE NOT NULL,
            username VARCHAR(100),
            first_name VARCHAR(100),
            role VARCHAR(20) NOT NULL DEFAULT 'user',
            language VARCHAR(10) NOT NULL DEFAULT 'ru',
            state VARCHAR(50) NOT NULL DEFAULT 'start',
            draft TEXT,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    // Create categories table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            name_ru VARCHAR(100) NOT NULL,
            name_uz VARCHAR(100) NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create categories table")?;

    // Create brands table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS brands (
            id BIGSERIAL PRIMARY KEY,
            category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            name VARCHAR(100) NOT NULL,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create brands table")?;

    // Create advertisements table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS advertisements (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            brand_id BIGINT NOT NULL REFERENCES brands(id) ON DELETE CASCADE,
            model VARCHAR(255) NOT NULL,
            price BIGINT NOT NULL,
            description TEXT NOT NULL,
            city VARCHAR(100) NOT NULL,
            photo_path VARCHAR(500) NOT NULL,
            phone VARCHAR(20) NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            rejection_reason TEXT,
            moderated_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create advertisements table")?;

    // Create favorites table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS favorites (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            advertisement_id BIGINT NOT NULL REFERENCES advertisements(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, advertisement_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create favorites table")?;

    // Create payments table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS payments (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            advertisement_id BIGINT REFERENCES advertisements(id) ON DELETE SET NULL,
            amount BIGINT NOT NULL,
            receipt_path VARCHAR(500),
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create payments table")?;

    // Create indexes for the hot query paths
    sqlx::query("CREATE INDEX IF NOT EXISTS ads_status_created_idx ON advertisements(status, created_at DESC)")
        .execute(pool)
        .await
        .context("Failed to create advertisements status index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS ads_user_id_idx ON advertisements(user_id)")
        .execute(pool)
        .await
        .context("Failed to create advertisements user_id index")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS brands_category_id_idx ON brands(category_id)")
        .execute(pool)
        .await
        .context("Failed to create brands category_id index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Seed the category/brand reference tables on first run
pub async fn seed_reference_data(pool: &PgPool) -> Result<()> {
    let row = sqlx::query("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await
        .context("Failed to count categories")?;
    let count: i64 = row.get(0);
    if count > 0 {
        debug!("Reference data already present, skipping seed");
        return Ok(());
    }

    info!("Seeding categories and brands");

    let categories = [
        ("Смартфоны", "Smartfonlar"),
        ("Планшеты", "Planshetlar"),
        ("Ноутбуки", "Noutbuklar"),
        ("Наушники", "Quloqchinlar"),
        ("Часы", "Soatlar"),
    ];
    let brands = [
        (1_i64, &["Apple", "Samsung", "Xiaomi", "Huawei"][..]),
        (2, &["Apple", "Samsung", "Lenovo"][..]),
        (3, &["Apple", "Dell", "HP", "Lenovo"][..]),
        (4, &["Apple", "Sony", "JBL", "Bose"][..]),
        (5, &["Apple", "Samsung", "Garmin", "Fitbit"][..]),
    ];

    for (name_ru, name_uz) in categories {
        sqlx::query("INSERT INTO categories (name_ru, name_uz) VALUES ($1, $2)")
            .bind(name_ru)
            .bind(name_uz)
            .execute(pool)
            .await
            .context("Failed to seed category")?;
    }

    for (category_id, names) in brands {
        for name in names {
            sqlx::query("INSERT INTO brands (category_id, name) VALUES ($1, $2)")
                .bind(category_id)
                .bind(name)
                .execute(pool)
                .await
                .context("Failed to seed brand")?;
        }
    }

    Ok(())
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get(0),
        telegram_id: row.get(1),
        username: row.get(2),
        first_name: row.get(3),
        role: row.get(4),
        language: row.get(5),
        state: row.get(6),
        draft: row.get(7),
        created_at: row.get(8),
        updated_at: row.get(9),
    }
}

const USER_COLUMNS: &str =
    "id, telegram_id, username, first_name, role, language, state, draft, created_at, updated_at";

/// Get or create a user by Telegram ID; refreshes the stored username on
/// every contact so moderation cards stay current
pub async fn get_or_create_user(
    pool: &PgPool,
    telegram_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    language: &str,
) -> Result<User> {
    debug!(telegram_id = %telegram_id, "Getting or creating user");

    if let Some(user) = get_user_by_telegram_id(pool, telegram_id).await? {
        if user.username.as_deref() != username || user.first_name.as_deref() != first_name {
            sqlx::query(
                "UPDATE users SET username = $1, first_name = $2, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $3",
            )
            .bind(username)
            .bind(first_name)
            .bind(telegram_id)
            .execute(pool)
            .await
            .context("Failed to refresh user profile")?;
        }
        return Ok(User {
            username: username.map(str::to_string),
            first_name: first_name.map(str::to_string),
            ..user
        });
    }

    let row = sqlx::query(&format!(
        "INSERT INTO users (telegram_id, username, first_name, language) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(telegram_id)
    .bind(username)
    .bind(first_name)
    .bind(language)
    .fetch_one(pool)
    .await
    .context("Failed to create new user")?;

    let user = user_from_row(&row);
    debug!(user_id = %user.id, "User created successfully");
    Ok(user)
}

/// Get a user by Telegram ID
pub async fn get_user_by_telegram_id(pool: &PgPool, telegram_id: i64) -> Result<Option<User>> {
    debug!(telegram_id = %telegram_id, "Getting user by telegram_id");

    let row = sqlx::query(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"
    ))
    .bind(telegram_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by telegram_id")?;

    Ok(row.map(|row| user_from_row(&row)))
}

/// Persist a language choice
pub async fn set_user_language(pool: &PgPool, telegram_id: i64, language: &str) -> Result<()> {
    sqlx::query(
        "UPDATE users SET language = $1, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $2",
    )
    .bind(language)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("Failed to set user language")?;
    Ok(())
}

/// Persist the conversation state and draft atomically. This runs before any
/// reply is sent so a crash never leaves the user in an unsaved state.
pub async fn set_conversation(
    pool: &PgPool,
    telegram_id: i64,
    state: &str,
    draft: &str,
) -> Result<()> {
    debug!(telegram_id = %telegram_id, state = %state, "Persisting conversation state");

    sqlx::query(
        "UPDATE users SET state = $1, draft = $2, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = $3",
    )
    .bind(state)
    .bind(draft)
    .bind(telegram_id)
    .execute(pool)
    .await
    .context("Failed to persist conversation state")?;
    Ok(())
}

/// List all categories in seed order
pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name_ru, name_uz FROM categories ORDER BY id")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    Ok(rows
        .into_iter()
        .map(|row| Category {
            id: row.get(0),
            name_ru: row.get(1),
            name_uz: row.get(2),
        })
        .collect())
}

/// Get a category by ID
pub async fn get_category(pool: &PgPool, category_id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name_ru, name_uz FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category")?;

    Ok(row.map(|row| Category {
        id: row.get(0),
        name_ru: row.get(1),
        name_uz: row.get(2),
    }))
}

/// List brands belonging to a category, alphabetically
pub async fn list_brands(pool: &PgPool, category_id: i64) -> Result<Vec<Brand>> {
    let rows =
        sqlx::query("SELECT id, category_id, name FROM brands WHERE category_id = $1 ORDER BY name")
            .bind(category_id)
            .fetch_all(pool)
            .await
            .context("Failed to list brands")?;

    Ok(rows
        .into_iter()
        .map(|row| Brand {
            id: row.get(0),
            category_id: row.get(1),
            name: row.get(2),
        })
        .collect())
}

/// Get a brand by ID
pub async fn get_brand(pool: &PgPool, brand_id: i64) -> Result<Option<Brand>> {
    let row = sqlx::query("SELECT id, category_id, name FROM brands WHERE id = $1")
        .bind(brand_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get brand")?;

    Ok(row.map(|row| Brand {
        id: row.get(0),
        category_id: row.get(1),
        name: row.get(2),
    }))
}

/// Insert a new advertisement in pending status
pub async fn create_advertisement(pool: &PgPool, ad: &NewAdvertisement) -> Result<i64> {
    debug!(user_id = %ad.user_id, "Creating new advertisement");

    let row = sqlx::query(
        "INSERT INTO advertisements (user_id, category_id, brand_id, model, price, description, city, photo_path, phone)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(ad.user_id)
    .bind(ad.category_id)
    .bind(ad.brand_id)
    .bind(&ad.model)
    .bind(ad.price)
    .bind(&ad.description)
    .bind(&ad.city)
    .bind(&ad.photo_path)
    .bind(&ad.phone)
    .fetch_one(pool)
    .await
    .context("Failed to insert new advertisement")?;

    let ad_id: i64 = row.get(0);
    info!(ad_id = %ad_id, user_id = %ad.user_id, "Advertisement created");
    Ok(ad_id)
}

/// Get a single advertisement joined with its display names
pub async fn get_ad_card(pool: &PgPool, ad_id: i64) -> Result<Option<AdCard>> {
    let row = sqlx::query(&format!(
        "SELECT {AD_CARD_COLUMNS} FROM advertisements a
         JOIN categories c ON a.category_id = c.id
         JOIN brands b ON a.brand_id = b.id
         JOIN users u ON a.user_id = u.id
         WHERE a.id = $1"
    ))
    .bind(ad_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get advertisement")?;

    Ok(row.map(|row| ad_card_from_row(&row)))
}

/// List a user's own advertisements, newest first
pub async fn list_user_ads(pool: &PgPool, user_id: i64) -> Result<Vec<AdCard>> {
    let rows = sqlx::query(&format!(
        "SELECT {AD_CARD_COLUMNS} FROM advertisements a
         JOIN categories c ON a.category_id = c.id
         JOIN brands b ON a.brand_id = b.id
         JOIN users u ON a.user_id = u.id
         WHERE a.user_id = $1
         ORDER BY a.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list user advertisements")?;

    Ok(rows.iter().map(ad_card_from_row).collect())
}

/// List advertisements awaiting moderation, oldest first
pub async fn list_pending_ads(pool: &PgPool) -> Result<Vec<AdCard>> {
    let rows = sqlx::query(&format!(
        "SELECT {AD_CARD_COLUMNS} FROM advertisements a
         JOIN categories c ON a.category_id = c.id
         JOIN brands b ON a.brand_id = b.id
         JOIN users u ON a.user_id = u.id
         WHERE a.status = 'pending'
         ORDER BY a.created_at"
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list pending advertisements")?;

    Ok(rows.iter().map(ad_card_from_row).collect())
}

/// Update an advertisement's status, optionally with a rejection reason.
/// `expected` guards the transition: the row is only touched when its
/// current status matches.
pub async fn update_ad_status(
    pool: &PgPool,
    ad_id: i64,
    expected: AdStatus,
    next: AdStatus,
    rejection_reason: Option<&str>,
) -> Result<bool> {
    debug!(ad_id = %ad_id, next = %next.as_str(), "Updating advertisement status");

    let result = sqlx::query(
        "UPDATE advertisements
         SET status = $1, rejection_reason = $2, moderated_at = CURRENT_TIMESTAMP,
             updated_at = CURRENT_TIMESTAMP
         WHERE id = $3 AND status = $4",
    )
    .bind(next.as_str())
    .bind(rejection_reason)
    .bind(ad_id)
    .bind(expected.as_str())
    .execute(pool)
    .await
    .context("Failed to update advertisement status")?;

    let updated = result.rows_affected() > 0;
    if updated {
        info!(ad_id = %ad_id, status = %next.as_str(), "Advertisement status updated");
    } else {
        info!(ad_id = %ad_id, "Advertisement not in expected status, no update");
    }
    Ok(updated)
}

/// Search advertisements with optional filters, capped and newest first
pub async fn search_ads(pool: &PgPool, filters: &AdSearchFilters) -> Result<Vec<AdCard>> {
    debug!(?filters, "Searching advertisements");

    let status = filters.status.unwrap_or(AdStatus::Approved);
    let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
        "SELECT {AD_CARD_COLUMNS} FROM advertisements a
         JOIN categories c ON a.category_id = c.id
         JOIN brands b ON a.brand_id = b.id
         JOIN users u ON a.user_id = u.id
         WHERE a.status = "
    ));
    builder.push_bind(status.as_str());

    if let Some(category_id) = filters.category_id {
        builder.push(" AND a.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(brand_id) = filters.brand_id {
        builder.push(" AND a.brand_id = ");
        builder.push_bind(brand_id);
    }
    if let Some(city) = &filters.city {
        builder.push(" AND a.city ILIKE ");
        builder.push_bind(format!("%{}%", city));
    }

    builder.push(" ORDER BY a.created_at DESC LIMIT ");
    builder.push_bind(filters.limit.unwrap_or(SEARCH_LIMIT).min(SEARCH_LIMIT));
    builder.push(" OFFSET ");
    builder.push_bind(filters.offset.unwrap_or(0).max(0));

    let rows = builder
        .build()
        .fetch_all(pool)
        .await
        .context("Failed to search advertisements")?;

    let ads: Vec<AdCard> = rows.iter().map(ad_card_from_row).collect();
    debug!("Found {} advertisements", ads.len());
    Ok(ads)
}

/// Add an advertisement to a user's favorites; idempotent
pub async fn add_favorite(pool: &PgPool, user_id: i64, ad_id: i64) -> Result<()> {
    sqlx::query(
        "INSERT INTO favorites (user_id, advertisement_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(ad_id)
    .execute(pool)
    .await
    .context("Failed to add favorite")?;
    Ok(())
}

/// Remove an advertisement from a user's favorites
pub async fn remove_favorite(pool: &PgPool, user_id: i64, ad_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND advertisement_id = $2")
        .bind(user_id)
        .bind(ad_id)
        .execute(pool)
        .await
        .context("Failed to remove favorite")?;
    Ok(result.rows_affected() > 0)
}

/// Check whether an advertisement is in a user's favorites
pub async fn is_favorite(pool: &PgPool, user_id: i64, ad_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM favorites WHERE user_id = $1 AND advertisement_id = $2")
        .bind(user_id)
        .bind(ad_id)
        .fetch_optional(pool)
        .await
        .context("Failed to check favorite")?;
    Ok(row.is_some())
}

/// List a user's favorite advertisements, most recently saved first. Only
/// approved listings render; a favorite whose ad was rejected or sold stays
/// in the table but disappears from the view.
pub async fn list_favorites(pool: &PgPool, user_id: i64) -> Result<Vec<AdCard>> {
    let rows = sqlx::query(&format!(
        "SELECT {AD_CARD_COLUMNS} FROM favorites f
         JOIN advertisements a ON f.advertisement_id = a.id
         JOIN categories c ON a.category_id = c.id
         JOIN brands b ON a.brand_id = b.id
         JOIN users u ON a.user_id = u.id
         WHERE f.user_id = $1 AND a.status = 'approved'
         ORDER BY f.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list favorites")?;

    Ok(rows.iter().map(ad_card_from_row).collect())
}

/// Record a pending listing-fee payment
pub async fn create_payment(pool: &PgPool, user_id: i64, amount: i64) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO payments (user_id, amount, status) VALUES ($1, $2, 'pending') RETURNING id",
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(pool)
    .await
    .context("Failed to create payment record")?;

    let payment_id: i64 = row.get(0);
    debug!(payment_id = %payment_id, user_id = %user_id, "Payment record created");
    Ok(payment_id)
}

/// Attach a receipt to the user's most recent pending payment and link the
/// created advertisement
pub async fn submit_payment_receipt(
    pool: &PgPool,
    user_id: i64,
    ad_id: i64,
    receipt_path: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE payments SET receipt_path = $1, advertisement_id = $2, status = 'submitted'
         WHERE id = (
             SELECT id FROM payments
             WHERE user_id = $3 AND status = 'pending'
             ORDER BY created_at DESC LIMIT 1
         )",
    )
    .bind(receipt_path)
    .bind(ad_id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to submit payment receipt")?;

    Ok(result.rows_affected() > 0)
}
