use anyhow::{Context, Result};
use sqlx::PgPool;
use std::env;
use telebazaar::db::*;

/// Helper macro to skip tests when database is not available
macro_rules! skip_if_no_db {
    ($test_fn:expr) => {
        match setup_test_db().await {
            Ok(pool) => $test_fn(&pool).await,
            Err(_) => {
                eprintln!("Skipping test: Database not available");
                Ok(())
            }
        }
    };
}

async fn setup_test_db() -> Result<PgPool> {
    // Skip tests if no DATABASE_URL is provided
    let database_url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping database tests: DATABASE_URL not set");
            return Err(anyhow::anyhow!("Test database not configured"));
        }
    };

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to test database")?;

    // Clean up any existing test data
    for table in [
        "payments",
        "favorites",
        "advertisements",
        "brands",
        "categories",
        "users",
    ] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table} CASCADE"))
            .execute(&pool)
            .await?;
    }

    // Initialize schema and reference data
    init_database_schema(&pool).await?;
    seed_reference_data(&pool).await?;

    Ok(pool)
}

/// Create a user plus one pending advertisement in the first seeded
/// category/brand, returning (user, ad_id).
async fn seed_ad(pool: &PgPool, telegram_id: i64, city: &str) -> Result<(User, i64)> {
    let user = get_or_create_user(pool, telegram_id, Some("seller"), Some("Seller"), "ru").await?;
    let category = list_categories(pool).await?[0].clone();
    let brand = list_brands(pool, category.id).await?[0].clone();
    let ad_id = create_advertisement(
        pool,
        &NewAdvertisement {
            user_id: user.id,
            category_id: category.id,
            brand_id: brand.id,
            model: "Test Model 13".to_string(),
            price: 12_000_000,
            description: "A perfectly serviceable test listing".to_string(),
            city: city.to_string(),
            photo_path: "uploads/test.jpg".to_string(),
            phone: "+998901234567".to_string(),
        },
    )
    .await?;
    Ok((user, ad_id))
}

#[tokio::test]
async fn test_user_operations() -> Result<()> {
    skip_if_no_db!(test_user_operations_impl)
}

async fn test_user_operations_impl(pool: &PgPool) -> Result<()> {
    let user = get_or_create_user(pool, 12345, Some("alice"), Some("Alice"), "uz").await?;
    assert_eq!(user.telegram_id, 12345);
    assert_eq!(user.language, "uz");
    assert!(!user.is_moderator());

    // Second contact with a changed username refreshes the profile but
    // keeps identity and language
    let user2 = get_or_create_user(pool, 12345, Some("alice_new"), Some("Alice"), "ru").await?;
    assert_eq!(user2.id, user.id);
    assert_eq!(user2.username.as_deref(), Some("alice_new"));
    assert_eq!(user2.language, "uz");

    set_user_language(pool, 12345, "ru").await?;
    let found = get_user_by_telegram_id(pool, 12345).await?.unwrap();
    assert_eq!(found.language, "ru");

    // Conversation state round-trips through the users row
    set_conversation(pool, 12345, "sell_enter_price", r#"{"category_id":3}"#).await?;
    let found = get_user_by_telegram_id(pool, 12345).await?.unwrap();
    assert_eq!(found.state, "sell_enter_price");
    assert_eq!(found.draft.as_deref(), Some(r#"{"category_id":3}"#));

    Ok(())
}

#[tokio::test]
async fn test_reference_data() -> Result<()> {
    skip_if_no_db!(test_reference_data_impl)
}

async fn test_reference_data_impl(pool: &PgPool) -> Result<()> {
    let categories = list_categories(pool).await?;
    assert_eq!(categories.len(), 5);
    assert_eq!(categories[0].name_for("ru"), "Смартфоны");
    assert_eq!(categories[0].name_for("uz"), "Smartfonlar");

    // Seeding twice must not duplicate anything
    seed_reference_data(pool).await?;
    assert_eq!(list_categories(pool).await?.len(), 5);

    let brands = list_brands(pool, categories[0].id).await?;
    assert!(!brands.is_empty());
    // Alphabetical within the category
    let mut sorted = brands.clone();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(brands, sorted);

    let category = get_category(pool, categories[0].id).await?;
    assert_eq!(category, Some(categories[0].clone()));
    assert_eq!(get_category(pool, 999_999).await?, None);

    let brand = get_brand(pool, brands[0].id).await?;
    assert_eq!(brand, Some(brands[0].clone()));

    Ok(())
}

#[tokio::test]
async fn test_advertisement_lifecycle() -> Result<()> {
    skip_if_no_db!(test_advertisement_lifecycle_impl)
}

async fn test_advertisement_lifecycle_impl(pool: &PgPool) -> Result<()> {
    let (user, ad_id) = seed_ad(pool, 100, "Tashkent").await?;
    assert!(ad_id > 0);

    let card = get_ad_card(pool, ad_id).await?.unwrap();
    assert_eq!(card.status, AdStatus::Pending);
    assert_eq!(card.seller_telegram_id, 100);
    assert_eq!(card.category_name_for("ru"), "Смартфоны");

    let pending = list_pending_ads(pool).await?;
    assert_eq!(pending.len(), 1);

    // Guarded transition succeeds from the expected status only
    let updated = update_ad_status(pool, ad_id, AdStatus::Pending, AdStatus::Approved, None).await?;
    assert!(updated);
    let repeated =
        update_ad_status(pool, ad_id, AdStatus::Pending, AdStatus::Approved, None).await?;
    assert!(!repeated);

    let card = get_ad_card(pool, ad_id).await?.unwrap();
    assert_eq!(card.status, AdStatus::Approved);
    assert!(list_pending_ads(pool).await?.is_empty());

    let mine = list_user_ads(pool, user.id).await?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, ad_id);

    // Sold is terminal
    let sold = update_ad_status(pool, ad_id, AdStatus::Approved, AdStatus::Sold, None).await?;
    assert!(sold);
    let undone = update_ad_status(pool, ad_id, AdStatus::Pending, AdStatus::Approved, None).await?;
    assert!(!undone);

    Ok(())
}

#[tokio::test]
async fn test_rejection_stores_reason() -> Result<()> {
    skip_if_no_db!(test_rejection_stores_reason_impl)
}

async fn test_rejection_stores_reason_impl(pool: &PgPool) -> Result<()> {
    let (_, ad_id) = seed_ad(pool, 101, "Bukhara").await?;

    let updated = update_ad_status(
        pool,
        ad_id,
        AdStatus::Pending,
        AdStatus::Rejected,
        Some("blurry photo"),
    )
    .await?;
    assert!(updated);

    let reason: Option<String> =
        sqlx::query_scalar("SELECT rejection_reason FROM advertisements WHERE id = $1")
            .bind(ad_id)
            .fetch_one(pool)
            .await?;
    assert_eq!(reason.as_deref(), Some("blurry photo"));

    Ok(())
}

#[tokio::test]
async fn test_search_filters() -> Result<()> {
    skip_if_no_db!(test_search_filters_impl)
}

async fn test_search_filters_impl(pool: &PgPool) -> Result<()> {
    let (_, ad1) = seed_ad(pool, 200, "Tashkent").await?;
    let (_, ad2) = seed_ad(pool, 201, "Samarkand").await?;
    update_ad_status(pool, ad1, AdStatus::Pending, AdStatus::Approved, None).await?;

    // Default search only sees approved listings
    let all = search_ads(pool, &AdSearchFilters::default()).await?;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, ad1);

    // Pending listings are reachable with an explicit status filter
    let pending = search_ads(
        pool,
        &AdSearchFilters {
            status: Some(AdStatus::Pending),
            ..AdSearchFilters::default()
        },
    )
    .await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, ad2);

    // City filter matches case-insensitive substrings
    let by_city = search_ads(
        pool,
        &AdSearchFilters {
            city: Some("tash".to_string()),
            ..AdSearchFilters::default()
        },
    )
    .await?;
    assert_eq!(by_city.len(), 1);

    let nowhere = search_ads(
        pool,
        &AdSearchFilters {
            city: Some("Nukus".to_string()),
            ..AdSearchFilters::default()
        },
    )
    .await?;
    assert!(nowhere.is_empty());

    // Requests above the cap are clamped rather than rejected
    let capped = search_ads(
        pool,
        &AdSearchFilters {
            limit: Some(10_000),
            ..AdSearchFilters::default()
        },
    )
    .await?;
    assert!(capped.len() as i64 <= SEARCH_LIMIT);

    Ok(())
}

#[tokio::test]
async fn test_favorite_operations() -> Result<()> {
    skip_if_no_db!(test_favorite_operations_impl)
}

async fn test_favorite_operations_impl(pool: &PgPool) -> Result<()> {
    let (seller, ad_id) = seed_ad(pool, 300, "Tashkent").await?;
    update_ad_status(pool, ad_id, AdStatus::Pending, AdStatus::Approved, None).await?;
    let buyer = get_or_create_user(pool, 301, Some("buyer"), Some("Buyer"), "ru").await?;

    assert!(!is_favorite(pool, buyer.id, ad_id).await?);

    add_favorite(pool, buyer.id, ad_id).await?;
    // Idempotent on duplicate saves
    add_favorite(pool, buyer.id, ad_id).await?;
    assert!(is_favorite(pool, buyer.id, ad_id).await?);

    let favorites = list_favorites(pool, buyer.id).await?;
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, ad_id);
    assert!(list_favorites(pool, seller.id).await?.is_empty());

    assert!(remove_favorite(pool, buyer.id, ad_id).await?);
    assert!(!remove_favorite(pool, buyer.id, ad_id).await?);
    assert!(!is_favorite(pool, buyer.id, ad_id).await?);

    Ok(())
}

#[tokio::test]
async fn test_favorites_only_show_approved_ads() -> Result<()> {
    skip_if_no_db!(test_favorites_only_show_approved_ads_impl)
}

async fn test_favorites_only_show_approved_ads_impl(pool: &PgPool) -> Result<()> {
    let (_, ad_id) = seed_ad(pool, 310, "Tashkent").await?;
    let buyer = get_or_create_user(pool, 311, Some("buyer"), Some("Buyer"), "ru").await?;
    add_favorite(pool, buyer.id, ad_id).await?;

    // Pending ads stay out of the view even when favorited
    assert!(list_favorites(pool, buyer.id).await?.is_empty());

    update_ad_status(pool, ad_id, AdStatus::Pending, AdStatus::Approved, None).await?;
    assert_eq!(list_favorites(pool, buyer.id).await?.len(), 1);

    // A later status change hides the listing again; the favorite row stays
    update_ad_status(pool, ad_id, AdStatus::Approved, AdStatus::Sold, None).await?;
    assert!(list_favorites(pool, buyer.id).await?.is_empty());
    assert!(is_favorite(pool, buyer.id, ad_id).await?);

    // Same for a favorited ad that gets rejected in moderation
    let (_, rejected_id) = seed_ad(pool, 312, "Khiva").await?;
    add_favorite(pool, buyer.id, rejected_id).await?;
    update_ad_status(
        pool,
        rejected_id,
        AdStatus::Pending,
        AdStatus::Rejected,
        Some("blurry photo"),
    )
    .await?;
    assert!(list_favorites(pool, buyer.id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_payment_receipt_flow() -> Result<()> {
    skip_if_no_db!(test_payment_receipt_flow_impl)
}

async fn test_payment_receipt_flow_impl(pool: &PgPool) -> Result<()> {
    let (user, ad_id) = seed_ad(pool, 400, "Tashkent").await?;

    let payment_id = create_payment(pool, user.id, 30_000).await?;
    assert!(payment_id > 0);

    let attached = submit_payment_receipt(pool, user.id, ad_id, "uploads/receipt.jpg").await?;
    assert!(attached);

    let (status, receipt): (String, Option<String>) =
        sqlx::query_as("SELECT status, receipt_path FROM payments WHERE id = $1")
            .bind(payment_id)
            .fetch_one(pool)
            .await?;
    assert_eq!(status, "submitted");
    assert_eq!(receipt.as_deref(), Some("uploads/receipt.jpg"));

    // No pending payment left to attach to
    let again = submit_payment_receipt(pool, user.id, ad_id, "uploads/receipt.jpg").await?;
    assert!(!again);

    Ok(())
}
