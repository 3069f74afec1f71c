use anyhow::Result;
use chrono::Utc;
use telebazaar::db::{AdCard, AdStatus};
use telebazaar::lifecycle::{format_advertisement, format_price};
use telebazaar::localization::{detect_language, LocalizationManager};

/// Every message key the bot renders. Both catalogs must resolve all of
/// them; a gap here would surface to users as "Missing translation: ...".
const MESSAGE_KEYS: &[&str] = &[
    "welcome",
    "main-menu",
    "sell-button",
    "buy-button",
    "my-ads-button",
    "my-favorites-button",
    "language-button",
    "help-button",
    "select-category-sell",
    "select-category-buy",
    "select-brand",
    "select-language",
    "enter-model",
    "enter-price",
    "enter-description",
    "enter-city",
    "send-photo",
    "photo-reminder",
    "send-phone",
    "send-receipt",
    "back-button",
    "home-button",
    "share-contact",
    "payment-confirmed-button",
    "prev-page",
    "next-page",
    "phone-received",
    "payment-instructions",
    "ad-created-success",
    "language-changed",
    "found-ads",
    "no-ads-found",
    "no-categories",
    "no-brands",
    "invalid-price",
    "description-too-short",
    "city-too-short",
    "photo-upload-error",
    "photo-upload-timeout",
    "ad-creation-error",
    "ad-card",
    "status-pending",
    "status-approved",
    "status-rejected",
    "status-sold",
    "favorite-added",
    "favorite-removed",
    "add-favorite-button",
    "remove-favorite-button",
    "mark-sold-button",
    "marked-sold",
    "pending-ads-title",
    "no-pending-ads",
    "approve-button",
    "reject-button",
    "moderation-new-ad",
    "ad-approved-notice",
    "ad-rejected-notice",
    "moderation-done",
    "access-denied",
    "help-message",
    "unknown-command",
    "not-found",
    "generic-error",
];

#[test]
fn every_key_resolves_in_both_locales() -> Result<()> {
    let manager = LocalizationManager::new()?;

    for language in ["ru", "uz"] {
        for key in MESSAGE_KEYS {
            let message = manager.t(key, language);
            assert!(
                !message.starts_with("Missing"),
                "{language} catalog is missing {key}"
            );
            assert!(!message.is_empty(), "{language}/{key} rendered empty");
        }
    }

    Ok(())
}

#[test]
fn locales_actually_differ() -> Result<()> {
    let manager = LocalizationManager::new()?;
    assert_ne!(manager.t("welcome", "ru"), manager.t("welcome", "uz"));
    assert_ne!(manager.t("sell-button", "ru"), manager.t("sell-button", "uz"));
    Ok(())
}

#[test]
fn unsupported_language_falls_back_to_russian() -> Result<()> {
    let manager = LocalizationManager::new()?;
    assert_eq!(manager.t("welcome", "en"), manager.t("welcome", "ru"));
    assert!(manager.is_language_supported("uz"));
    assert!(!manager.is_language_supported("en"));
    Ok(())
}

#[test]
fn missing_key_renders_a_sentinel_not_a_panic() -> Result<()> {
    let manager = LocalizationManager::new()?;
    assert_eq!(
        manager.t("no-such-key", "ru"),
        "Missing translation: no-such-key"
    );
    Ok(())
}

#[test]
fn payment_instructions_substitute_price_and_card() -> Result<()> {
    let manager = LocalizationManager::new()?;
    let message = manager.t_args(
        "payment-instructions",
        "ru",
        &[
            ("price", format_price(30_000)),
            ("card", "8600 1234 5678 9012".to_string()),
        ],
    );
    assert!(message.contains("30 000"), "price not substituted: {message}");
    assert!(
        message.contains("8600 1234 5678 9012"),
        "card not substituted: {message}"
    );
    // Bidi isolation marks are stripped before the text reaches Telegram
    assert!(!message.contains('\u{2068}'));
    assert!(!message.contains('\u{2069}'));
    Ok(())
}

#[test]
fn found_ads_substitutes_the_count() -> Result<()> {
    let manager = LocalizationManager::new()?;
    let message = manager.t_args("found-ads", "uz", &[("count", "7".to_string())]);
    assert!(message.contains('7'), "count not substituted: {message}");
    Ok(())
}

#[test]
fn ad_card_renders_in_the_requested_language() -> Result<()> {
    let manager = LocalizationManager::new()?;
    let card = AdCard {
        id: 1,
        user_id: 1,
        category_id: 1,
        brand_id: 1,
        model: "iPhone 13".to_string(),
        price: 12_000_000,
        description: "Almost new, bought last year".to_string(),
        city: "Tashkent".to_string(),
        photo_path: "uploads/photo.jpg".to_string(),
        phone: "+998901234567".to_string(),
        status: AdStatus::Approved,
        created_at: Utc::now(),
        category_name_ru: "Смартфоны".to_string(),
        category_name_uz: "Smartfonlar".to_string(),
        brand_name: "Apple".to_string(),
        seller_username: Some("alice".to_string()),
        seller_telegram_id: 100,
    };

    let ru = format_advertisement(&card, "ru", &manager);
    assert!(ru.contains("Смартфоны"));
    assert!(ru.contains("iPhone 13"));
    assert!(ru.contains("12 000 000"));
    assert!(ru.contains("@alice"));

    let uz = format_advertisement(&card, "uz", &manager);
    assert!(uz.contains("Smartfonlar"));
    assert_ne!(ru, uz);

    // Anonymous sellers get a placeholder instead of a broken mention
    let anonymous = AdCard {
        seller_username: None,
        ..card
    };
    let rendered = format_advertisement(&anonymous, "ru", &manager);
    assert!(rendered.contains("N/A"));
    Ok(())
}

#[test]
fn detect_language_normalizes_telegram_codes() {
    assert_eq!(detect_language(Some("uz-UZ")), "uz");
    assert_eq!(detect_language(Some("ru-RU")), "ru");
    assert_eq!(detect_language(Some("en-US")), "ru");
    assert_eq!(detect_language(None), "ru");
}
