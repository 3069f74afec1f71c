//! Keyboard builders for every menu the bot renders. Callback data uses
//! colon-separated tokens (`category:3`, `favorite:add:7`) parsed by the
//! dispatcher and the workflow engine.

use crate::db::{AdCard, AdStatus, Brand, Category};
use crate::localization::LocalizationManager;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

/// Main menu: sell/buy plus the account and settings rows
pub fn main_menu(localization: &LocalizationManager, language: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback(localization.t("sell-button", language), "sell"),
            InlineKeyboardButton::callback(localization.t("buy-button", language), "buy"),
        ],
        vec![
            InlineKeyboardButton::callback(localization.t("my-ads-button", language), "my_ads"),
            InlineKeyboardButton::callback(
                localization.t("my-favorites-button", language),
                "my_favorites",
            ),
        ],
        vec![
            InlineKeyboardButton::callback(
                localization.t("language-button", language),
                "language",
            ),
            InlineKeyboardButton::callback(localization.t("help-button", language), "help"),
        ],
    ])
}

pub fn back_home(localization: &LocalizationManager, language: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(localization.t("back-button", language), "back"),
        InlineKeyboardButton::callback(localization.t("home-button", language), "home"),
    ]])
}

/// One category per row, back/home at the bottom
pub fn categories(
    categories: &[Category],
    localization: &LocalizationManager,
    language: &str,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .map(|c| {
            vec![InlineKeyboardButton::callback(
                c.name_for(language).to_string(),
                format!("category:{}", c.id),
            )]
        })
        .collect();
    rows.push(vec![
        InlineKeyboardButton::callback(localization.t("back-button", language), "back"),
        InlineKeyboardButton::callback(localization.t("home-button", language), "home"),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Brands two per row, back/home at the bottom
pub fn brands(
    brands: &[Brand],
    localization: &LocalizationManager,
    language: &str,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = brands
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|b| {
                    InlineKeyboardButton::callback(b.name.clone(), format!("brand:{}", b.id))
                })
                .collect()
        })
        .collect();
    rows.push(vec![
        InlineKeyboardButton::callback(localization.t("back-button", language), "back"),
        InlineKeyboardButton::callback(localization.t("home-button", language), "home"),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Reply keyboard offering the share-contact shortcut
pub fn share_contact(localization: &LocalizationManager, language: &str) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(localization.t("share-contact", language))
            .request(ButtonRequest::Contact),
    ]])
    .resize_keyboard()
    .one_time_keyboard()
}

pub fn payment_confirm(
    localization: &LocalizationManager,
    language: &str,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            localization.t("payment-confirmed-button", language),
            "payment_confirmed",
        )],
        vec![InlineKeyboardButton::callback(
            localization.t("home-button", language),
            "home",
        )],
    ])
}

pub fn languages() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🇷🇺 Русский", "lang:ru"),
        InlineKeyboardButton::callback("🇺🇿 O'zbekcha", "lang:uz"),
    ]])
}

/// Actions under a search-result card
pub fn ad_actions(
    ad_id: i64,
    is_favorite: bool,
    localization: &LocalizationManager,
    language: &str,
) -> InlineKeyboardMarkup {
    let favorite = if is_favorite {
        InlineKeyboardButton::callback(
            localization.t("remove-favorite-button", language),
            format!("favorite:rm:{}", ad_id),
        )
    } else {
        InlineKeyboardButton::callback(
            localization.t("add-favorite-button", language),
            format!("favorite:add:{}", ad_id),
        )
    };
    InlineKeyboardMarkup::new(vec![
        vec![favorite],
        vec![InlineKeyboardButton::callback(
            localization.t("home-button", language),
            "home",
        )],
    ])
}

/// Navigation under a single "my advertisements" card
pub fn my_ads_card(
    ad: &AdCard,
    page: usize,
    total: usize,
    localization: &LocalizationManager,
    language: &str,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if ad.status == AdStatus::Approved {
        rows.push(vec![InlineKeyboardButton::callback(
            localization.t("mark-sold-button", language),
            format!("sold:{}", ad.id),
        )]);
    }
    if total > 1 {
        let prev = page.checked_sub(1).unwrap_or(total - 1);
        let next = if page + 1 >= total { 0 } else { page + 1 };
        rows.push(vec![
            InlineKeyboardButton::callback(
                localization.t("prev-page", language),
                format!("my_ads:page:{}", prev),
            ),
            InlineKeyboardButton::callback(format!("{}/{}", page + 1, total), "noop"),
            InlineKeyboardButton::callback(
                localization.t("next-page", language),
                format!("my_ads:page:{}", next),
            ),
        ]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        localization.t("home-button", language),
        "home",
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Approve/reject controls shown to moderators
pub fn moderation(
    ad_id: i64,
    localization: &LocalizationManager,
    language: &str,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            localization.t("approve-button", language),
            format!("approve:{}", ad_id),
        ),
        InlineKeyboardButton::callback(
            localization.t("reject-button", language),
            format!("reject:{}", ad_id),
        ),
    ]])
}
