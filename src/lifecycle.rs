//! # Advertisement Lifecycle
//!
//! Validation, creation, moderation transitions and search for
//! advertisements. This is the single implementation behind both the chat
//! workflow and the mini-app HTTP surface. Status transitions are monotone:
//! `pending -> approved | rejected`, `approved -> sold`; `rejected` and
//! `sold` are terminal.

use crate::db::{self, AdCard, AdSearchFilters, AdStatus, NewAdvertisement, User};
use crate::dialogue::SellDraft;
use crate::errors::{AppError, AppResult};
use crate::localization::LocalizationManager;
use sqlx::postgres::PgPool;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

pub const MODEL_MIN: usize = 2;
pub const MODEL_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 1000;
pub const CITY_MIN: usize = 2;
pub const PHONE_MIN: usize = 9;
pub const PHONE_MAX: usize = 20;
pub const PRICE_MAX: i64 = 999_999_999;

/// Service owning all advertisement state changes
#[derive(Clone)]
pub struct AdLifecycle {
    pool: PgPool,
    upload_dir: String,
    max_file_size: u64,
}

impl AdLifecycle {
    pub fn new(pool: PgPool, upload_dir: String, max_file_size: u64) -> Self {
        Self {
            pool,
            upload_dir,
            max_file_size,
        }
    }

    /// Check a finished draft against every domain rule
    pub fn validate(&self, user_id: i64, draft: &SellDraft) -> AppResult<NewAdvertisement> {
        validate_draft(user_id, draft)
    }

    /// Validate and persist a draft as a pending advertisement
    pub async fn create(&self, user_id: i64, draft: &SellDraft) -> AppResult<i64> {
        let ad = self.validate(user_id, draft)?;
        let ad_id = db::create_advertisement(&self.pool, &ad).await?;
        Ok(ad_id)
    }

    /// Approve a pending advertisement; moderator-only
    pub async fn approve(&self, moderator: &User, ad_id: i64) -> AppResult<AdCard> {
        self.moderate(moderator, ad_id, AdStatus::Approved, None)
            .await
    }

    /// Reject a pending advertisement with a reason; moderator-only
    pub async fn reject(&self, moderator: &User, ad_id: i64, reason: &str) -> AppResult<AdCard> {
        self.moderate(moderator, ad_id, AdStatus::Rejected, Some(reason))
            .await
    }

    async fn moderate(
        &self,
        moderator: &User,
        ad_id: i64,
        next: AdStatus,
        reason: Option<&str>,
    ) -> AppResult<AdCard> {
        if !moderator.is_moderator() {
            return Err(AppError::Authorization(
                "moderator role required".to_string(),
            ));
        }

        let updated =
            db::update_ad_status(&self.pool, ad_id, AdStatus::Pending, next, reason).await?;
        if !updated {
            return match db::get_ad_card(&self.pool, ad_id).await? {
                Some(card) => Err(AppError::validation(format!(
                    "advertisement {} is {}, not pending",
                    ad_id,
                    card.status.as_str()
                ))),
                None => Err(AppError::NotFound(format!(
                    "advertisement {} not found",
                    ad_id
                ))),
            };
        }

        info!(ad_id = %ad_id, status = %next.as_str(), moderator = %moderator.id, "Advertisement moderated");
        db::get_ad_card(&self.pool, ad_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("advertisement {} not found", ad_id)))
    }

    /// Mark an approved advertisement as sold; owner-only
    pub async fn mark_sold(&self, ad_id: i64, requesting_user_id: i64) -> AppResult<AdCard> {
        let card = db::get_ad_card(&self.pool, ad_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("advertisement {} not found", ad_id)))?;

        if card.user_id != requesting_user_id {
            return Err(AppError::Authorization(
                "only the owner can mark an advertisement as sold".to_string(),
            ));
        }
        if card.status != AdStatus::Approved {
            return Err(AppError::validation(format!(
                "advertisement {} is {}, only approved advertisements can be sold",
                ad_id,
                card.status.as_str()
            )));
        }

        let updated =
            db::update_ad_status(&self.pool, ad_id, AdStatus::Approved, AdStatus::Sold, None)
                .await?;
        if !updated {
            // Raced with another status change since the read above
            return Err(AppError::validation(format!(
                "advertisement {} changed status concurrently",
                ad_id
            )));
        }

        db::get_ad_card(&self.pool, ad_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("advertisement {} not found", ad_id)))
    }

    /// Search listings; defaults to approved, newest first, capped
    pub async fn search(&self, filters: &AdSearchFilters) -> AppResult<Vec<AdCard>> {
        Ok(db::search_ads(&self.pool, filters).await?)
    }

    pub async fn get(&self, ad_id: i64) -> AppResult<AdCard> {
        db::get_ad_card(&self.pool, ad_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("advertisement {} not found", ad_id)))
    }

    pub async fn list_for_user(&self, user_id: i64) -> AppResult<Vec<AdCard>> {
        Ok(db::list_user_ads(&self.pool, user_id).await?)
    }

    pub async fn list_pending(&self) -> AppResult<Vec<AdCard>> {
        Ok(db::list_pending_ads(&self.pool).await?)
    }

    /// Store an uploaded photo under a collision-free name and return its
    /// path for the draft
    pub async fn save_photo(&self, data: &[u8], extension: &str) -> AppResult<String> {
        if data.len() as u64 > self.max_file_size {
            return Err(AppError::validation(format!(
                "file exceeds the {} byte limit",
                self.max_file_size
            )));
        }

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create upload dir: {}", e)))?;

        let filename = format!("{}.{}", Uuid::new_v4(), extension);
        let path = format!("{}/{}", self.upload_dir, filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Internal(format!("failed to save photo: {}", e)))?;

        Ok(path)
    }
}

/// Draft validation shared by the chat workflow and the HTTP surface.
/// Accumulates every violated rule rather than stopping at the first.
pub fn validate_draft(user_id: i64, draft: &SellDraft) -> AppResult<NewAdvertisement> {
    let mut errors = Vec::new();

    let category_id = draft.category_id;
    if category_id.is_none() {
        errors.push("category is required".to_string());
    }
    let brand_id = draft.brand_id;
    if brand_id.is_none() {
        errors.push("brand is required".to_string());
    }

    let model = draft.model.as_deref().map(str::trim).unwrap_or("");
    if model.is_empty() {
        errors.push("model is required".to_string());
    } else if model.chars().count() < MODEL_MIN || model.chars().count() > MODEL_MAX {
        errors.push(format!(
            "model must be {}-{} characters",
            MODEL_MIN, MODEL_MAX
        ));
    }

    match draft.price {
        None => errors.push("price is required".to_string()),
        Some(price) if price <= 0 || price > PRICE_MAX => {
            errors.push(format!("price must be between 1 and {}", PRICE_MAX));
        }
        Some(_) => {}
    }

    let description = draft.description.as_deref().map(str::trim).unwrap_or("");
    if description.is_empty() {
        errors.push("description is required".to_string());
    } else if description.chars().count() < DESCRIPTION_MIN
        || description.chars().count() > DESCRIPTION_MAX
    {
        errors.push(format!(
            "description must be {}-{} characters",
            DESCRIPTION_MIN, DESCRIPTION_MAX
        ));
    }

    let city = draft.city.as_deref().map(str::trim).unwrap_or("");
    if city.chars().count() < CITY_MIN {
        errors.push(format!("city must be at least {} characters", CITY_MIN));
    }

    let phone = draft.phone.as_deref().map(str::trim).unwrap_or("");
    if phone.is_empty() {
        errors.push("phone is required".to_string());
    } else if phone.chars().count() < PHONE_MIN || phone.chars().count() > PHONE_MAX {
        errors.push(format!(
            "phone must be {}-{} characters",
            PHONE_MIN, PHONE_MAX
        ));
    }

    let photo_path = draft.photo_path.as_deref().unwrap_or("");
    if photo_path.is_empty() {
        errors.push("photo is required".to_string());
    } else if !Path::new(photo_path).exists() {
        errors.push("photo file is missing".to_string());
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(NewAdvertisement {
        user_id,
        category_id: category_id.unwrap_or_default(),
        brand_id: brand_id.unwrap_or_default(),
        model: model.to_string(),
        price: draft.price.unwrap_or_default(),
        description: description.to_string(),
        city: city.to_string(),
        photo_path: photo_path.to_string(),
        phone: phone.to_string(),
    })
}

/// Group a price with spaces as thousands separators, e.g. `12 000 000`
pub fn format_price(price: i64) -> String {
    let digits = price.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    if price < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Render a localized advertisement card. Missing seller username falls
/// back to a placeholder rather than failing the render.
pub fn format_advertisement(
    card: &AdCard,
    language: &str,
    localization: &LocalizationManager,
) -> String {
    let seller = card
        .seller_username
        .as_deref()
        .map(|u| format!("@{}", u))
        .unwrap_or_else(|| "N/A".to_string());

    let status_key = match card.status {
        AdStatus::Pending => "status-pending",
        AdStatus::Approved => "status-approved",
        AdStatus::Rejected => "status-rejected",
        AdStatus::Sold => "status-sold",
    };
    let status = localization.t(status_key, language);

    localization.t_args(
        "ad-card",
        language,
        &[
            ("category", card.category_name_for(language).to_string()),
            ("brand", card.brand_name.clone()),
            ("model", card.model.clone()),
            ("price", format_price(card.price)),
            ("description", card.description.clone()),
            ("city", card.city.clone()),
            ("phone", card.phone.clone()),
            ("seller", seller),
            ("status", status),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_groups_thousands() {
        assert_eq!(format_price(12_000_000), "12 000 000");
        assert_eq!(format_price(999), "999");
        assert_eq!(format_price(1_000), "1 000");
        assert_eq!(format_price(30_000), "30 000");
    }

    #[test]
    fn test_validate_empty_draft_reports_every_missing_field() {
        let err = validate_draft(1, &SellDraft::default()).unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.len() >= 7),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        let draft = SellDraft {
            category_id: Some(1),
            brand_id: Some(1),
            model: Some("x".to_string()),
            price: Some(PRICE_MAX + 1),
            description: Some("too short".to_string()),
            city: Some("T".to_string()),
            phone: Some("123".to_string()),
            photo_path: Some("/nonexistent/photo.jpg".to_string()),
            ..SellDraft::default()
        };
        let err = validate_draft(1, &draft).unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("model")));
                assert!(errors.iter().any(|e| e.contains("price")));
                assert!(errors.iter().any(|e| e.contains("description")));
                assert!(errors.iter().any(|e| e.contains("city")));
                assert!(errors.iter().any(|e| e.contains("phone")));
                assert!(errors.iter().any(|e| e.contains("photo")));
            }
            other => panic!("expected validation error, got {other}"),
        }
    }
}
