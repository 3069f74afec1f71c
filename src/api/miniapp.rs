//! Mini-app JSON API. A thin second front door over the same
//! `AdLifecycle` the chat workflow uses; no behavior lives here.

use crate::app::App;
use crate::db::{self, AdCard, AdSearchFilters, AdStatus, SEARCH_LIMIT};
use crate::dialogue::SellDraft;
use crate::errors::AppError;
use crate::localization::detect_language;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

/// Wire form of an advertisement
#[derive(Debug, Serialize)]
pub struct ApiAd {
    pub id: i64,
    pub category_id: i64,
    pub category_name_ru: String,
    pub category_name_uz: String,
    pub brand_id: i64,
    pub brand_name: String,
    pub model: String,
    pub price: i64,
    pub description: String,
    pub city: String,
    pub phone: String,
    pub photo_path: String,
    pub status: String,
    pub seller_username: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AdCard> for ApiAd {
    fn from(card: AdCard) -> Self {
        ApiAd {
            id: card.id,
            category_id: card.category_id,
            category_name_ru: card.category_name_ru,
            category_name_uz: card.category_name_uz,
            brand_id: card.brand_id,
            brand_name: card.brand_name,
            model: card.model,
            price: card.price,
            description: card.description,
            city: card.city,
            phone: card.phone,
            photo_path: card.photo_path,
            status: card.status.as_str().to_string(),
            seller_username: card.seller_username,
            created_at: card.created_at,
        }
    }
}

/// API error envelope; maps the error taxonomy onto HTTP statuses
pub struct ApiError(AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match &self.0 {
            AppError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors.clone()),
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, vec![msg.clone()]),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, vec![msg.clone()]),
            other => {
                warn!(error = %other, "internal error on api request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    vec!["internal error".to_string()],
                )
            }
        };
        (status, Json(json!({ "errors": errors }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<i64>,
    pub brand: Option<i64>,
    pub city: Option<String>,
    pub status: Option<String>,
}

/// GET /api/advertisements
pub async fn list_advertisements(
    State(app): State<App>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ApiAd>>, ApiError> {
    let limit = query.limit.unwrap_or(SEARCH_LIMIT).clamp(1, SEARCH_LIMIT);
    let page = query.page.unwrap_or(1).max(1);

    let status = match query.status.as_deref() {
        None => AdStatus::Approved,
        Some(raw) => AdStatus::parse(raw),
    };
    let filters = AdSearchFilters {
        category_id: query.category,
        brand_id: query.brand,
        city: query.city,
        status: Some(status),
        limit: Some(limit),
        offset: Some((page - 1) * limit),
    };

    let ads = app.lifecycle.search(&filters).await?;
    Ok(Json(ads.into_iter().map(ApiAd::from).collect()))
}

#[derive(Debug, Serialize)]
pub struct ApiCategory {
    pub id: i64,
    pub name_ru: String,
    pub name_uz: String,
}

/// GET /api/categories
pub async fn list_categories(State(app): State<App>) -> Result<Json<Vec<ApiCategory>>, ApiError> {
    let categories = db::list_categories(&app.pool)
        .await
        .map_err(AppError::from)?;
    Ok(Json(
        categories
            .into_iter()
            .map(|c| ApiCategory {
                id: c.id,
                name_ru: c.name_ru,
                name_uz: c.name_uz,
            })
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct BrandQuery {
    pub category_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiBrand {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

/// GET /api/brands?category_id=
pub async fn list_brands(
    State(app): State<App>,
    Query(query): Query<BrandQuery>,
) -> Result<Json<Vec<ApiBrand>>, ApiError> {
    let brands = db::list_brands(&app.pool, query.category_id)
        .await
        .map_err(AppError::from)?;
    Ok(Json(
        brands
            .into_iter()
            .map(|b| ApiBrand {
                id: b.id,
                category_id: b.category_id,
                name: b.name,
            })
            .collect(),
    ))
}

/// POST /api/advertisements — multipart form with a photo part
pub async fn create_advertisement(
    State(app): State<App>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let mut telegram_id: Option<i64> = None;
    let mut draft = SellDraft::default();
    let mut photo_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photo" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("unreadable photo part: {}", e)))?;
                photo_bytes = Some(bytes.to_vec());
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("unreadable field: {}", e)))?;
                match name.as_str() {
                    "telegram_id" => telegram_id = value.parse().ok(),
                    "category_id" => draft.category_id = value.parse().ok(),
                    "brand_id" => draft.brand_id = value.parse().ok(),
                    "model" => draft.model = Some(value),
                    "price" => draft.price = value.parse().ok(),
                    "description" => draft.description = Some(value),
                    "city" => draft.city = Some(value),
                    "phone" => draft.phone = Some(value),
                    other => warn!(field = %other, "ignoring unknown form field"),
                }
            }
        }
    }

    let telegram_id =
        telegram_id.ok_or_else(|| AppError::validation("telegram_id is required"))?;
    let user = db::get_or_create_user(
        &app.pool,
        telegram_id,
        None,
        None,
        &detect_language(None),
    )
    .await
    .map_err(AppError::from)?;

    if let Some(bytes) = photo_bytes {
        draft.photo_path = Some(app.lifecycle.save_photo(&bytes, "jpg").await?);
    }

    let ad_id = app.lifecycle.create(user.id, &draft).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": ad_id }))))
}

#[derive(Debug, Deserialize)]
pub struct MarkSoldRequest {
    pub telegram_id: i64,
}

/// POST /api/advertisements/{id}/sold
pub async fn mark_sold(
    State(app): State<App>,
    Path(ad_id): Path<i64>,
    Json(request): Json<MarkSoldRequest>,
) -> Result<Json<ApiAd>, ApiError> {
    let user = db::get_user_by_telegram_id(&app.pool, request.telegram_id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", request.telegram_id)))?;

    let card = app.lifecycle.mark_sold(ad_id, user.id).await?;
    Ok(Json(ApiAd::from(card)))
}
