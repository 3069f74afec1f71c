//! Telegram webhook endpoint. The contract with the delivering platform
//! is: 400 only for a malformed envelope, otherwise 200 no matter what
//! happened inside, so Telegram never retries a delivery we already
//! consumed.

use crate::app::App;
use crate::bot;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::json;
use teloxide::types::Update;
use tracing::{debug, error};

pub async fn telegram_webhook(State(app): State<App>, body: Bytes) -> impl IntoResponse {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "rejecting malformed webhook body");
            return (StatusCode::BAD_REQUEST, Json(json!({"status": "bad request"})));
        }
    };

    let update: Update = match serde_json::from_value(value) {
        Ok(update) => update,
        Err(e) => {
            debug!(error = %e, "rejecting unparseable update envelope");
            return (StatusCode::BAD_REQUEST, Json(json!({"status": "bad request"})));
        }
    };

    match bot::process_update(&app, update).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))),
        Err(e) => {
            // Acknowledged anyway; the failure is ours to log, not Telegram's
            error!(error = %e, "update processing failed");
            (StatusCode::OK, Json(json!({"status": "error"})))
        }
    }
}
