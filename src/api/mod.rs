//! HTTP layer: the Telegram webhook plus the mini-app JSON API, served
//! from one listener.

pub mod miniapp;
pub mod webhook;

use crate::app::App;
use crate::errors::{AppError, AppResult};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

pub fn router(app: App) -> Router {
    Router::new()
        .route("/webhook", post(webhook::telegram_webhook))
        .route(
            "/api/advertisements",
            get(miniapp::list_advertisements).post(miniapp::create_advertisement),
        )
        .route("/api/advertisements/{id}/sold", post(miniapp::mark_sold))
        .route("/api/categories", get(miniapp::list_categories))
        .route("/api/brands", get(miniapp::list_brands))
        .with_state(app)
}

/// Bind the configured address and serve until shutdown
pub async fn serve(app: App) -> AppResult<()> {
    let addr = format!("{}:{}", app.config.server.host, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("failed to bind {}: {}", addr, e)))?;
    info!(addr = %addr, "http server listening");

    let router = router(app);
    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Internal(format!("http server failed: {}", e)))?;
    Ok(())
}
