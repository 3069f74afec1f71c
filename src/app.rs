//! Shared application state wired once at startup and handed to both the
//! bot dispatcher and the HTTP router.

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::lifecycle::AdLifecycle;
use crate::localization::LocalizationManager;
use sqlx::postgres::PgPool;
use std::sync::Arc;
use std::time::Duration;
use teloxide::Bot;

/// Everything a handler needs, cloned cheaply behind `Arc`s
#[derive(Clone)]
pub struct App {
    pub bot: Bot,
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub localization: Arc<LocalizationManager>,
    pub lifecycle: AdLifecycle,
    /// Long-timeout client for photo downloads; interactive Telegram calls
    /// go through the bot's own short-timeout client
    pub media_client: reqwest::Client,
}

impl App {
    pub fn new(config: AppConfig, pool: PgPool) -> AppResult<Self> {
        let localization = Arc::new(
            LocalizationManager::new()
                .map_err(|e| AppError::Config(format!("failed to load locales: {}", e)))?,
        );

        let interactive_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {}", e)))?;
        let media_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build media client: {}", e)))?;

        let bot = Bot::with_client(config.bot.token.clone(), interactive_client);
        let lifecycle = AdLifecycle::new(
            pool.clone(),
            config.media.upload_dir.clone(),
            config.media.max_file_size,
        );

        Ok(Self {
            bot,
            pool,
            config: Arc::new(config),
            localization,
            lifecycle,
            media_client,
        })
    }
}
