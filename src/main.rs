use anyhow::Result;
use sqlx::postgres::PgPool;
use telebazaar::api;
use telebazaar::app::App;
use telebazaar::config::AppConfig;
use telebazaar::db;
use teloxide::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Fail fast on a bad deployment
    let config = AppConfig::from_env().map_err(|e| anyhow::anyhow!("{}", e))?;
    info!("Configuration loaded and validated");

    let pool = PgPool::connect(&config.database.url).await?;
    db::init_database_schema(&pool).await?;
    db::seed_reference_data(&pool).await?;

    let app = App::new(config, pool).map_err(|e| anyhow::anyhow!("{}", e))?;

    // Register the webhook when a public URL is configured; without one the
    // process still serves the mini-app API and expects the webhook to be
    // routed in by other means (e.g. a tunnel in development)
    if let Some(base) = &app.config.bot.webhook_url {
        let url = reqwest::Url::parse(&format!("{}/webhook", base.trim_end_matches('/')))?;
        app.bot.set_webhook(url).await?;
        info!("Webhook registered");
    }

    info!("Starting marketplace bot");
    api::serve(app).await.map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(())
}
