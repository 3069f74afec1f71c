//! # Configuration
//!
//! Environment-backed configuration, grouped by concern. Every group is
//! loaded with `from_env` and checked with `validate`; `AppConfig::from_env`
//! runs all validations so startup fails fast on a bad deployment.

use crate::errors::{AppError, AppResult};
use std::env;

/// Telegram bot credentials and webhook registration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Public HTTPS base the webhook is registered under; long polling when unset
    pub webhook_url: Option<String>,
    /// Chat receiving moderation notifications, if configured
    pub moderator_group_id: Option<i64>,
}

impl BotConfig {
    pub fn from_env() -> AppResult<Self> {
        let token = env::var("BOT_TOKEN")
            .map_err(|_| AppError::Config("BOT_TOKEN must be set".to_string()))?;
        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty());
        let moderator_group_id = match env::var("MODERATOR_GROUP_ID") {
            Ok(raw) => Some(raw.parse::<i64>().map_err(|_| {
                AppError::Config("MODERATOR_GROUP_ID must be an integer chat id".to_string())
            })?),
            Err(_) => None,
        };
        Ok(Self {
            token,
            webhook_url,
            moderator_group_id,
        })
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("BOT_TOKEN cannot be empty".to_string()));
        }
        if let Some(url) = &self.webhook_url {
            if !url.starts_with("https://") {
                return Err(AppError::Config(
                    "WEBHOOK_URL must be an https:// URL".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    pub fn from_env() -> AppResult<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL must be set".to_string()))?;
        Ok(Self { url })
    }

    pub fn validate(&self) -> AppResult<()> {
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(AppError::Config(
                "DATABASE_URL must be a postgres:// URL".to_string(),
            ));
        }
        Ok(())
    }
}

/// Paid-placement settings: the flat listing fee and the card users pay to
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub ad_price: i64,
    pub payment_card: String,
}

impl PaymentConfig {
    pub fn from_env() -> AppResult<Self> {
        let ad_price = match env::var("AD_PRICE") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::Config("AD_PRICE must be an integer".to_string()))?,
            Err(_) => 30_000,
        };
        let payment_card =
            env::var("PAYMENT_CARD").unwrap_or_else(|_| "0000 0000 0000 0000".to_string());
        Ok(Self {
            ad_price,
            payment_card,
        })
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.ad_price <= 0 {
            return Err(AppError::Config("AD_PRICE must be positive".to_string()));
        }
        Ok(())
    }
}

/// Local photo storage settings
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub upload_dir: String,
    pub max_file_size: u64,
}

impl MediaConfig {
    pub fn from_env() -> AppResult<Self> {
        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let max_file_size = match env::var("MAX_FILE_SIZE") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| AppError::Config("MAX_FILE_SIZE must be an integer".to_string()))?,
            Err(_) => 10 * 1024 * 1024,
        };
        Ok(Self {
            upload_dir,
            max_file_size,
        })
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.upload_dir.trim().is_empty() {
            return Err(AppError::Config("UPLOAD_DIR cannot be empty".to_string()));
        }
        if self.max_file_size == 0 {
            return Err(AppError::Config(
                "MAX_FILE_SIZE must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings for the webhook and mini-app API
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> AppResult<Self> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?,
            Err(_) => 8080,
        };
        Ok(Self { host, port })
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("HOST cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub payment: PaymentConfig,
    pub media: MediaConfig,
    pub server: ServerConfig,
    /// Fallback UI language when the user has not picked one
    pub default_language: String,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            bot: BotConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
            media: MediaConfig::from_env()?,
            server: ServerConfig::from_env()?,
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "ru".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.media.validate()?;
        self.server.validate()?;
        if self.default_language != "ru" && self.default_language != "uz" {
            return Err(AppError::Config(
                "DEFAULT_LANGUAGE must be one of: ru, uz".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_defaults_are_valid() {
        let payment = PaymentConfig {
            ad_price: 30_000,
            payment_card: "8600 0000 0000 0000".to_string(),
        };
        assert!(payment.validate().is_ok());
    }

    #[test]
    fn test_non_positive_ad_price_rejected() {
        let payment = PaymentConfig {
            ad_price: 0,
            payment_card: String::new(),
        };
        assert!(payment.validate().is_err());
    }

    #[test]
    fn test_webhook_url_must_be_https() {
        let bot = BotConfig {
            token: "123:abc".to_string(),
            webhook_url: Some("http://example.com".to_string()),
            moderator_group_id: None,
        };
        assert!(bot.validate().is_err());
    }

    #[test]
    fn test_database_url_scheme_checked() {
        let db = DatabaseConfig {
            url: "mysql://localhost/ads".to_string(),
        };
        assert!(db.validate().is_err());
    }
}
