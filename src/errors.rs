//! # Application Error Types
//!
//! Common error types used throughout the bot. The variants mirror how
//! failures are surfaced to users: validation problems are correctable and
//! keep the conversation state, authorization problems render a generic
//! denial, transport problems are retried by the user, and persistence
//! problems abort the current update so Telegram can redeliver it.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// User-correctable input errors; all violated rules are accumulated
    Validation(Vec<String>),
    /// Caller lacks the required role or does not own the record
    Authorization(String),
    /// Network/transport failure on a Telegram call or file download
    Network(String),
    /// Transport failure that was specifically a timeout (large media)
    Timeout(String),
    /// Database operation errors
    Database(String),
    /// Referenced advertisement/user/payment does not exist
    NotFound(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(errors) => write!(f, "[VALIDATION] {}", errors.join(", ")),
            AppError::Authorization(msg) => write!(f, "[AUTHORIZATION] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Timeout(msg) => write!(f, "[TIMEOUT] {}", msg),
            AppError::Database(msg) => write!(f, "[DATABASE] {}", msg),
            AppError::NotFound(msg) => write!(f, "[NOT_FOUND] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Single-message validation error helper
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        match &err {
            teloxide::RequestError::Network(e) if e.is_timeout() => {
                AppError::Timeout(err.to_string())
            }
            _ => AppError::Network(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_joins_messages() {
        let err = AppError::Validation(vec!["price".to_string(), "city".to_string()]);
        assert_eq!(err.to_string(), "[VALIDATION] price, city");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
