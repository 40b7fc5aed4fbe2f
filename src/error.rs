//! Unified error types for the lending bot.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the lending bot.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Exchange gateway error.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Strategy-level error.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exchange transport, auth and API errors.
///
/// Every variant is recoverable: the strategy loop logs it, skips the rest
/// of the current cycle and retries on the next tick.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The exchange rejected our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The exchange returned an application-level error.
    #[error("exchange error on {endpoint}: {message}")]
    Api {
        /// Endpoint path that failed.
        endpoint: String,
        /// Error message from the exchange.
        message: String,
    },

    /// Failed to parse a response body.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Cancel request failed for a specific offer.
    #[error("failed to cancel offer {offer_id}: {reason}")]
    CancelFailed {
        /// Offer ID that failed to cancel.
        offer_id: u64,
        /// Reason for failure.
        reason: String,
    },
}

/// Strategy and accounting errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// A proposed order carried a non-positive amount.
    #[error("invalid order amount: {0}")]
    InvalidAmount(Decimal),

    /// A proposed fixed-rate order carried a non-positive rate.
    #[error("invalid order rate: {0}")]
    InvalidRate(Decimal),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
