//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Bitfinex Credentials ===
    /// API key for authenticated endpoints.
    #[serde(default)]
    pub bitfinex_api_key: String,

    /// API secret used to sign request payloads.
    #[serde(default)]
    pub bitfinex_api_secret: String,

    /// REST base URL.
    #[serde(default = "default_api_url")]
    pub bitfinex_api_url: String,

    // === Strategy Parameters ===
    /// Funding currency to lend.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Minimum inactive funds required before an offer is placed.
    #[serde(default = "default_min_inactive_funds")]
    pub min_inactive_funds: Decimal,

    /// Seconds between decision cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Lend-book depth requested per side.
    #[serde(default = "default_book_depth")]
    pub book_depth: u32,

    // === Operation Modes ===
    /// Simulation mode (no real orders).
    #[serde(default = "default_true")]
    pub dry_run: bool,

    // === Server Configuration ===
    /// HTTP server port for health/metrics endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_api_url() -> String {
    "https://api.bitfinex.com".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_min_inactive_funds() -> Decimal {
    Decimal::new(50, 0) // $50
}

fn default_poll_interval() -> u64 {
    20
}

fn default_book_depth() -> u32 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.dry_run {
            if self.bitfinex_api_key.is_empty() {
                return Err("BITFINEX_API_KEY is required for live trading".to_string());
            }
            if self.bitfinex_api_secret.is_empty() {
                return Err("BITFINEX_API_SECRET is required for live trading".to_string());
            }
        }

        if self.currency.is_empty() {
            return Err("CURRENCY must not be empty".to_string());
        }

        if self.min_inactive_funds <= Decimal::ZERO {
            return Err("MIN_INACTIVE_FUNDS must be positive".to_string());
        }

        if self.poll_interval_secs == 0 {
            return Err("POLL_INTERVAL_SECS must be at least 1".to_string());
        }

        if self.book_depth == 0 {
            return Err("BOOK_DEPTH must be at least 1".to_string());
        }

        Ok(())
    }

    /// Get the funding currency in uppercase.
    pub fn currency_upper(&self) -> String {
        self.currency.to_uppercase()
    }
}
