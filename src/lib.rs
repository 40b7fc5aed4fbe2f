//! Autonomous margin-lending bot for the Bitfinex USD funding market.
//!
//! Every cycle the bot snapshots the lending order book, its own resting
//! offers, active credits and balances, then keeps or replaces its single
//! outstanding lending offer so idle funds stay competitively priced:
//!
//! ```text
//! demand at FRR?            -> float the whole stack at FRR
//! best competitive ask FRR? -> join it (float at FRR)
//! otherwise                 -> join the best fixed rate outside the
//!                              best bid, retreating to the second-best
//!                              tier rather than standing alone at a level
//! ```
//!
//! Alongside the pricing loop it accrues an interest estimate from active
//! credits and reconciles it against realized deposit-balance changes.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`gateway`]: Exchange gateway trait, Bitfinex REST client, mock
//! - [`lendbook`]: Lend-book snapshot types and competitive-rate analysis
//! - [`strategy`]: Interest accounting, offer reconciliation, decision loop
//! - [`api`]: HTTP API for health/metrics
//! - [`metrics`]: Prometheus counters and histograms
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod lendbook;
pub mod metrics;
pub mod strategy;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result};
