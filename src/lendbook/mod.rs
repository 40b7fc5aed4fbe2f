//! Lend-book module for funding market data.
//!
//! This module handles:
//! - Lend-book snapshot types
//! - Competitive-rate analysis (best bid, FRR demand, ask tiers)

pub mod analyzer;
pub mod types;

pub use analyzer::{analyze, BookAnalysis, RATE_CEILING};
pub use types::{LendBook, LendLevel};
