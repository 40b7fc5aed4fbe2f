//! Lend-book types and data structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Single price level in the lending order book.
///
/// `rate` is an annualized percentage; a level flagged `frr` is priced at
/// the exchange's Flash Return Rate rather than its nominal rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LendLevel {
    /// Annualized rate in percent at this level.
    pub rate: Decimal,
    /// Total amount resting at this level, in currency units.
    pub amount: Decimal,
    /// Whether this level floats at the Flash Return Rate.
    pub frr: bool,
}

impl LendLevel {
    /// Create a new fixed-rate level.
    pub fn new(rate: Decimal, amount: Decimal) -> Self {
        Self {
            rate,
            amount,
            frr: false,
        }
    }

    /// Create a new FRR-priced level.
    pub fn frr(rate: Decimal, amount: Decimal) -> Self {
        Self {
            rate,
            amount,
            frr: true,
        }
    }
}

/// Point-in-time snapshot of the lending order book.
///
/// Bids are demand to borrow, asks are offers to lend. Levels are kept in
/// the order the exchange returned them and never mutated after capture.
#[derive(Debug, Clone)]
pub struct LendBook {
    /// Bid levels (borrow demand).
    pub bids: Vec<LendLevel>,
    /// Ask levels (lend offers).
    pub asks: Vec<LendLevel>,
    /// When this snapshot was captured.
    pub updated_at: OffsetDateTime,
}

impl Default for LendBook {
    fn default() -> Self {
        Self {
            bids: Vec::new(),
            asks: Vec::new(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

impl LendBook {
    /// Create a snapshot from level vectors.
    pub fn new(bids: Vec<LendLevel>, asks: Vec<LendLevel>) -> Self {
        Self {
            bids,
            asks,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Whether any bid demands the Flash Return Rate.
    pub fn has_frr_bid(&self) -> bool {
        self.bids.iter().any(|l| l.frr)
    }

    /// Total amount resting on the bid side.
    pub fn total_bid_amount(&self) -> Decimal {
        self.bids.iter().map(|l| l.amount).sum()
    }

    /// Total amount resting on the ask side.
    pub fn total_ask_amount(&self) -> Decimal {
        self.asks.iter().map(|l| l.amount).sum()
    }
}
