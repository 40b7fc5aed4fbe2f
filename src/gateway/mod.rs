//! Exchange gateway module.
//!
//! This module handles:
//! - The [`ExchangeGateway`] trait the strategy loop runs against
//! - The Bitfinex v1 REST client and request signing
//! - A mock gateway for testing

pub mod auth;
pub mod client;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::GatewayError;
use crate::lendbook::LendBook;

pub use client::BitfinexClient;
pub use mock::{GatewayCall, MockFailures, MockGateway};
pub use types::{ActiveCredit, ActiveOffer, Balance, PlacedOffer, WalletType};

/// Abstraction over the exchange's funding endpoints.
///
/// Every call may fail with a transport or auth error; the strategy loop
/// treats any failure as "skip the rest of this cycle". Calls are issued
/// sequentially, never concurrently, because ordering is significant:
/// cancellations must be issued before a replacement order is placed.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Fetch all wallet balances.
    async fn fetch_balances(&self) -> Result<Vec<Balance>, GatewayError>;

    /// Fetch the caller's resting lending offers.
    async fn fetch_active_offers(&self) -> Result<Vec<ActiveOffer>, GatewayError>;

    /// Fetch the caller's currently lent-out credits.
    async fn fetch_active_credits(&self) -> Result<Vec<ActiveCredit>, GatewayError>;

    /// Fetch a lend-book snapshot for a currency.
    async fn fetch_lend_book(
        &self,
        currency: &str,
        bid_depth: u32,
        ask_depth: u32,
    ) -> Result<LendBook, GatewayError>;

    /// Cancel a resting offer by ID.
    async fn cancel_offer(&self, id: u64) -> Result<(), GatewayError>;

    /// Place a floating-rate (FRR) lending offer, market-type.
    async fn place_floating_order(
        &self,
        currency: &str,
        amount: Decimal,
        term_days: u32,
    ) -> Result<PlacedOffer, GatewayError>;

    /// Place a fixed-rate lending offer at the given annualized rate, limit-type.
    async fn place_fixed_order(
        &self,
        currency: &str,
        amount: Decimal,
        term_days: u32,
        rate: Decimal,
    ) -> Result<PlacedOffer, GatewayError>;
}
