//! Mock exchange gateway for unit testing.
//!
//! This module provides a scripted gateway that can be used in tests
//! without making real network requests. Every call is recorded so tests
//! can assert ordering (cancellations before placement).

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::GatewayError;
use crate::lendbook::{LendBook, LendLevel};

use super::types::{ActiveCredit, ActiveOffer, Balance, PlacedOffer, WalletType};
use super::ExchangeGateway;

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// Balances were fetched.
    FetchBalances,
    /// Active offers were fetched.
    FetchActiveOffers,
    /// Active credits were fetched.
    FetchActiveCredits,
    /// The lend book was fetched.
    FetchLendBook {
        /// Requested currency.
        currency: String,
        /// Requested bid depth.
        bid_depth: u32,
        /// Requested ask depth.
        ask_depth: u32,
    },
    /// An offer was cancelled.
    CancelOffer {
        /// Cancelled offer ID.
        id: u64,
    },
    /// A floating-rate offer was placed.
    PlaceFloating {
        /// Offered amount.
        amount: Decimal,
        /// Term in days.
        term_days: u32,
    },
    /// A fixed-rate offer was placed.
    PlaceFixed {
        /// Offered amount.
        amount: Decimal,
        /// Term in days.
        term_days: u32,
        /// Annualized rate in percent.
        rate: Decimal,
    },
}

/// Failure switches for the mock.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockFailures {
    /// Fail balance fetches.
    pub balances: bool,
    /// Fail offer fetches.
    pub offers: bool,
    /// Fail credit fetches.
    pub credits: bool,
    /// Fail lend-book fetches.
    pub lend_book: bool,
    /// Fail cancellations.
    pub cancel: bool,
    /// Fail order placement.
    pub place: bool,
}

#[derive(Debug, Default)]
struct MockState {
    balances: Vec<Balance>,
    offers: Vec<ActiveOffer>,
    credits: Vec<ActiveCredit>,
    bids: Vec<LendLevel>,
    asks: Vec<LendLevel>,
    failures: MockFailures,
    calls: Vec<GatewayCall>,
    next_offer_id: u64,
}

/// Scripted in-memory gateway.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Create an empty mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deposit-wallet USD balance (convenience for most tests).
    pub fn set_deposit_balance(&self, amount: Decimal) {
        let mut state = self.state.lock().unwrap();
        state.balances = vec![Balance::new(WalletType::Deposit, "USD", amount)];
    }

    /// Set the full balance list.
    pub fn set_balances(&self, balances: Vec<Balance>) {
        self.state.lock().unwrap().balances = balances;
    }

    /// Set the resting offers.
    pub fn set_offers(&self, offers: Vec<ActiveOffer>) {
        self.state.lock().unwrap().offers = offers;
    }

    /// Set the active credits.
    pub fn set_credits(&self, credits: Vec<ActiveCredit>) {
        self.state.lock().unwrap().credits = credits;
    }

    /// Set the lend-book snapshot returned by `fetch_lend_book`.
    pub fn set_book(&self, bids: Vec<LendLevel>, asks: Vec<LendLevel>) {
        let mut state = self.state.lock().unwrap();
        state.bids = bids;
        state.asks = asks;
    }

    /// Set failure switches.
    pub fn set_failures(&self, failures: MockFailures) {
        self.state.lock().unwrap().failures = failures;
    }

    /// Snapshot of all recorded calls, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: GatewayCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn fail(message: &str) -> GatewayError {
        GatewayError::Api {
            endpoint: "mock".to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn fetch_balances(&self) -> Result<Vec<Balance>, GatewayError> {
        self.record(GatewayCall::FetchBalances);
        let state = self.state.lock().unwrap();
        if state.failures.balances {
            return Err(Self::fail("balances failure"));
        }
        Ok(state.balances.clone())
    }

    async fn fetch_active_offers(&self) -> Result<Vec<ActiveOffer>, GatewayError> {
        self.record(GatewayCall::FetchActiveOffers);
        let state = self.state.lock().unwrap();
        if state.failures.offers {
            return Err(Self::fail("offers failure"));
        }
        Ok(state.offers.clone())
    }

    async fn fetch_active_credits(&self) -> Result<Vec<ActiveCredit>, GatewayError> {
        self.record(GatewayCall::FetchActiveCredits);
        let state = self.state.lock().unwrap();
        if state.failures.credits {
            return Err(Self::fail("credits failure"));
        }
        Ok(state.credits.clone())
    }

    async fn fetch_lend_book(
        &self,
        currency: &str,
        bid_depth: u32,
        ask_depth: u32,
    ) -> Result<LendBook, GatewayError> {
        self.record(GatewayCall::FetchLendBook {
            currency: currency.to_string(),
            bid_depth,
            ask_depth,
        });
        let state = self.state.lock().unwrap();
        if state.failures.lend_book {
            return Err(Self::fail("lend book failure"));
        }
        Ok(LendBook::new(state.bids.clone(), state.asks.clone()))
    }

    async fn cancel_offer(&self, id: u64) -> Result<(), GatewayError> {
        self.record(GatewayCall::CancelOffer { id });
        let mut state = self.state.lock().unwrap();
        if state.failures.cancel {
            return Err(Self::fail("cancel failure"));
        }
        state.offers.retain(|offer| offer.id != id);
        Ok(())
    }

    async fn place_floating_order(
        &self,
        _currency: &str,
        amount: Decimal,
        term_days: u32,
    ) -> Result<PlacedOffer, GatewayError> {
        self.record(GatewayCall::PlaceFloating { amount, term_days });
        let mut state = self.state.lock().unwrap();
        if state.failures.place {
            return Err(Self::fail("place failure"));
        }

        state.next_offer_id += 1;
        let id = state.next_offer_id;
        state.offers.push(ActiveOffer {
            id,
            remaining_amount: amount,
            rate: Decimal::ZERO,
        });
        Ok(PlacedOffer { id })
    }

    async fn place_fixed_order(
        &self,
        _currency: &str,
        amount: Decimal,
        term_days: u32,
        rate: Decimal,
    ) -> Result<PlacedOffer, GatewayError> {
        self.record(GatewayCall::PlaceFixed {
            amount,
            term_days,
            rate,
        });
        let mut state = self.state.lock().unwrap();
        if state.failures.place {
            return Err(Self::fail("place failure"));
        }

        state.next_offer_id += 1;
        let id = state.next_offer_id;
        state.offers.push(ActiveOffer {
            id,
            remaining_amount: amount,
            rate,
        });
        Ok(PlacedOffer { id })
    }
}
