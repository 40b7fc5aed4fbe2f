//! The decision cycle and polling loop.
//!
//! One cycle: fetch account snapshots, accrue and reconcile interest,
//! gate on inactive funds, analyze the lend book, decide, and replace the
//! resting position when the decision says so. Cancellations are always
//! issued before the replacement order. Any gateway failure abandons the
//! rest of the cycle; the loop retries on the next tick, 20 seconds later
//! by default, with no backoff.

use std::time::Instant;

use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::api::AppState;
use crate::config::Config;
use crate::error::GatewayError;
use crate::gateway::{ActiveOffer, ExchangeGateway};
use crate::lendbook::analyze;
use crate::metrics;

use super::accountant::{cycle_interest, reconcile_balance};
use super::reconciler::{decide, OfferAction, OfferProposal, RestingPosition};

/// Process-lifetime strategy state, owned by the engine and threaded
/// through each cycle. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyState {
    /// Last observed USD deposit balance.
    pub deposit_funds: Decimal,
    /// Running interest estimate since the last observed payout.
    pub estimated_accumulated_interest: Decimal,
    /// When the previous cycle observed the account.
    pub previous_cycle_at: OffsetDateTime,
}

impl StrategyState {
    /// Fresh state as of `now`.
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            deposit_funds: Decimal::ZERO,
            estimated_accumulated_interest: Decimal::ZERO,
            previous_cycle_at: now,
        }
    }
}

/// What a single cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Inactive funds below the minimum; no market action taken.
    InsufficientFunds {
        /// The inactive funds that failed the gate.
        inactive_funds: Decimal,
    },
    /// The resting position already matched the decision; nothing done.
    Kept,
    /// All resting offers cancelled and one new order placed.
    Replaced {
        /// The proposal that was placed.
        proposal: OfferProposal,
        /// How many resting offers were cancelled first.
        cancelled: usize,
    },
}

/// Engine statistics exposed to the status endpoint.
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Completed decision cycles (including gated and failed-free ones).
    pub cycles_completed: u64,
    /// Replacement decisions taken.
    pub offers_replaced: u64,
    /// Individual offers cancelled.
    pub offers_cancelled: u64,
    /// Running interest estimate.
    pub estimated_accumulated_interest: Decimal,
    /// Last observed deposit balance.
    pub deposit_funds: Decimal,
    /// Inactive funds as of the last cycle.
    pub inactive_funds: Decimal,
}

impl EngineStats {
    /// Zeroed stats.
    pub fn empty() -> Self {
        Self {
            cycles_completed: 0,
            offers_replaced: 0,
            offers_cancelled: 0,
            estimated_accumulated_interest: Decimal::ZERO,
            deposit_funds: Decimal::ZERO,
            inactive_funds: Decimal::ZERO,
        }
    }
}

/// The strategy engine: one gateway, one state, one resting position.
#[derive(Debug)]
pub struct StrategyEngine<G: ExchangeGateway> {
    gateway: G,
    config: Config,
    state: StrategyState,
    stats: EngineStats,
}

impl<G: ExchangeGateway> StrategyEngine<G> {
    /// Create an engine whose state starts now.
    pub fn new(gateway: G, config: Config) -> Self {
        Self::with_start(gateway, config, OffsetDateTime::now_utc())
    }

    /// Create an engine with an explicit start instant (for tests).
    pub fn with_start(gateway: G, config: Config, now: OffsetDateTime) -> Self {
        Self {
            gateway,
            config,
            state: StrategyState::new(now),
            stats: EngineStats::empty(),
        }
    }

    /// Current strategy state.
    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> EngineStats {
        self.stats.clone()
    }

    /// Run one decision cycle observed at `now`.
    ///
    /// Any gateway error aborts the remainder of the cycle; already-applied
    /// accounting updates are kept (no partial-cycle rollback).
    #[instrument(skip(self), fields(currency = %self.config.currency))]
    pub async fn run_cycle(&mut self, now: OffsetDateTime) -> Result<CycleOutcome, GatewayError> {
        self.stats.cycles_completed += 1;

        let balances = self.gateway.fetch_balances().await?;
        let offers = self.gateway.fetch_active_offers().await?;
        let credits = self.gateway.fetch_active_credits().await?;

        let elapsed = now - self.state.previous_cycle_at;
        self.state.previous_cycle_at = now;

        let interest = cycle_interest(&credits, elapsed);

        let currency = self.config.currency_upper();
        match balances.iter().find(|b| b.is_deposit_for(&currency)) {
            Some(balance) => {
                reconcile_balance(&mut self.state, balance.amount, interest);
            }
            None => warn!(%currency, "No deposit balance observed this cycle"),
        }

        // Recomputed fresh every cycle, never cached
        let active_credit_amount: Decimal = credits.iter().map(|c| c.amount).sum();
        let inactive_funds = self.state.deposit_funds - active_credit_amount;

        self.stats.estimated_accumulated_interest = self.state.estimated_accumulated_interest;
        self.stats.deposit_funds = self.state.deposit_funds;
        self.stats.inactive_funds = inactive_funds;

        if inactive_funds < self.config.min_inactive_funds {
            info!(
                %inactive_funds,
                threshold = %self.config.min_inactive_funds,
                "Not enough inactive funds to post an offer"
            );
            return Ok(CycleOutcome::InsufficientFunds { inactive_funds });
        }

        let fetch_started = Instant::now();
        let book = self
            .gateway
            .fetch_lend_book(&currency, self.config.book_depth, self.config.book_depth)
            .await?;
        metrics::record_book_fetch_latency(fetch_started);

        let analysis = analyze(&book);
        let position = RestingPosition::from_offers(&offers);

        match decide(&analysis, &position, inactive_funds) {
            OfferAction::Keep => {
                info!(
                    frr = position.frr,
                    amount = %position.amount,
                    rate = %position.rate,
                    "Resting position matches the decision; keeping it"
                );
                Ok(CycleOutcome::Kept)
            }
            OfferAction::Replace(proposal) => {
                let cancelled = self.replace_position(&offers, &proposal).await?;
                Ok(CycleOutcome::Replaced {
                    proposal,
                    cancelled,
                })
            }
        }
    }

    /// Cancel every resting offer, then place exactly one new order.
    async fn replace_position(
        &mut self,
        offers: &[ActiveOffer],
        proposal: &OfferProposal,
    ) -> Result<usize, GatewayError> {
        self.stats.offers_replaced += 1;

        if self.config.dry_run {
            info!(
                would_cancel = offers.len(),
                frr = proposal.frr,
                amount = %proposal.amount,
                rate = %proposal.rate,
                term_days = proposal.term_days(),
                "DRY RUN - would cancel resting offers and place order"
            );
            return Ok(offers.len());
        }

        if offers.is_empty() {
            info!("Found no previous offer to cancel");
        }

        for offer in offers {
            info!(offer_id = offer.id, remaining = %offer.remaining_amount, "Cancelling offer");
            self.gateway.cancel_offer(offer.id).await?;
            self.stats.offers_cancelled += 1;
            metrics::inc_offers_cancelled();
        }

        let currency = self.config.currency_upper();
        let placed = if proposal.frr {
            info!(
                amount = %proposal.amount,
                term_days = proposal.term_days(),
                "Sending floating-rate order"
            );
            self.gateway
                .place_floating_order(&currency, proposal.amount, proposal.term_days())
                .await?
        } else {
            info!(
                amount = %proposal.amount,
                rate = %proposal.rate,
                term_days = proposal.term_days(),
                "Sending fixed-rate order"
            );
            self.gateway
                .place_fixed_order(
                    &currency,
                    proposal.amount,
                    proposal.term_days(),
                    proposal.rate,
                )
                .await?
        };

        info!(offer_id = placed.id, "Order placed");
        metrics::inc_orders_placed();
        Ok(offers.len())
    }

    /// Run the polling loop forever, publishing stats to the app state.
    pub async fn run(mut self, app_state: AppState) {
        let interval = std::time::Duration::from_secs(self.config.poll_interval_secs);

        loop {
            let started = Instant::now();

            match self.run_cycle(OffsetDateTime::now_utc()).await {
                Ok(outcome) => {
                    app_state.set_ready(true);
                    info!(?outcome, "Cycle complete");
                }
                Err(e) => {
                    metrics::inc_gateway_errors();
                    warn!(error = %e, "Cycle failed; retrying on the next tick");
                }
            }

            metrics::record_cycle_latency(started);
            metrics::inc_cycles();
            *app_state.stats.write().await = self.stats();

            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ActiveCredit, GatewayCall, MockFailures, MockGateway};
    use crate::lendbook::LendLevel;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use time::macros::datetime;

    fn test_config() -> Config {
        Config {
            bitfinex_api_key: String::new(),
            bitfinex_api_secret: String::new(),
            bitfinex_api_url: "https://test".to_string(),
            currency: "USD".to_string(),
            min_inactive_funds: dec!(50),
            poll_interval_secs: 20,
            book_depth: 5000,
            dry_run: false,
            port: 8080,
            rust_log: "info".to_string(),
            verbose: false,
        }
    }

    fn engine_at(
        mock: &MockGateway,
        start: OffsetDateTime,
    ) -> StrategyEngine<MockGateway> {
        StrategyEngine::with_start(mock.clone(), test_config(), start)
    }

    const T0: OffsetDateTime = datetime!(2015-10-07 00:00 UTC);

    #[tokio::test]
    async fn gate_blocks_below_minimum_funds() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(49.999999));

        let mut engine = engine_at(&mock, T0);
        let outcome = engine.run_cycle(T0).await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::InsufficientFunds {
                inactive_funds: dec!(49.999999)
            }
        );
        // Gated cycles never touch the lend book
        assert!(!mock
            .calls()
            .iter()
            .any(|c| matches!(c, GatewayCall::FetchLendBook { .. })));
    }

    #[tokio::test]
    async fn gate_passes_at_exact_threshold() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(50));
        mock.set_book(
            vec![LendLevel::new(dec!(10), dec!(100))],
            vec![LendLevel::new(dec!(20), dec!(100))],
        );

        let mut engine = engine_at(&mock, T0);
        let outcome = engine.run_cycle(T0).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Replaced { .. }));
    }

    #[tokio::test]
    async fn places_fixed_order_when_no_resting_offer() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(100));
        mock.set_book(
            vec![LendLevel::new(dec!(10), dec!(50))],
            vec![LendLevel::new(dec!(20), dec!(100))],
        );

        let mut engine = engine_at(&mock, T0);
        let outcome = engine.run_cycle(T0).await.unwrap();

        // No resting offer, so the 100-unit best tier is not "ours";
        // the strategy joins it rather than retreating
        assert_eq!(
            outcome,
            CycleOutcome::Replaced {
                proposal: OfferProposal::fixed(dec!(100), dec!(20)),
                cancelled: 0,
            }
        );

        let calls = mock.calls();
        assert!(calls.contains(&GatewayCall::PlaceFixed {
            amount: dec!(100),
            term_days: 2,
            rate: dec!(20),
        }));
        assert!(!calls.iter().any(|c| matches!(c, GatewayCall::CancelOffer { .. })));
    }

    #[tokio::test]
    async fn cancels_all_offers_before_placing() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(100));
        mock.set_offers(vec![
            ActiveOffer {
                id: 7,
                remaining_amount: dec!(60),
                rate: dec!(12),
            },
            ActiveOffer {
                id: 8,
                remaining_amount: dec!(40),
                rate: dec!(12),
            },
        ]);
        mock.set_book(
            vec![LendLevel::new(dec!(10), dec!(50))],
            vec![LendLevel::new(dec!(11), dec!(500))],
        );

        let mut engine = engine_at(&mock, T0);
        let outcome = engine.run_cycle(T0).await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Replaced {
                proposal: OfferProposal::fixed(dec!(100), dec!(11)),
                cancelled: 2,
            }
        );

        let calls = mock.calls();
        let first_cancel = calls
            .iter()
            .position(|c| matches!(c, GatewayCall::CancelOffer { .. }))
            .unwrap();
        let second_cancel = calls
            .iter()
            .rposition(|c| matches!(c, GatewayCall::CancelOffer { .. }))
            .unwrap();
        let place = calls
            .iter()
            .position(|c| matches!(c, GatewayCall::PlaceFixed { .. }))
            .unwrap();

        assert!(first_cancel < place);
        assert!(second_cancel < place);
    }

    #[tokio::test]
    async fn keeps_matching_position() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(100));
        mock.set_offers(vec![ActiveOffer {
            id: 7,
            remaining_amount: dec!(100),
            rate: dec!(12),
        }]);
        // Best tier holds 500 (not just ours), and our offer already sits at it
        mock.set_book(
            vec![LendLevel::new(dec!(10), dec!(50))],
            vec![LendLevel::new(dec!(12), dec!(500))],
        );

        let mut engine = engine_at(&mock, T0);
        let outcome = engine.run_cycle(T0).await.unwrap();

        assert_eq!(outcome, CycleOutcome::Kept);
        assert!(!mock
            .calls()
            .iter()
            .any(|c| matches!(c, GatewayCall::CancelOffer { .. })));
    }

    #[tokio::test]
    async fn gateway_failure_aborts_cycle() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(100));
        mock.set_failures(MockFailures {
            credits: true,
            ..Default::default()
        });

        let mut engine = engine_at(&mock, T0);
        let result = engine.run_cycle(T0).await;

        assert!(result.is_err());
        // The failed call was the last one issued
        assert_eq!(
            mock.calls(),
            vec![
                GatewayCall::FetchBalances,
                GatewayCall::FetchActiveOffers,
                GatewayCall::FetchActiveCredits,
            ]
        );
        // Accounting never ran, so the balance was not adopted
        assert_eq!(engine.state().deposit_funds, Decimal::ZERO);
    }

    #[tokio::test]
    async fn first_cycle_adopts_observed_balance() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(1000));
        mock.set_credits(vec![ActiveCredit {
            amount: dec!(1000),
            rate: dec!(36.5),
        }]);

        let mut engine = engine_at(&mock, T0);
        let outcome = engine.run_cycle(T0).await.unwrap();

        // deposit 1000 - 1000 lent out = 0 inactive, gated
        assert_eq!(
            outcome,
            CycleOutcome::InsufficientFunds {
                inactive_funds: Decimal::ZERO
            }
        );
        assert_eq!(engine.state().deposit_funds, dec!(1000));
        assert_eq!(
            engine.state().estimated_accumulated_interest,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn interest_accrues_across_cycles_with_synthetic_time() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(1000));
        mock.set_credits(vec![ActiveCredit {
            amount: dec!(1000),
            rate: dec!(36.5),
        }]);

        let mut engine = engine_at(&mock, T0);

        // Cycle 1 adopts the balance (0 -> 1000) and resets the estimate
        engine.run_cycle(T0).await.unwrap();

        // Cycle 2, exactly one day later with an unchanged balance,
        // accrues 1000 * (36.5 / 365 / 100) * 1 = 1.0
        engine.run_cycle(datetime!(2015-10-08 00:00 UTC)).await.unwrap();

        assert_eq!(
            engine.state().estimated_accumulated_interest,
            dec!(1.0)
        );
    }

    #[tokio::test]
    async fn dry_run_takes_no_market_action() {
        let mock = MockGateway::new();
        mock.set_deposit_balance(dec!(100));
        mock.set_offers(vec![ActiveOffer {
            id: 7,
            remaining_amount: dec!(100),
            rate: dec!(12),
        }]);
        mock.set_book(
            vec![LendLevel::new(dec!(10), dec!(50))],
            vec![LendLevel::new(dec!(11), dec!(500))],
        );

        let mut config = test_config();
        config.dry_run = true;
        let mut engine = StrategyEngine::with_start(mock.clone(), config, T0);

        let outcome = engine.run_cycle(T0).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Replaced { .. }));

        let calls = mock.calls();
        assert!(!calls.iter().any(|c| matches!(
            c,
            GatewayCall::CancelOffer { .. }
                | GatewayCall::PlaceFixed { .. }
                | GatewayCall::PlaceFloating { .. }
        )));
    }
}
