//! Interest accrual and balance reconciliation.
//!
//! Each cycle the accountant estimates the interest earned by active
//! credits since the previous cycle and reconciles the running estimate
//! against the observed deposit balance. The reconciliation cannot tell an
//! interest payout apart from a manual deposit or withdrawal; it reports
//! the raw delta and leaves interpretation to the operator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::Duration;
use tracing::info;

use crate::gateway::ActiveCredit;

use super::engine::StrategyState;

/// Milliseconds per day, as a decimal.
const MILLIS_PER_DAY: Decimal = dec!(86400000);

/// Days in the rate year the venue quotes against.
const DAYS_PER_YEAR: Decimal = dec!(365);

/// Outcome of one balance reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Balance unchanged; the estimate accumulated.
    Accrued {
        /// Running estimate after this cycle's accrual.
        estimated_total: Decimal,
    },
    /// Balance changed; interest was paid out and/or funds moved.
    BalanceChanged {
        /// Observed balance delta (post-fees).
        actual_delta: Decimal,
        /// The pre-change running estimate (pre-fees), for comparison.
        estimate_before: Decimal,
    },
}

/// Estimate the interest accrued by `credits` over `elapsed` wall-clock time.
///
/// Rates are annualized percentages, so `rate / 365 / 100` is the daily
/// fractional rate. All arithmetic is decimal; the result is an estimate
/// only and is never used in order-placement comparisons.
pub fn cycle_interest(credits: &[ActiveCredit], elapsed: Duration) -> Decimal {
    let elapsed_days = Decimal::from(elapsed.whole_milliseconds() as i64) / MILLIS_PER_DAY;

    credits
        .iter()
        .map(|credit| {
            credit.amount * (credit.rate / DAYS_PER_YEAR / Decimal::ONE_HUNDRED) * elapsed_days
        })
        .sum()
}

/// Reconcile the running interest estimate against an observed balance.
///
/// If the observed deposit balance equals the stored one, no payout or
/// transfer happened and the cycle's interest joins the running estimate.
/// Otherwise the realized delta is reported against the pre-change
/// estimate, the stored balance adopts the observed value and the estimate
/// restarts from zero.
pub fn reconcile_balance(
    state: &mut StrategyState,
    observed_balance: Decimal,
    interest: Decimal,
) -> Reconciliation {
    if state.deposit_funds == observed_balance {
        state.estimated_accumulated_interest += interest;
        info!(
            estimate = %state.estimated_accumulated_interest,
            "Estimated total accrued interest"
        );
        Reconciliation::Accrued {
            estimated_total: state.estimated_accumulated_interest,
        }
    } else {
        let actual_delta = observed_balance - state.deposit_funds;
        let estimate_before = state.estimated_accumulated_interest;
        info!(
            paid = %actual_delta,
            estimate = %estimate_before,
            "Exchange paid (post-fees) against the estimate (pre-fees)"
        );

        state.deposit_funds = observed_balance;
        state.estimated_accumulated_interest = Decimal::ZERO;

        Reconciliation::BalanceChanged {
            actual_delta,
            estimate_before,
        }
    }
}
