//! Offer matching and the keep/replace decision tree.
//!
//! A proposal is compared against the currently resting position with
//! exact decimal equality on all three of {FRR flag, amount, rate}. Any
//! mismatch means every resting offer is cancelled and exactly one new
//! order is placed. The "don't stand alone" rule retreats to the
//! second-best competitive rate when the caller would otherwise be the
//! entire liquidity at the best price level.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::gateway::ActiveOffer;
use crate::lendbook::BookAnalysis;

/// Term for floating-rate (FRR) orders, in days.
pub const FLOATING_TERM_DAYS: u32 = 30;

/// Term for fixed-rate orders, in days.
pub const FIXED_TERM_DAYS: u32 = 2;

/// A lending order the strategy wants resting in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferProposal {
    /// Float at the Flash Return Rate.
    pub frr: bool,
    /// Amount to offer.
    pub amount: Decimal,
    /// Annualized rate in percent; zero for FRR proposals.
    pub rate: Decimal,
}

impl OfferProposal {
    /// Floating-rate proposal for the given amount.
    pub fn floating(amount: Decimal) -> Self {
        Self {
            frr: true,
            amount,
            rate: Decimal::ZERO,
        }
    }

    /// Fixed-rate proposal at the given annualized rate.
    pub fn fixed(amount: Decimal, rate: Decimal) -> Self {
        Self {
            frr: false,
            amount,
            rate,
        }
    }

    /// Term in days this proposal commits funds for once matched.
    pub fn term_days(&self) -> u32 {
        if self.frr {
            FLOATING_TERM_DAYS
        } else {
            FIXED_TERM_DAYS
        }
    }
}

/// The caller's resting offers folded into a single logical position.
///
/// Amounts are summed across all offers; the last-observed offer supplies
/// the representative rate and FRR flag. The model assumes at most one
/// offer is ever resting; observing more than one is reported as an
/// invariant violation rather than silently accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestingPosition {
    /// Representative FRR flag (last-observed offer).
    pub frr: bool,
    /// Sum of remaining amounts across all resting offers.
    pub amount: Decimal,
    /// Representative rate (last-observed offer).
    pub rate: Decimal,
}

impl RestingPosition {
    /// Empty position (no resting offers).
    pub fn empty() -> Self {
        Self {
            frr: false,
            amount: Decimal::ZERO,
            rate: Decimal::ZERO,
        }
    }

    /// Fold a set of resting offers into one position.
    pub fn from_offers(offers: &[ActiveOffer]) -> Self {
        if offers.len() > 1 {
            warn!(
                count = offers.len(),
                "More than one resting offer observed; summing amounts, last offer's rate wins"
            );
        }

        let mut position = Self::empty();
        for offer in offers {
            position.amount += offer.remaining_amount;
            position.rate = offer.rate;
            position.frr = offer.is_frr();
        }
        position
    }
}

/// What the strategy should do with its resting position this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferAction {
    /// The resting position already matches; leave it alone.
    Keep,
    /// Cancel every resting offer and place this proposal.
    Replace(OfferProposal),
}

/// Exact-equality match between the resting position and a proposal.
pub fn matches_current(current: &RestingPosition, proposed: &OfferProposal) -> bool {
    debug!(
        current_frr = current.frr,
        proposed_frr = proposed.frr,
        current_amount = %current.amount,
        proposed_amount = %proposed.amount,
        current_rate = %current.rate,
        proposed_rate = %proposed.rate,
        "Comparing resting position with proposal"
    );

    current.frr == proposed.frr
        && current.amount == proposed.amount
        && current.rate == proposed.rate
}

/// Decide what to do with the resting position given one book analysis.
///
/// Priority order:
/// 1. Borrowers demand FRR -> float the whole stack at FRR.
/// 2. The best competitive ask is FRR-priced -> sit with it at FRR.
/// 3. Otherwise compete on fixed rates: retreat to the second-best tier
///    when the caller would be the sole liquidity at the best tier, else
///    join the best tier.
///
/// In every branch a proposal that already matches the resting position
/// yields [`OfferAction::Keep`].
pub fn decide(
    analysis: &BookAnalysis,
    current: &RestingPosition,
    inactive_funds: Decimal,
) -> OfferAction {
    let floating = OfferProposal::floating(inactive_funds);

    // FRR demanded by borrowers: float everything
    if analysis.bid_frr && !matches_current(current, &floating) {
        return OfferAction::Replace(floating);
    }

    if analysis.best_ask_frr {
        // Best competitive ask floats; just sit with everyone else
        if !matches_current(current, &floating) {
            return OfferAction::Replace(floating);
        }
        return OfferAction::Keep;
    }

    // Best competitive ask is fixed-rate; compete on price
    debug!(
        best_tier_amount = %analysis.best_ask_outside_best_bid_amount,
        our_amount = %current.amount,
        "Comparing best ask tier amount with our resting amount"
    );

    if analysis.best_ask_outside_best_bid_amount == current.amount {
        // Don't stand out there alone: join the second-best tier
        return OfferAction::Replace(OfferProposal::fixed(
            inactive_funds,
            analysis.second_best_ask_outside_best_bid,
        ));
    }

    let join_best = OfferProposal::fixed(inactive_funds, analysis.best_ask_outside_best_bid);
    if !matches_current(current, &join_best) {
        return OfferAction::Replace(join_best);
    }

    OfferAction::Keep
}
