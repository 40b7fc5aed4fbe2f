//! Strategy module: the decision engine.
//!
//! This module handles:
//! - Interest accrual and balance reconciliation
//! - Offer matching and the replace/keep decision tree
//! - The cycle state machine and polling loop

pub mod accountant;
pub mod engine;
pub mod reconciler;

pub use accountant::{cycle_interest, reconcile_balance, Reconciliation};
pub use engine::{CycleOutcome, EngineStats, StrategyEngine, StrategyState};
pub use reconciler::{
    decide, matches_current, OfferAction, OfferProposal, RestingPosition, FIXED_TERM_DAYS,
    FLOATING_TERM_DAYS,
};
