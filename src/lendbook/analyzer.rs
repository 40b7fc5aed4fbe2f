//! Competitive-rate analysis of a lend-book snapshot.
//!
//! Derives the best bid rate, whether borrowers are demanding the Flash
//! Return Rate, and the best and second-best ask tiers priced outside the
//! best bid. Asks priced at or below the best bid are not valid lending
//! offers to compete against and are skipped.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::types::LendBook;

/// Sentinel ceiling rate meaning "no competitive ask found".
///
/// 7% per day * 365 days, annualized percent. No real funding offer rests
/// at or above this level.
pub const RATE_CEILING: Decimal = dec!(2555);

/// Derived view of one lend-book snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookAnalysis {
    /// Highest bid rate; zero when the bid side is empty.
    pub best_bid_rate: Decimal,
    /// Whether any bid level demands the Flash Return Rate.
    pub bid_frr: bool,
    /// Lowest ask rate strictly above the best bid, or [`RATE_CEILING`].
    pub best_ask_outside_best_bid: Decimal,
    /// Second-lowest such ask rate, or [`RATE_CEILING`].
    pub second_best_ask_outside_best_bid: Decimal,
    /// Total amount resting at the single best qualifying ask rate.
    pub best_ask_outside_best_bid_amount: Decimal,
    /// FRR flag of the last eligible ask level scanned.
    ///
    /// Deliberately last-wins rather than an aggregate; changing this to
    /// "any eligible level is FRR" would alter placement decisions.
    pub best_ask_frr: bool,
}

impl BookAnalysis {
    /// Whether at least one ask rests outside the best bid.
    pub fn has_competitive_ask(&self) -> bool {
        self.best_ask_outside_best_bid < RATE_CEILING
    }
}

/// Analyze a lend-book snapshot.
///
/// Ask levels are scanned in the order the exchange returned them. A level
/// is eligible when its rate is strictly greater than the best bid rate.
/// Each eligible level either becomes the new best tier (demoting the
/// previous best to second-best and resetting the accumulated amount),
/// tightens the second-best tier when it falls between the two, or, when
/// it ties the current best rate exactly, adds its amount to the tier.
pub fn analyze(book: &LendBook) -> BookAnalysis {
    let mut best_bid_rate = Decimal::ZERO;
    let mut bid_frr = false;

    for bid in &book.bids {
        if bid.rate > best_bid_rate {
            best_bid_rate = bid.rate;
        }
        if bid.frr {
            bid_frr = true;
        }
    }

    let mut best_ask = RATE_CEILING;
    let mut second_best_ask = RATE_CEILING;
    let mut best_ask_amount = Decimal::ZERO;
    let mut best_ask_frr = false;

    for ask in &book.asks {
        if ask.rate > best_bid_rate {
            if ask.rate < best_ask {
                second_best_ask = best_ask;
                best_ask = ask.rate;
                best_ask_amount = Decimal::ZERO;
            } else if ask.rate > best_ask && ask.rate < second_best_ask {
                second_best_ask = ask.rate;
            }

            // Accumulate when this level sits exactly at the best tier
            if ask.rate == best_ask {
                best_ask_amount += ask.amount;
            }

            best_ask_frr = ask.frr;
        }
    }

    BookAnalysis {
        best_bid_rate,
        bid_frr,
        best_ask_outside_best_bid: best_ask,
        second_best_ask_outside_best_bid: second_best_ask,
        best_ask_outside_best_bid_amount: best_ask_amount,
        best_ask_frr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lendbook::types::LendLevel;
    use pretty_assertions::assert_eq;

    fn book(bids: Vec<LendLevel>, asks: Vec<LendLevel>) -> LendBook {
        LendBook::new(bids, asks)
    }

    #[test]
    fn empty_book_keeps_sentinels() {
        let analysis = analyze(&book(vec![], vec![]));

        assert_eq!(analysis.best_bid_rate, Decimal::ZERO);
        assert!(!analysis.bid_frr);
        assert_eq!(analysis.best_ask_outside_best_bid, RATE_CEILING);
        assert_eq!(analysis.second_best_ask_outside_best_bid, RATE_CEILING);
        assert_eq!(analysis.best_ask_outside_best_bid_amount, Decimal::ZERO);
        assert!(!analysis.has_competitive_ask());
    }

    #[test]
    fn asks_at_or_below_best_bid_are_ignored() {
        // No ask is strictly above the best bid of 10
        let analysis = analyze(&book(
            vec![LendLevel::new(dec!(10), dec!(100))],
            vec![
                LendLevel::new(dec!(9), dec!(40)),
                LendLevel::new(dec!(10), dec!(60)),
            ],
        ));

        assert_eq!(analysis.best_ask_outside_best_bid, RATE_CEILING);
        assert_eq!(analysis.second_best_ask_outside_best_bid, RATE_CEILING);
        assert_eq!(analysis.best_ask_outside_best_bid_amount, Decimal::ZERO);
    }

    #[test]
    fn best_bid_and_frr_demand() {
        let analysis = analyze(&book(
            vec![
                LendLevel::new(dec!(5), dec!(100)),
                LendLevel::frr(dec!(8), dec!(50)),
            ],
            vec![],
        ));

        assert_eq!(analysis.best_bid_rate, dec!(8));
        assert!(analysis.bid_frr);
    }

    #[test]
    fn best_tier_accumulates_and_demotes() {
        let analysis = analyze(&book(
            vec![LendLevel::new(dec!(10), dec!(100))],
            vec![
                LendLevel::new(dec!(12), dec!(100)),
                LendLevel::new(dec!(12), dec!(50)),
                LendLevel::new(dec!(15), dec!(30)),
            ],
        ));

        assert_eq!(analysis.best_ask_outside_best_bid, dec!(12));
        assert_eq!(analysis.best_ask_outside_best_bid_amount, dec!(150));
        assert_eq!(analysis.second_best_ask_outside_best_bid, dec!(15));
    }

    #[test]
    fn unsorted_asks_demote_correctly() {
        // A later, better level resets the accumulated amount
        let analysis = analyze(&book(
            vec![LendLevel::new(dec!(10), dec!(100))],
            vec![
                LendLevel::new(dec!(15), dec!(30)),
                LendLevel::new(dec!(12), dec!(100)),
                LendLevel::new(dec!(12), dec!(50)),
            ],
        ));

        assert_eq!(analysis.best_ask_outside_best_bid, dec!(12));
        assert_eq!(analysis.best_ask_outside_best_bid_amount, dec!(150));
        assert_eq!(analysis.second_best_ask_outside_best_bid, dec!(15));
    }

    #[test]
    fn last_eligible_level_wins_frr_flag() {
        let frr_last = analyze(&book(
            vec![],
            vec![
                LendLevel::new(dec!(12), dec!(100)),
                LendLevel::frr(dec!(15), dec!(30)),
            ],
        ));
        assert!(frr_last.best_ask_frr);

        let fixed_last = analyze(&book(
            vec![],
            vec![
                LendLevel::frr(dec!(12), dec!(100)),
                LendLevel::new(dec!(15), dec!(30)),
            ],
        ));
        assert!(!fixed_last.best_ask_frr);
    }

    #[test]
    fn rate_equality_is_exact() {
        // 12.0 and 12.00 compare equal as decimals; 12.000001 does not
        let analysis = analyze(&book(
            vec![],
            vec![
                LendLevel::new(dec!(12.0), dec!(100)),
                LendLevel::new(dec!(12.00), dec!(50)),
                LendLevel::new(dec!(12.000001), dec!(25)),
            ],
        ));

        assert_eq!(analysis.best_ask_outside_best_bid, dec!(12.0));
        assert_eq!(analysis.best_ask_outside_best_bid_amount, dec!(150));
        assert_eq!(analysis.second_best_ask_outside_best_bid, dec!(12.000001));
    }
}
