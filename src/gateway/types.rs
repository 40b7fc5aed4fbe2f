//! Account-side domain types returned by the exchange gateway.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Wallet a balance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum WalletType {
    /// Funding wallet; the only one the strategy consults.
    #[strum(serialize = "deposit")]
    Deposit,
    /// Spot exchange wallet.
    #[strum(serialize = "exchange")]
    Exchange,
    /// Margin trading wallet.
    #[strum(serialize = "trading")]
    Trading,
}

/// Balance of one currency in one wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// Wallet holding the balance.
    pub wallet: WalletType,
    /// Currency code, uppercase.
    pub currency: String,
    /// Total amount.
    pub amount: Decimal,
}

impl Balance {
    /// Create a new balance row.
    pub fn new(wallet: WalletType, currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            wallet,
            currency: currency.into(),
            amount,
        }
    }

    /// Whether this is the deposit-wallet balance for the given currency.
    pub fn is_deposit_for(&self, currency: &str) -> bool {
        self.wallet == WalletType::Deposit && self.currency.eq_ignore_ascii_case(currency)
    }
}

/// A not-yet-matched lending offer resting in the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveOffer {
    /// Exchange-assigned offer ID.
    pub id: u64,
    /// Amount still unmatched.
    pub remaining_amount: Decimal,
    /// Annualized rate in percent; zero means the offer floats at FRR.
    pub rate: Decimal,
}

impl ActiveOffer {
    /// Whether this offer floats at the Flash Return Rate.
    pub fn is_frr(&self) -> bool {
        self.rate.is_zero()
    }
}

/// Funds currently lent out and earning interest under a matched offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCredit {
    /// Lent-out amount.
    pub amount: Decimal,
    /// Annualized rate in percent.
    pub rate: Decimal,
}

/// Receipt for a newly placed lending offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOffer {
    /// Exchange-assigned offer ID.
    pub id: u64,
}
