//! Bitfinex v1 REST client.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::GatewayError;
use crate::lendbook::{LendBook, LendLevel};

use super::auth::{auth_headers, NonceFactory};
use super::types::{ActiveCredit, ActiveOffer, Balance, PlacedOffer, WalletType};
use super::ExchangeGateway;

/// Lending direction of an offer, as the v1 API spells it.
const DIRECTION_LEND: &str = "lend";

/// Bitfinex v1 REST client.
#[derive(Debug, Clone)]
pub struct BitfinexClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// REST base URL.
    base_url: String,
    /// API key.
    api_key: String,
    /// API secret.
    api_secret: String,
    /// Strictly increasing nonce source shared across clones.
    nonces: Arc<NonceFactory>,
}

/// One lend-book level as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct LendLevelResponse {
    /// Annualized rate in percent, string-encoded.
    pub rate: String,
    /// Amount at this level, string-encoded.
    pub amount: String,
    /// `"Yes"` when the level floats at FRR.
    pub frr: String,
}

/// Lend-book response from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct LendBookResponse {
    /// Bid levels.
    pub bids: Vec<LendLevelResponse>,
    /// Ask levels.
    pub asks: Vec<LendLevelResponse>,
}

/// One wallet balance as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Wallet type: `deposit`, `exchange` or `trading`.
    #[serde(rename = "type")]
    pub wallet_type: String,
    /// Currency code, lowercase.
    pub currency: String,
    /// Total amount, string-encoded.
    pub amount: String,
}

/// One resting offer as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferResponse {
    /// Offer ID.
    pub id: u64,
    /// `lend` or `loan`.
    pub direction: String,
    /// Annualized rate in percent, string-encoded; `"0.0"` for FRR offers.
    pub rate: String,
    /// Unmatched amount, string-encoded.
    pub remaining_amount: String,
}

/// One active credit as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreditResponse {
    /// Lent-out amount, string-encoded.
    pub amount: String,
    /// Annualized rate in percent, string-encoded.
    pub rate: String,
}

/// Error body the API returns on application-level failures.
#[derive(Debug, Clone, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}

fn parse_decimal(value: &str, field: &str) -> Result<Decimal, GatewayError> {
    Decimal::from_str(value)
        .map_err(|e| GatewayError::Parse(format!("bad decimal in {}: {:?} ({})", field, value, e)))
}

impl BitfinexClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            base_url: config.bitfinex_api_url.trim_end_matches('/').to_string(),
            api_key: config.bitfinex_api_key.clone(),
            api_secret: config.bitfinex_api_secret.clone(),
            nonces: Arc::new(NonceFactory::new()),
        }
    }

    /// POST an authenticated v1 request and parse the JSON response.
    async fn post_signed<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        extra: serde_json::Value,
    ) -> Result<T, GatewayError> {
        let mut body = json!({
            "request": path,
            "nonce": self.nonces.next().to_string(),
        });

        if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }

        let headers = auth_headers(&self.api_key, &self.api_secret, &body)?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("X-BFX-APIKEY", &headers.api_key)
            .header("X-BFX-PAYLOAD", &headers.payload)
            .header("X-BFX-SIGNATURE", &headers.signature)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status));

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(GatewayError::Auth(message));
            }

            return Err(GatewayError::Api {
                endpoint: path.to_string(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Parse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl ExchangeGateway for BitfinexClient {
    #[instrument(skip(self))]
    async fn fetch_balances(&self) -> Result<Vec<Balance>, GatewayError> {
        let rows: Vec<BalanceResponse> = self.post_signed("/v1/balances", json!({})).await?;

        let mut balances = Vec::with_capacity(rows.len());
        for row in rows {
            let Ok(wallet) = WalletType::from_str(&row.wallet_type) else {
                warn!(wallet_type = %row.wallet_type, "Skipping balance in unknown wallet");
                continue;
            };

            balances.push(Balance {
                wallet,
                currency: row.currency.to_uppercase(),
                amount: parse_decimal(&row.amount, "balance.amount")?,
            });
        }

        debug!(count = balances.len(), "Fetched balances");
        Ok(balances)
    }

    #[instrument(skip(self))]
    async fn fetch_active_offers(&self) -> Result<Vec<ActiveOffer>, GatewayError> {
        let rows: Vec<OfferResponse> = self.post_signed("/v1/offers", json!({})).await?;

        let offers = rows
            .into_iter()
            .filter(|row| row.direction == DIRECTION_LEND)
            .map(|row| {
                Ok(ActiveOffer {
                    id: row.id,
                    remaining_amount: parse_decimal(&row.remaining_amount, "offer.remaining")?,
                    rate: parse_decimal(&row.rate, "offer.rate")?,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        debug!(count = offers.len(), "Fetched active offers");
        Ok(offers)
    }

    #[instrument(skip(self))]
    async fn fetch_active_credits(&self) -> Result<Vec<ActiveCredit>, GatewayError> {
        let rows: Vec<CreditResponse> = self.post_signed("/v1/credits", json!({})).await?;

        let credits = rows
            .into_iter()
            .map(|row| {
                Ok(ActiveCredit {
                    amount: parse_decimal(&row.amount, "credit.amount")?,
                    rate: parse_decimal(&row.rate, "credit.rate")?,
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        debug!(count = credits.len(), "Fetched active credits");
        Ok(credits)
    }

    #[instrument(skip(self))]
    async fn fetch_lend_book(
        &self,
        currency: &str,
        bid_depth: u32,
        ask_depth: u32,
    ) -> Result<LendBook, GatewayError> {
        let url = format!("{}/v1/lendbook/{}", self.base_url, currency.to_lowercase());

        let response = self
            .http
            .get(&url)
            .query(&[
                ("limit_bids", bid_depth.to_string()),
                ("limit_asks", ask_depth.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Api {
                endpoint: format!("/v1/lendbook/{}", currency),
                message: format!("HTTP {}", status),
            });
        }

        let book: LendBookResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(format!("lendbook: {}", e)))?;

        let convert = |rows: Vec<LendLevelResponse>| -> Result<Vec<LendLevel>, GatewayError> {
            rows.into_iter()
                .map(|row| {
                    Ok(LendLevel {
                        rate: parse_decimal(&row.rate, "level.rate")?,
                        amount: parse_decimal(&row.amount, "level.amount")?,
                        frr: row.frr.eq_ignore_ascii_case("yes"),
                    })
                })
                .collect()
        };

        let book = LendBook::new(convert(book.bids)?, convert(book.asks)?);
        debug!(
            bids = book.bids.len(),
            asks = book.asks.len(),
            "Fetched lend book"
        );
        Ok(book)
    }

    #[instrument(skip(self))]
    async fn cancel_offer(&self, id: u64) -> Result<(), GatewayError> {
        let _: OfferResponse = self
            .post_signed("/v1/offer/cancel", json!({ "offer_id": id }))
            .await
            .map_err(|e| GatewayError::CancelFailed {
                offer_id: id,
                reason: e.to_string(),
            })?;

        debug!(offer_id = id, "Cancelled offer");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn place_floating_order(
        &self,
        currency: &str,
        amount: Decimal,
        term_days: u32,
    ) -> Result<PlacedOffer, GatewayError> {
        // FRR offers are submitted with rate 0; the venue floats them
        let placed: OfferResponse = self
            .post_signed(
                "/v1/offer/new",
                json!({
                    "currency": currency,
                    "amount": amount.to_string(),
                    "rate": "0",
                    "period": term_days,
                    "direction": DIRECTION_LEND,
                }),
            )
            .await?;

        debug!(offer_id = placed.id, %amount, term_days, "Placed floating-rate offer");
        Ok(PlacedOffer { id: placed.id })
    }

    #[instrument(skip(self))]
    async fn place_fixed_order(
        &self,
        currency: &str,
        amount: Decimal,
        term_days: u32,
        rate: Decimal,
    ) -> Result<PlacedOffer, GatewayError> {
        let placed: OfferResponse = self
            .post_signed(
                "/v1/offer/new",
                json!({
                    "currency": currency,
                    "amount": amount.to_string(),
                    "rate": rate.to_string(),
                    "period": term_days,
                    "direction": DIRECTION_LEND,
                }),
            )
            .await?;

        debug!(offer_id = placed.id, %amount, %rate, term_days, "Placed fixed-rate offer");
        Ok(PlacedOffer { id: placed.id })
    }
}
