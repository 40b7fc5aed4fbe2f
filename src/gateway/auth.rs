//! Request signing for the Bitfinex v1 REST API.
//!
//! Authenticated requests carry three headers:
//! - `X-BFX-APIKEY`: the API key
//! - `X-BFX-PAYLOAD`: the base64-encoded JSON body (which embeds the
//!   request path and a strictly increasing nonce)
//! - `X-BFX-SIGNATURE`: lowercase hex HMAC-SHA384 of the payload, keyed
//!   with the API secret

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha384;

use crate::error::GatewayError;

type HmacSha384 = Hmac<Sha384>;

/// Signed header set for one authenticated request.
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// `X-BFX-APIKEY` value.
    pub api_key: String,
    /// `X-BFX-PAYLOAD` value.
    pub payload: String,
    /// `X-BFX-SIGNATURE` value.
    pub signature: String,
}

/// Monotonic nonce source.
///
/// The exchange rejects a nonce at or below the last one it saw, so the
/// counter starts at the current epoch microseconds and only moves forward
/// even if the system clock steps backwards.
#[derive(Debug)]
pub struct NonceFactory {
    last: AtomicU64,
}

impl NonceFactory {
    /// Create a factory seeded from the wall clock.
    pub fn new() -> Self {
        let now_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(1);

        Self {
            last: AtomicU64::new(now_micros),
        }
    }

    /// Next strictly increasing nonce.
    pub fn next(&self) -> u64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for NonceFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Base64-encode a JSON body into the payload header value.
pub fn encode_payload(body: &serde_json::Value) -> String {
    BASE64.encode(body.to_string())
}

/// Sign an encoded payload with the API secret.
pub fn sign_payload(payload: &str, api_secret: &str) -> Result<String, GatewayError> {
    let mut mac = HmacSha384::new_from_slice(api_secret.as_bytes())
        .map_err(|e| GatewayError::Auth(format!("invalid API secret: {}", e)))?;
    mac.update(payload.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build the full header set for one request body.
pub fn auth_headers(
    api_key: &str,
    api_secret: &str,
    body: &serde_json::Value,
) -> Result<AuthHeaders, GatewayError> {
    if api_key.is_empty() {
        return Err(GatewayError::Auth("API key is empty".to_string()));
    }

    let payload = encode_payload(body);
    let signature = sign_payload(&payload, api_secret)?;

    Ok(AuthHeaders {
        api_key: api_key.to_string(),
        payload,
        signature,
    })
}
