//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;

use crate::strategy::EngineStats;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the first cycle has completed.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// Funding currency the loop is lending.
    pub currency: Arc<tokio::sync::RwLock<Option<String>>>,
    /// Engine stats published after each cycle.
    pub stats: Arc<tokio::sync::RwLock<EngineStats>>,
    /// Prometheus render handle, when the exporter is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new() -> Self {
        Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            currency: Arc::new(tokio::sync::RwLock::new(None)),
            stats: Arc::new(tokio::sync::RwLock::new(EngineStats::empty())),
            metrics: None,
        }
    }

    /// Attach a Prometheus render handle for the `/metrics` endpoint.
    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready
            .store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the first cycle has completed.
    pub ready: bool,
    /// Funding currency if the loop has started.
    pub currency: Option<String>,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Funding currency.
    pub currency: Option<String>,
    /// Statistics.
    pub stats: StatsResponse,
}

/// Statistics in status response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Decision cycles completed.
    pub cycles_completed: u64,
    /// Replacement decisions taken.
    pub offers_replaced: u64,
    /// Offers cancelled.
    pub offers_cancelled: u64,
    /// Running interest estimate.
    pub estimated_accumulated_interest: String,
    /// Last observed deposit balance.
    pub deposit_funds: String,
    /// Inactive funds as of the last cycle.
    pub inactive_funds: String,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let currency = state.currency.read().await.clone();

    let response = ReadyResponse {
        ready: is_ready,
        currency,
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns loop status and statistics.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let currency = state.currency.read().await.clone();
    let stats = state.stats.read().await;

    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        currency,
        stats: StatsResponse {
            cycles_completed: stats.cycles_completed,
            offers_replaced: stats.offers_replaced,
            offers_cancelled: stats.offers_cancelled,
            estimated_accumulated_interest: stats.estimated_accumulated_interest.to_string(),
            deposit_funds: stats.deposit_funds.to_string(),
            inactive_funds: stats.inactive_funds.to_string(),
        },
    })
}

/// Prometheus exposition handler.
pub async fn metrics_export(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_state_ready_toggle() {
        let state = AppState::new();
        assert!(!state.is_ready());

        state.set_ready(true);
        assert!(state.is_ready());

        state.set_ready(false);
        assert!(!state.is_ready());
    }
}
