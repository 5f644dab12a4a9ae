//! Upstream summary abstractions and core types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::GatewayError;

/// A single dividend payment as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub amount: f64,
    pub date: DateTime<Utc>,
}

/// Figures for one symbol exactly as the provider reported them.
///
/// Prices are in the quote currency, which may be a minor unit (e.g. `GBp`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSummary {
    pub currency: Option<String>,
    pub current_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub target_median_price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub dividends: Vec<DividendEvent>,
}

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn fetch_summary(&self, symbol: &str) -> Result<RawSummary, GatewayError>;
}
