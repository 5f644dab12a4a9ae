//! The gateway handler: event parsing, per-ticker fetch orchestration and
//! response shaping.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, error, info};

use crate::core::config::GatewayConfig;
use crate::core::{GatewayError, SummaryProvider};
use crate::pricing::TickerResult;
use crate::providers::yahoo_finance::YahooFinanceProvider;

const MISSING_TICKERS: &str =
    r#"Please provide a JSON object with a "tickers" key containing a list of ticker strings."#;

/// Per-ticker outcome of one invocation. A ticker lands in exactly one map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub data: BTreeMap<String, TickerResult>,
    pub errors: BTreeMap<String, String>,
}

/// HTTP-style response handed back to the invoking platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl GatewayResponse {
    fn default_headers() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ])
    }

    pub fn ok(envelope: &ResponseEnvelope) -> Self {
        match serde_json::to_string_pretty(envelope) {
            Ok(body) => GatewayResponse {
                status_code: 200,
                headers: Self::default_headers(),
                body,
            },
            Err(e) => {
                error!("Failed to serialize response envelope: {e}");
                Self::error(500, &format!("Unexpected failure: {e}"))
            }
        }
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        GatewayResponse {
            status_code,
            headers: Self::default_headers(),
            body: json!({ "error": message }).to_string(),
        }
    }
}

/// Extracts the normalized ticker list from an invocation event.
///
/// The tickers may sit in a JSON-encoded string `body`, in an object `body`,
/// or directly on the event when no body is present. Symbols are trimmed,
/// uppercased and deduplicated in order of first appearance.
pub fn parse_event(event: &Value) -> Result<Vec<String>, GatewayError> {
    let body: Cow<'_, Value> = match event.get("body") {
        Some(Value::String(raw)) => Cow::Owned(serde_json::from_str(raw).map_err(|e| {
            GatewayError::Validation(format!("Request body is not valid JSON: {e}"))
        })?),
        Some(body) if body.is_object() => Cow::Borrowed(body),
        _ => Cow::Borrowed(event),
    };

    let tickers = match body.get("tickers") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(GatewayError::Validation(MISSING_TICKERS.to_string())),
    };

    let mut seen = HashSet::new();
    let symbols: Vec<String> = tickers
        .iter()
        .filter_map(Value::as_str)
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect();

    if symbols.is_empty() {
        return Err(GatewayError::Validation(
            "No valid ticker symbols provided".to_string(),
        ));
    }
    Ok(symbols)
}

async fn fetch_ticker(
    provider: &dyn SummaryProvider,
    symbol: &str,
    now: DateTime<Utc>,
) -> Result<TickerResult, GatewayError> {
    let raw = provider.fetch_summary(symbol).await?;
    TickerResult::from_summary(symbol, &raw, now)
}

/// Fetches every ticker independently and folds the outcomes into an envelope.
pub async fn process_tickers(
    provider: &dyn SummaryProvider,
    tickers: &[String],
    max_concurrency: Option<usize>,
) -> ResponseEnvelope {
    let now = Utc::now();
    let limit = max_concurrency.unwrap_or(tickers.len()).max(1);
    info!("Fetching data for tickers: {}", tickers.join(", "));

    let outcomes: Vec<(&String, Result<TickerResult, GatewayError>)> = stream::iter(tickers)
        .map(|symbol| async move {
            debug!("Processing {symbol}...");
            (symbol, fetch_ticker(provider, symbol, now).await)
        })
        .buffered(limit)
        .collect()
        .await;

    outcomes
        .into_iter()
        .fold(ResponseEnvelope::default(), |mut envelope, (symbol, outcome)| {
            match outcome {
                Ok(result) => {
                    info!("Successfully processed data for {symbol}");
                    envelope.data.insert(symbol.clone(), result);
                }
                Err(e) => {
                    let message = format!("Error processing {symbol}: {e}");
                    error!("{message}");
                    envelope.errors.insert(symbol.clone(), message);
                }
            }
            envelope
        })
}

/// Runs one invocation against `provider`.
///
/// Only malformed input produces a non-200 response; per-ticker failures are
/// reported in the envelope's `errors`.
pub async fn handle_event(
    provider: &dyn SummaryProvider,
    event: &Value,
    max_concurrency: Option<usize>,
) -> GatewayResponse {
    let tickers = match parse_event(event) {
        Ok(tickers) => tickers,
        Err(e) => {
            error!("Error parsing event: {e}");
            return GatewayResponse::error(400, &e.to_string());
        }
    };

    let envelope = process_tickers(provider, &tickers, max_concurrency).await;
    GatewayResponse::ok(&envelope)
}

/// Runs one invocation with a fresh Yahoo Finance provider built from `config`.
pub async fn handle_event_with_config(config: &GatewayConfig, event: &Value) -> GatewayResponse {
    let provider = match YahooFinanceProvider::new(&config.providers.yahoo) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Unexpected failure: {e:#}");
            return GatewayResponse::error(500, &format!("Unexpected failure: {e:#}"));
        }
    };
    handle_event(&provider, event, config.max_concurrency).await
}
