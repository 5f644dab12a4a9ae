use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use crate::core::config::YahooProviderConfig;
use crate::core::{DividendEvent, GatewayError, RawSummary, SummaryProvider};

const SUMMARY_MODULES: &str = "financialData,summaryDetail,price";

/// Headers a desktop browser sends alongside its user agent.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

// YahooFinanceProvider implementation for SummaryProvider
pub struct YahooFinanceProvider {
    base_url: String,
    cookie_url: String,
    client: reqwest::Client,
    crumb: OnceCell<String>,
}

impl YahooFinanceProvider {
    pub fn new(config: &YahooProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(browser_headers())
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(YahooFinanceProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url.clone(),
            client,
            crumb: OnceCell::new(),
        })
    }

    /// Performs the cookie and crumb handshake once per provider.
    async fn crumb(&self) -> Result<&str> {
        let crumb = self
            .crumb
            .get_or_try_init(|| async {
                // Only the cookies matter here; Yahoo answers this page with a 404
                match self.client.get(&self.cookie_url).send().await {
                    Ok(response) => debug!(status = %response.status(), "Cookie page visited"),
                    Err(e) => debug!("Cookie page request failed: {e}"),
                }

                let url = format!("{}/v1/test/getcrumb", self.base_url);
                debug!("Requesting crumb from {}", url);
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| anyhow!("Request error: {} for crumb URL: {}", e, url))?;

                if !response.status().is_success() {
                    return Err(anyhow!("HTTP error: {} while fetching crumb", response.status()));
                }

                let crumb = response.text().await?.trim().to_string();
                if crumb.is_empty() || crumb.contains('<') {
                    return Err(anyhow!("Received an invalid crumb"));
                }
                Ok::<String, anyhow::Error>(crumb)
            })
            .await?;
        Ok(crumb.as_str())
    }

    /// Builds `{base_url}/{segments..}/{symbol}` with the symbol kept as a
    /// single percent-encoded path segment.
    fn endpoint(&self, segments: &[&str], symbol: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Base URL cannot hold a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments)
            .push(symbol);
        Ok(url)
    }

    async fn fetch_quote_summary(&self, symbol: &str) -> Result<Option<QuoteSummaryItem>> {
        let crumb = self.crumb().await?;
        let mut url = self.endpoint(&["v10", "finance", "quoteSummary"], symbol)?;
        url.query_pairs_mut()
            .append_pair("modules", SUMMARY_MODULES)
            .append_pair("crumb", crumb);
        debug!("Requesting quote summary from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: QuoteSummaryResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        Ok(data
            .quote_summary
            .result
            .and_then(|items| items.into_iter().next()))
    }

    async fn fetch_dividends(&self, symbol: &str) -> Result<Vec<DividendEvent>> {
        let mut url = self.endpoint(&["v8", "finance", "chart"], symbol)?;
        url.query_pairs_mut()
            .append_pair("range", "2y")
            .append_pair("interval", "1mo")
            .append_pair("events", "div");
        debug!("Requesting dividend history from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {}", e, symbol))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let data = response.json::<ChartResponse>().await?;
        let dividends = data
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|item| item.events)
            .and_then(|events| events.dividends)
            .unwrap_or_default();

        let mut events: Vec<DividendEvent> = dividends
            .into_values()
            .filter_map(|d| {
                Utc.timestamp_opt(d.date, 0)
                    .single()
                    .map(|date| DividendEvent {
                        amount: d.amount,
                        date,
                    })
            })
            .collect();
        events.sort_by_key(|d| d.date);
        Ok(events)
    }
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Deserialize, Debug)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryItem>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryItem {
    financial_data: Option<FinancialData>,
    summary_detail: Option<SummaryDetail>,
    price: Option<PriceModule>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`, or `{}` when absent.
#[derive(Deserialize, Debug, Default, Clone, Copy)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: Option<RawValue>) -> Option<f64> {
    value.and_then(|v| v.raw)
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct FinancialData {
    current_price: Option<RawValue>,
    target_low_price: Option<RawValue>,
    target_mean_price: Option<RawValue>,
    target_median_price: Option<RawValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    fifty_two_week_low: Option<RawValue>,
    fifty_two_week_high: Option<RawValue>,
    currency: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct PriceModule {
    currency: Option<String>,
}

impl From<QuoteSummaryItem> for RawSummary {
    fn from(item: QuoteSummaryItem) -> Self {
        let financial = item.financial_data.unwrap_or_default();
        let detail = item.summary_detail.unwrap_or_default();
        let currency = detail
            .currency
            .or_else(|| item.price.and_then(|p| p.currency));

        RawSummary {
            currency,
            current_price: raw(financial.current_price),
            target_low_price: raw(financial.target_low_price),
            target_mean_price: raw(financial.target_mean_price),
            target_median_price: raw(financial.target_median_price),
            fifty_two_week_low: raw(detail.fifty_two_week_low),
            fifty_two_week_high: raw(detail.fifty_two_week_high),
            dividends: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    events: Option<ChartEvents>,
}

#[derive(Deserialize, Debug)]
struct ChartEvents {
    dividends: Option<HashMap<String, ChartDividend>>,
}

#[derive(Deserialize, Debug)]
struct ChartDividend {
    amount: f64,
    date: i64,
}

#[async_trait]
impl SummaryProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooSummaryFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_summary(&self, symbol: &str) -> Result<RawSummary, GatewayError> {
        let item = self
            .fetch_quote_summary(symbol)
            .await?
            .ok_or_else(|| GatewayError::TickerNotFound(symbol.to_string()))?;

        let mut summary = RawSummary::from(item);
        if summary.current_price.is_none() {
            return Err(GatewayError::TickerNotFound(symbol.to_string()));
        }

        summary.dividends = match self.fetch_dividends(symbol).await {
            Ok(dividends) => dividends,
            Err(e) => {
                warn!("Dividend history unavailable for {symbol}: {e}");
                Vec::new()
            }
        };

        Ok(summary)
    }
}
