//! Derivation of the per-ticker figures returned to callers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{DividendEvent, GatewayError, RawSummary};

/// Currency code Yahoo uses for prices quoted in pence sterling.
const PENCE_STERLING: &str = "GBp";

/// Per-ticker figures. Every field is `None` when the provider lacks it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerResult {
    pub current_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub target_median_price: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl TickerResult {
    /// Builds the result for `symbol`, rejecting summaries without a current price.
    pub fn from_summary(
        symbol: &str,
        raw: &RawSummary,
        now: DateTime<Utc>,
    ) -> Result<Self, GatewayError> {
        let currency = raw.currency.as_deref();
        let current_price = adjust_for_currency(raw.current_price, currency)
            .ok_or_else(|| GatewayError::TickerNotFound(symbol.to_string()))?;

        let yield_pct = dividend_yield(Some(current_price), &raw.dividends, currency, now);

        Ok(TickerResult {
            current_price: Some(round2(current_price)),
            target_low_price: adjust_for_currency(raw.target_low_price, currency).map(round2),
            target_mean_price: adjust_for_currency(raw.target_mean_price, currency).map(round2),
            target_median_price: adjust_for_currency(raw.target_median_price, currency)
                .map(round2),
            fifty_two_week_low: adjust_for_currency(raw.fifty_two_week_low, currency).map(round2),
            fifty_two_week_high: adjust_for_currency(raw.fifty_two_week_high, currency)
                .map(round2),
            dividend_yield: yield_pct.map(round2),
        })
    }
}

/// Converts prices quoted in pence to pounds; other currencies pass through.
pub fn adjust_for_currency(value: Option<f64>, currency: Option<&str>) -> Option<f64> {
    let value = value.filter(|v| v.is_finite())?;
    if currency == Some(PENCE_STERLING) {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

/// Annualized dividend yield in percent.
///
/// The payment frequency is estimated from the number of dividends paid in
/// the year before `now` and applied to the most recent amount. Returns
/// `None` without a usable price or any dividend paid by `now`, and `0.0`
/// when the history holds no payment from the last year.
pub fn dividend_yield(
    current_price: Option<f64>,
    dividends: &[DividendEvent],
    currency: Option<&str>,
    now: DateTime<Utc>,
) -> Option<f64> {
    let price = current_price.filter(|p| *p != 0.0 && p.is_finite())?;
    let paid: Vec<&DividendEvent> = dividends.iter().filter(|d| d.date <= now).collect();
    if paid.is_empty() {
        return None;
    }

    let one_year_ago = now - Duration::days(365);
    let recent: Vec<&DividendEvent> = paid
        .into_iter()
        .filter(|d| d.date > one_year_ago)
        .collect();

    let Some(latest) = recent.iter().max_by_key(|d| d.date) else {
        tracing::debug!("No dividends in the last year");
        return Some(0.0);
    };

    let payments_per_year = recent.len() as f64;
    let latest_amount = adjust_for_currency(Some(latest.amount), currency)?;
    Some(latest_amount * payments_per_year / price * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 16, 0, 0).unwrap()
    }

    fn dividend(amount: f64, days_ago: i64) -> DividendEvent {
        DividendEvent {
            amount,
            date: fixed_now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn test_single_recent_dividend_yield() {
        let dividends = vec![dividend(1.0, 10)];
        let result = dividend_yield(Some(100.0), &dividends, Some("USD"), fixed_now());
        assert_eq!(result, Some(1.0));
    }

    #[test]
    fn test_quarterly_dividend_yield_uses_latest_amount() {
        let dividends = vec![
            dividend(0.24, 280),
            dividend(0.24, 190),
            dividend(0.25, 100),
            dividend(0.26, 10),
            // Older than a year, ignored by the frequency estimate
            dividend(0.23, 370),
        ];
        let result = dividend_yield(Some(200.0), &dividends, Some("USD"), fixed_now()).unwrap();
        assert!((result - 0.52).abs() < 1e-9);
    }

    #[test]
    fn test_dividend_yield_absent_without_history_or_price() {
        let now = fixed_now();
        assert_eq!(dividend_yield(Some(100.0), &[], Some("USD"), now), None);
        assert_eq!(dividend_yield(None, &[dividend(1.0, 5)], Some("USD"), now), None);
        assert_eq!(dividend_yield(Some(0.0), &[dividend(1.0, 5)], Some("USD"), now), None);
    }

    #[test]
    fn test_stale_dividends_yield_zero() {
        let dividends = vec![dividend(0.5, 400), dividend(0.5, 500)];
        let result = dividend_yield(Some(50.0), &dividends, None, fixed_now());
        assert_eq!(result, Some(0.0));
    }

    #[test]
    fn test_only_future_dividends_yield_absent() {
        let announced = DividendEvent {
            amount: 0.5,
            date: fixed_now() + Duration::days(14),
        };
        let result = dividend_yield(Some(50.0), &[announced.clone()], None, fixed_now());
        assert_eq!(result, None);

        // An announced payment does not count towards the frequency
        let dividends = vec![dividend(0.4, 30), announced];
        let result = dividend_yield(Some(40.0), &dividends, None, fixed_now()).map(round2);
        assert_eq!(result, Some(1.0));
    }

    #[test]
    fn test_pence_adjustment() {
        assert_eq!(adjust_for_currency(Some(2550.0), Some("GBp")), Some(25.5));
        assert_eq!(adjust_for_currency(Some(25.5), Some("GBP")), Some(25.5));
        assert_eq!(adjust_for_currency(Some(25.5), None), Some(25.5));
        assert_eq!(adjust_for_currency(None, Some("GBp")), None);
        assert_eq!(adjust_for_currency(Some(f64::NAN), Some("USD")), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(1.235_000_1), 1.24);
        assert_eq!(round2(-2.5), -2.5);
    }

    #[test]
    fn test_from_summary_rounds_and_converts() {
        let raw = RawSummary {
            currency: Some("GBp".to_string()),
            current_price: Some(1234.567),
            target_low_price: Some(1000.0),
            target_mean_price: Some(1400.123),
            target_median_price: None,
            fifty_two_week_low: Some(900.0),
            fifty_two_week_high: Some(1500.0),
            dividends: vec![dividend(20.0, 30), dividend(15.0, 200)],
        };

        let result = TickerResult::from_summary("VOD.L", &raw, fixed_now()).unwrap();
        assert_eq!(result.current_price, Some(12.35));
        assert_eq!(result.target_low_price, Some(10.0));
        assert_eq!(result.target_mean_price, Some(14.0));
        assert_eq!(result.target_median_price, None);
        assert_eq!(result.fifty_two_week_low, Some(9.0));
        assert_eq!(result.fifty_two_week_high, Some(15.0));
        // 0.20 * 2 / 12.34567 * 100
        assert_eq!(result.dividend_yield, Some(3.24));
    }

    #[test]
    fn test_from_summary_without_price_is_not_found() {
        let raw = RawSummary {
            target_mean_price: Some(10.0),
            ..Default::default()
        };
        let err = TickerResult::from_summary("INVALID", &raw, fixed_now()).unwrap_err();
        assert_eq!(err.to_string(), "No valid data found for ticker 'INVALID'.");
    }
}
