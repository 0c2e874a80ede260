//! Equity quote and candle fetches, with the required-field hard gate.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use wheel_scan_core::{Candle, ScanError};

use crate::cache::CacheStore;
use crate::transport::{fetch_cached, ProviderTransport};

/// Equity quote with every field the stage-1 gate requires.
#[derive(Debug, Clone)]
pub struct EquityQuote {
    pub symbol: String,
    pub price: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volume: u64,
    pub quote_date: NaiveDate,
    pub iv_rank: f64,
}

/// Cached access to equity-side provider endpoints.
pub struct MarketDataClient {
    transport: Arc<dyn ProviderTransport>,
    cache: Arc<CacheStore>,
}

impl MarketDataClient {
    #[must_use]
    pub fn new(transport: Arc<dyn ProviderTransport>, cache: Arc<CacheStore>) -> Self {
        Self { transport, cache }
    }

    /// Fetches the equity quote and enforces the required-field gate.
    ///
    /// # Errors
    ///
    /// `DataMissing` listing every absent required field (price, bid, ask,
    /// volume, quote_date, iv_rank); `DataStale` when the quote is older
    /// than one trading day; provider errors re-raised unchanged.
    pub async fn equity_quote(&self, symbol: &str, today: NaiveDate) -> Result<EquityQuote, ScanError> {
        let params = vec![("symbol".to_string(), symbol.to_uppercase())];
        let body =
            fetch_cached(&*self.transport, &self.cache, "stocks/quotes", symbol, &params).await?;
        let iv_body =
            fetch_cached(&*self.transport, &self.cache, "stocks/iv_rank", symbol, &params).await?;

        let price = json_decimal(&body, "price");
        let bid = json_decimal(&body, "bid");
        let ask = json_decimal(&body, "ask");
        let volume = body.get("volume").and_then(serde_json::Value::as_u64);
        let quote_date = json_date(&body, "quote_date");
        let iv_rank = iv_body.get("iv_rank").and_then(serde_json::Value::as_f64);

        let mut missing = Vec::new();
        if price.is_none() {
            missing.push("price");
        }
        if bid.is_none() {
            missing.push("bid");
        }
        if ask.is_none() {
            missing.push("ask");
        }
        if volume.is_none() {
            missing.push("volume");
        }
        if quote_date.is_none() {
            missing.push("quote_date");
        }
        if iv_rank.is_none() {
            missing.push("iv_rank");
        }
        if !missing.is_empty() {
            return Err(ScanError::DataMissing(format!(
                "{symbol}: {}",
                missing.join(", ")
            )));
        }

        let quote_date = quote_date.unwrap_or(today);
        if quote_date < previous_trading_day(today) {
            return Err(ScanError::DataStale(format!(
                "{symbol}: quote dated {quote_date}, today {today}"
            )));
        }

        Ok(EquityQuote {
            symbol: symbol.to_uppercase(),
            price: price.unwrap_or_default(),
            bid: bid.unwrap_or_default(),
            ask: ask.unwrap_or_default(),
            volume: volume.unwrap_or_default(),
            quote_date,
            iv_rank: iv_rank.unwrap_or_default(),
        })
    }

    /// Fetches the daily candle history, ascending by timestamp.
    ///
    /// # Errors
    ///
    /// Provider errors re-raised unchanged; malformed bars are skipped.
    pub async fn candles(&self, symbol: &str, lookback_days: u32) -> Result<Vec<Candle>, ScanError> {
        let params = vec![
            ("symbol".to_string(), symbol.to_uppercase()),
            ("days".to_string(), lookback_days.to_string()),
        ];
        let body =
            fetch_cached(&*self.transport, &self.cache, "stocks/candles", symbol, &params).await?;

        let bars = body
            .get("candles")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut candles: Vec<Candle> = bars.iter().filter_map(parse_candle).collect();
        candles.sort_by_key(|c| c.ts);
        debug!(symbol, count = candles.len(), "fetched candles");
        Ok(candles)
    }

    /// Next scheduled earnings date, if the calendar has one.
    ///
    /// # Errors
    ///
    /// Provider errors re-raised unchanged.
    pub async fn next_earnings(&self, symbol: &str) -> Result<Option<NaiveDate>, ScanError> {
        let params = vec![("symbol".to_string(), symbol.to_uppercase())];
        let body = fetch_cached(
            &*self.transport,
            &self.cache,
            "calendar/earnings",
            symbol,
            &params,
        )
        .await?;
        Ok(json_date(&body, "next_earnings"))
    }
}

fn parse_candle(v: &serde_json::Value) -> Option<Candle> {
    Some(Candle {
        ts: v
            .get("t")
            .and_then(serde_json::Value::as_i64)
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))?,
        open: v.get("o").and_then(serde_json::Value::as_f64)?,
        high: v.get("h").and_then(serde_json::Value::as_f64)?,
        low: v.get("l").and_then(serde_json::Value::as_f64)?,
        close: v.get("c").and_then(serde_json::Value::as_f64)?,
        volume: v.get("v").and_then(serde_json::Value::as_f64)?,
    })
}

fn json_decimal(body: &serde_json::Value, field: &str) -> Option<Decimal> {
    let v = body.get(field)?;
    if let Some(f) = v.as_f64() {
        return Decimal::from_f64(f);
    }
    v.as_str().and_then(|s| s.parse().ok())
}

fn json_date(body: &serde_json::Value, field: &str) -> Option<NaiveDate> {
    body.get(field)
        .and_then(serde_json::Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

/// Previous trading day: weekends skipped (holidays handled by staleness
/// tolerance upstream).
#[must_use]
pub fn previous_trading_day(d: NaiveDate) -> NaiveDate {
    let mut day = d - Duration::days(1);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day -= Duration::days(1);
    }
    day
}
