//! # source - Price Data Provider
//!
//! [`PriceSource`] คือ boundary ระหว่าง pipeline กับ provider ภายนอก
//! ทุก implementation ต้องคืน [`PriceSnapshot`] ที่ผ่าน `validate()` แล้ว
//! หรือ `StockwatchError::SourceUnavailable`
//!
//! ## YahooSource
//! `GET {base}/v8/finance/chart/{ticker}?interval=1m&range=1d`
//!
//! | Field            | Taken from                                            |
//! |------------------|-------------------------------------------------------|
//! | `price`          | last non-null 1m close → `meta.regularMarketPrice`    |
//! | `previous_close` | `meta.previousClose` → `meta.chartPreviousClose`      |
//! | `volume`         | last non-null 1m volume → `meta.regularMarketVolume`  |
//! | `raw`            | the whole `meta` object                               |

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, StockwatchError};
use crate::models::PriceSnapshot;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest snapshot for `ticker`, or `SourceUnavailable`.
    async fn fetch(&self, ticker: &str) -> Result<PriceSnapshot>;
}

// ─── Yahoo chart API ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error:  Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code:        Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta:       serde_json::Value,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close:  Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

pub struct YahooSource {
    client:   reqwest::Client,
    base_url: String,
    timeout:  Duration,
}

impl YahooSource {
    pub fn new(client: reqwest::Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl PriceSource for YahooSource {
    async fn fetch(&self, ticker: &str) -> Result<PriceSnapshot> {
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);
        debug!(ticker, url = %url, "Fetching quote...");

        let resp = self
            .client
            .get(&url)
            .query(&[("interval", "1m"), ("range", "1d")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| StockwatchError::source_unavailable(ticker, format!("provider unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StockwatchError::source_unavailable(
                ticker,
                format!("provider HTTP {status}: {body}"),
            ));
        }

        let envelope: ChartEnvelope = resp
            .json()
            .await
            .map_err(|e| StockwatchError::source_unavailable(ticker, format!("unparsable response: {e}")))?;

        snapshot_from_chart(ticker, envelope)
    }
}

/// Normalises a chart response into a validated snapshot.
fn snapshot_from_chart(ticker: &str, envelope: ChartEnvelope) -> Result<PriceSnapshot> {
    if let Some(err) = envelope.chart.error {
        return Err(StockwatchError::source_unavailable(
            ticker,
            format!(
                "provider error {}: {}",
                err.code.as_deref().unwrap_or("unknown"),
                err.description.as_deref().unwrap_or("no description"),
            ),
        ));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| StockwatchError::source_unavailable(ticker, "empty result"))?;

    let meta_f64 = |key: &str| result.meta.get(key).and_then(serde_json::Value::as_f64);

    let series = result.indicators.as_ref().and_then(|i| i.quote.first());
    let last_close  = series.and_then(|q| q.close.iter().rev().find_map(|c| *c));
    let last_volume = series.and_then(|q| q.volume.iter().rev().find_map(|v| *v));

    let price = last_close
        .or_else(|| meta_f64("regularMarketPrice"))
        .ok_or_else(|| StockwatchError::source_unavailable(ticker, "no price in response"))?;

    let previous_close = meta_f64("previousClose").or_else(|| meta_f64("chartPreviousClose"));

    let volume = last_volume.or_else(|| {
        result.meta.get("regularMarketVolume").and_then(serde_json::Value::as_i64)
    });

    PriceSnapshot::new(price, previous_close, volume)
        .with_raw(result.meta.clone())
        .validate(ticker)
}
