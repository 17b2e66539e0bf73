//! # engine::summary
//!
//! **Summary Aggregator** - คำนวณ rollup ย้อนหลัง 24 ชม. ใหม่ทั้งก้อนทุกรอบ
//!
//! ```text
//! for ticker in (distinct tickers | configured list):
//!     window = observations where fetched_at >= now - 24h
//!     empty  → skip (แถวเดิมใน summary_24h ถูกปล่อยไว้ = stale)
//!     else   → first/last/min/max/avg + pct_change_24h → upsert
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::engine::change::compute_pct_change;
use crate::error::{Result, StockwatchError};
use crate::models::{PriceObservation, TickerSummary};
use crate::store::PriceStore;

/// Which tickers a cycle covers.
#[derive(Debug, Clone)]
pub enum TickerSelection {
    /// Everything ever observed.
    AllObserved,
    Configured(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryReport {
    pub updated:   Vec<TickerSummary>,
    /// Empty window - no write, previous row (if any) left as is.
    pub skipped:   Vec<String>,
    /// A newer summary was already stored.
    pub unchanged: Vec<String>,
    pub failed:    Vec<(String, String)>,
}

/// Rollup of one window. `observations` must be in time order (as returned
/// by `PriceStore::query_observations`). `None` for an empty window.
pub fn compute_window_summary(
    ticker:       &str,
    observations: &[PriceObservation],
    now:          DateTime<Utc>,
) -> Option<TickerSummary> {
    let first = observations.first()?.price;
    let last  = observations.last()?.price;

    let (min, max, sum) = observations.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), o| (min.min(o.price), max.max(o.price), sum + o.price),
    );

    Some(TickerSummary {
        ticker:         ticker.to_string(),
        first_price:    first,
        last_price:     last,
        min_price:      min,
        max_price:      max,
        avg_price:      sum / observations.len() as f64,
        pct_change_24h: compute_pct_change(last, Some(first)),
        last_updated:   now,
    })
}

pub struct SummaryAggregator {
    store:     PriceStore,
    window:    chrono::Duration,
    selection: TickerSelection,
}

impl SummaryAggregator {
    pub fn new(store: PriceStore, window: chrono::Duration, selection: TickerSelection) -> Self {
        Self { store, window, selection }
    }

    pub async fn run_cycle(&self) -> Result<SummaryReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// One aggregation pass with `now` as the window end. Only a failure to
    /// list tickers, or a window reaching before the earliest timestamp,
    /// aborts the pass.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<SummaryReport> {
        let tickers = match &self.selection {
            TickerSelection::AllObserved      => self.store.list_distinct_tickers().await?,
            TickerSelection::Configured(list) => list.clone(),
        };

        let since = now.checked_sub_signed(self.window).ok_or_else(|| {
            StockwatchError::Config(format!("summary window of {}h reaches past the earliest timestamp", self.window.num_hours()))
        })?;

        let mut report = SummaryReport::default();

        for ticker in tickers {
            match self.summarise_one(&ticker, since, now).await {
                Ok(Some((summary, true))) => {
                    info!(
                        "{}: {:.2} -> {:.2} ({})",
                        ticker,
                        summary.first_price,
                        summary.last_price,
                        summary
                            .pct_change_24h
                            .map(|p| format!("{p:.2}%"))
                            .unwrap_or_else(|| "n/a".to_string()),
                    );
                    report.updated.push(summary);
                }
                Ok(Some((_, false))) => {
                    info!(ticker = %ticker, "newer summary already stored - left unchanged");
                    report.unchanged.push(ticker);
                }
                Ok(None) => {
                    info!("{ticker}: no data in last {}h", self.window.num_hours());
                    report.skipped.push(ticker);
                }
                Err(e) => {
                    error!(ticker = %ticker, error = %e, "❌ Summary failed");
                    report.failed.push((ticker, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    async fn summarise_one(
        &self,
        ticker: &str,
        since:  DateTime<Utc>,
        now:    DateTime<Utc>,
    ) -> Result<Option<(TickerSummary, bool)>> {
        let window = self.store.query_observations(ticker, since).await?;
        let Some(summary) = compute_window_summary(ticker, &window, now) else {
            return Ok(None);
        };

        let written = self.store.upsert_summary(&summary).await?;
        Ok(Some((summary, written)))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
