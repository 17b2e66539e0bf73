//! # engine::ingest
//!
//! **Ingestion Runner** - 1 รอบ = ดึงราคาทุก ticker แล้วบันทึก + แจ้งเตือน
//!
//! ## Per-ticker flow
//! ```text
//! 1. PriceSource.fetch        (time-bounded → timeout = SourceUnavailable)
//! 2. compute_pct_change       (None ถ้า previous close หาย/เป็น 0)
//! 3. PriceStore.append        (StorageError → ticker นี้ fail, ไม่ evaluate alert)
//! 4. AlertEvaluator.evaluate
//! 5. Notifier.send            (fail → log แล้วไปต่อ)
//! ```
//!
//! ticker แต่ละตัวเป็นอิสระต่อกัน: ตัวหนึ่งพัง ตัวอื่นยังทำงานต่อ
//! Workers run through `buffer_unordered`, but steps 1–5 for one ticker stay
//! inside one future and therefore stay ordered.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::engine::alert::AlertEvaluator;
use crate::error::{Result, StockwatchError};
use crate::models::NewObservation;
use crate::notifier::Notifier;
use crate::source::PriceSource;
use crate::store::PriceStore;

// ─── Settings ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Deadline for a single fetch.
    pub fetch_timeout: Duration,
    /// Pause after each ticker (except the last).
    pub fetch_delay:   Duration,
    /// Tickers processed at once (min 1).
    pub concurrency:   usize,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout,
            fetch_delay:   config.fetch_delay,
            concurrency:   config.concurrency,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            fetch_delay:   Duration::from_secs(1),
            concurrency:   1,
        }
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StoredTicker {
    pub ticker:         String,
    pub observation_id: i64,
    pub price:          f64,
    pub pct_change:     Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedTicker {
    pub ticker: String,
    /// `StockwatchError::kind()`
    pub kind:   &'static str,
    pub error:  String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiredAlert {
    pub ticker:     String,
    pub pct_change: f64,
    pub delivered:  bool,
    pub error:      Option<String>,
}

/// What happened in one cycle: who got stored, who failed and why, which
/// alerts fired. Entries follow the input ticker order.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id:    Uuid,
    pub started_at:  DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stored:      Vec<StoredTicker>,
    pub failed:      Vec<FailedTicker>,
    pub alerts:      Vec<FiredAlert>,
}

impl CycleReport {
    pub fn has_storage_failures(&self) -> bool {
        self.failed.iter().any(|f| f.kind == "storage")
    }
}

enum TickerOutcome {
    Stored(StoredTicker, Option<FiredAlert>),
    Failed(FailedTicker),
}

// ─── Runner ───────────────────────────────────────────────────────────────────

pub struct IngestionRunner {
    store:     PriceStore,
    source:    Arc<dyn PriceSource>,
    notifier:  Arc<dyn Notifier>,
    evaluator: AlertEvaluator,
    settings:  IngestSettings,
}

impl IngestionRunner {
    pub fn new(
        store:     PriceStore,
        source:    Arc<dyn PriceSource>,
        notifier:  Arc<dyn Notifier>,
        evaluator: AlertEvaluator,
        settings:  IngestSettings,
    ) -> Self {
        Self { store, source, notifier, evaluator, settings }
    }

    /// Runs one cycle over `tickers`. Never fails as a whole; per-ticker
    /// errors land in the report.
    pub async fn run_cycle(&self, tickers: &[String]) -> CycleReport {
        let cycle_id   = Uuid::new_v4();
        let started_at = Utc::now();
        let total      = tickers.len();

        info!(%cycle_id, tickers = total, "📥 Ingestion cycle starting...");

        let mut outcomes: Vec<(usize, TickerOutcome)> = stream::iter(tickers.iter().enumerate())
            .map(|(idx, ticker)| async move {
                let outcome = self.process_ticker(ticker).await;
                if idx + 1 < total && !self.settings.fetch_delay.is_zero() {
                    tokio::time::sleep(self.settings.fetch_delay).await;
                }
                (idx, outcome)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        outcomes.sort_by_key(|(idx, _)| *idx);

        let mut report = CycleReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            stored:      Vec::new(),
            failed:      Vec::new(),
            alerts:      Vec::new(),
        };

        for (_, outcome) in outcomes {
            match outcome {
                TickerOutcome::Stored(stored, alert) => {
                    report.stored.push(stored);
                    report.alerts.extend(alert);
                }
                TickerOutcome::Failed(failed) => report.failed.push(failed),
            }
        }

        info!(
            %cycle_id,
            stored = report.stored.len(),
            failed = report.failed.len(),
            alerts = report.alerts.len(),
            "✅ Ingestion cycle finished"
        );

        report
    }

    async fn process_ticker(&self, ticker: &str) -> TickerOutcome {
        match self.ingest_one(ticker).await {
            Ok((stored, alert)) => TickerOutcome::Stored(stored, alert),
            Err(e) => {
                if e.is_storage() {
                    error!(ticker, error = %e, "❌ Failed to persist observation");
                } else {
                    warn!(ticker, error = %e, "⚠️ Skipping ticker this cycle");
                }
                TickerOutcome::Failed(FailedTicker {
                    ticker: ticker.to_string(),
                    kind:   e.kind(),
                    error:  e.to_string(),
                })
            }
        }
    }

    async fn ingest_one(&self, ticker: &str) -> Result<(StoredTicker, Option<FiredAlert>)> {
        // ── 1. Fetch (time-bounded) ───────────────────────────────────────────
        let snapshot = tokio::time::timeout(self.settings.fetch_timeout, self.source.fetch(ticker))
            .await
            .map_err(|_| {
                StockwatchError::source_unavailable(
                    ticker,
                    format!("fetch timed out after {:?}", self.settings.fetch_timeout),
                )
            })??
            .validate(ticker)?;

        // ── 2. Compute + 3. Persist ───────────────────────────────────────────
        let observation = NewObservation::from_snapshot(ticker, Utc::now(), &snapshot);
        if observation.pct_change.is_none() {
            debug!(ticker, previous_close = ?snapshot.previous_close, "pct_change unknown (no usable previous close)");
        }

        let observation_id = self.store.append_observation(&observation).await?;

        info!(
            ticker,
            price      = observation.price,
            pct_change = ?observation.pct_change,
            volume     = ?observation.volume,
            "💾 Observation stored"
        );

        let stored = StoredTicker {
            ticker: ticker.to_string(),
            observation_id,
            price:      observation.price,
            pct_change: observation.pct_change,
        };

        // ── 4. Evaluate + 5. Notify ───────────────────────────────────────────
        let Some(alert) = self.evaluator.evaluate(
            ticker,
            observation.pct_change,
            observation.price,
            observation.previous_close,
            Utc::now(),
        ) else {
            return Ok((stored, None));
        };

        warn!(
            ticker,
            pct_change = alert.pct_change,
            threshold  = self.evaluator.threshold(),
            "🚨 Alert threshold crossed"
        );

        let fired = match self.notifier.send(&alert.subject(), &alert.body()).await {
            Ok(()) => FiredAlert {
                ticker:     ticker.to_string(),
                pct_change: alert.pct_change,
                delivered:  true,
                error:      None,
            },
            Err(e) => {
                error!(ticker, error = %e, "📭 Alert delivery failed - continuing");
                FiredAlert {
                    ticker:     ticker.to_string(),
                    pct_change: alert.pct_change,
                    delivered:  false,
                    error:      Some(e.to_string()),
                }
            }
        };

        Ok((stored, Some(fired)))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
