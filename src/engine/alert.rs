//! # engine::alert
//!
//! **Alert Evaluator** - stateless threshold check
//!
//! ```text
//! pct_change = None            → no alert
//! |pct_change| >= threshold    → Alert (ขึ้นแรง หรือ ลงแรง ก็ยิงเหมือนกัน)
//! otherwise                    → no alert
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// Default alert threshold in percent.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Payload handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub ticker:         String,
    pub pct_change:     f64,
    pub price:          f64,
    pub previous_close: Option<f64>,
    pub evaluated_at:   DateTime<Utc>,
}

impl Alert {
    pub fn subject(&self) -> String {
        format!("ALERT {}: {:.2}% move", self.ticker, self.pct_change)
    }

    pub fn body(&self) -> String {
        let prev = self
            .previous_close
            .map(|p| p.to_string())
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "{ticker} moved {pct:.2}% vs previous close.\nPrice: {price}\nPrev Close: {prev}\nTime: {time} UTC",
            ticker = self.ticker,
            pct    = self.pct_change,
            price  = self.price,
            time   = self.evaluated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlertEvaluator {
    threshold: f64,
}

impl AlertEvaluator {
    /// Negative or NaN thresholds are clamped to zero.
    pub fn new(threshold: f64) -> Self {
        Self { threshold: threshold.max(0.0) }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn evaluate(
        &self,
        ticker:         &str,
        pct_change:     Option<f64>,
        price:          f64,
        previous_close: Option<f64>,
        now:            DateTime<Utc>,
    ) -> Option<Alert> {
        let pct = pct_change?;
        if pct.abs() < self.threshold {
            return None;
        }

        Some(Alert {
            ticker: ticker.to_string(),
            pct_change: pct,
            price,
            previous_close,
            evaluated_at: now,
        })
    }
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
