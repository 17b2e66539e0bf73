//! # models::snapshot
//!
//! [`PriceSnapshot`] - ค่าที่ `PriceSource` คืนมา หลัง normalise แล้ว
//!
//! Provider responses are messy (optional fields, NaN, negative volumes).
//! Everything is checked in [`PriceSnapshot::validate`] at the source boundary
//! so the rest of the pipeline can trust the values.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StockwatchError};

/// One normalised quote for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Latest traded price. Must be finite and positive after validation.
    pub price:          f64,
    /// Reference close the move is measured against.
    pub previous_close: Option<f64>,
    pub volume:         Option<i64>,
    /// Provider metadata, kept verbatim for audit.
    #[serde(default)]
    pub raw:            serde_json::Value,
}

impl PriceSnapshot {
    pub fn new(price: f64, previous_close: Option<f64>, volume: Option<i64>) -> Self {
        Self {
            price,
            previous_close,
            volume,
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    /// Rejects snapshots without a usable price and scrubs the optional
    /// fields: non-finite previous close and negative volume become absent.
    pub fn validate(mut self, ticker: &str) -> Result<Self> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(StockwatchError::source_unavailable(
                ticker,
                format!("invalid price {}", self.price),
            ));
        }

        if self.previous_close.is_some_and(|p| !p.is_finite()) {
            self.previous_close = None;
        }
        if self.volume.is_some_and(|v| v < 0) {
            self.volume = None;
        }

        Ok(self)
    }
}
