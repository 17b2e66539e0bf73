//! # models::observation
//!
//! [`PriceObservation`] - 1 แถวใน ledger `prices` (append-only, ไม่มีการแก้ไข)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::change::compute_pct_change;
use crate::models::PriceSnapshot;

/// A row about to be appended. `pct_change` is derived from the same row's
/// price and previous close when the value is built.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    pub ticker:         String,
    pub observed_at:    DateTime<Utc>,
    pub price:          f64,
    pub previous_close: Option<f64>,
    pub pct_change:     Option<f64>,
    pub volume:         Option<i64>,
    pub raw:            serde_json::Value,
}

impl NewObservation {
    pub fn from_snapshot(ticker: &str, observed_at: DateTime<Utc>, snapshot: &PriceSnapshot) -> Self {
        Self {
            ticker:         ticker.to_string(),
            observed_at,
            price:          snapshot.price,
            previous_close: snapshot.previous_close,
            pct_change:     compute_pct_change(snapshot.price, snapshot.previous_close),
            volume:         snapshot.volume,
            raw:            snapshot.raw.clone(),
        }
    }
}

/// A stored observation as read back from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id:             i64,
    pub ticker:         String,
    #[serde(rename = "fetched_at")]
    pub observed_at:    DateTime<Utc>,
    pub price:          f64,
    pub previous_close: Option<f64>,
    pub pct_change:     Option<f64>,
    pub volume:         Option<i64>,
    pub raw:            serde_json::Value,
}
