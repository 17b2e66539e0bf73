//! # models::summary
//!
//! [`TickerSummary`] - rollup 24 ชั่วโมงล่าสุด (1 แถวต่อ ticker ใน `summary_24h`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker:         String,
    pub first_price:    f64,
    pub last_price:     f64,
    pub min_price:      f64,
    pub max_price:      f64,
    pub avg_price:      f64,
    /// `None` when `first_price` is zero.
    pub pct_change_24h: Option<f64>,
    pub last_updated:   DateTime<Utc>,
}
