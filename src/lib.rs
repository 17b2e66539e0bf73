//! # stockwatch - equity price sampler
//!
//! ```text
//!  ┌─────────────┐ fetch  ┌──────────────────┐ append  ┌──────────────┐
//!  │ PriceSource │ ─────▶ │ IngestionRunner  │ ──────▶ │  PriceStore  │
//!  └─────────────┘        │  ├─ pct_change   │         │  (SQLite)    │
//!                         │  └─ AlertEval ───┼──▶ Notifier          │
//!                         └──────────────────┘         │  prices      │
//!  ┌───────────────────┐  read window / upsert         │  summary_24h │
//!  │ SummaryAggregator │ ◀───────────────────────────▶ │              │
//!  └───────────────────┘                               └──────┬───────┘
//!  ┌───────────────────┐  GET /api/*  (read-only)             │
//!  │ Dashboard API     │ ◀────────────────────────────────────┘
//!  └───────────────────┘
//! ```
//!
//! Each cycle is a run-to-completion batch; scheduling is left to cron (or
//! the `--every` flag of the binary).

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod source;
pub mod state;
pub mod store;

pub use error::{Result, StockwatchError};
