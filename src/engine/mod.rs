//! Pipeline engines: change metric, alert decision, ingestion and rollups.

pub mod alert;
pub mod change;
pub mod ingest;
pub mod summary;

pub use alert::{Alert, AlertEvaluator};
pub use change::compute_pct_change;
pub use ingest::{CycleReport, IngestSettings, IngestionRunner};
pub use summary::{compute_window_summary, SummaryAggregator, SummaryReport, TickerSelection};
