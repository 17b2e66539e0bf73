//! Domain models shared across the whole stockwatch pipeline.

pub mod observation;
pub mod snapshot;
pub mod summary;

pub use observation::{NewObservation, PriceObservation};
pub use snapshot::PriceSnapshot;
pub use summary::TickerSummary;
