//! # state
//!
//! Shared state ของ Dashboard API - มีแค่ handle ไปยัง store (read-only usage)

use std::sync::Arc;

use crate::store::PriceStore;

/// Default / max look-back for the price series endpoint (hours).
pub const DEFAULT_SERIES_HOURS: i64 = 24;
pub const MAX_SERIES_HOURS:     i64 = 48;

/// Top-level shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub store: PriceStore,
}

impl AppState {
    pub fn new(store: PriceStore) -> Self {
        Self { store }
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(store: PriceStore) -> SharedState {
    Arc::new(AppState::new(store))
}
