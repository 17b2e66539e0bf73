//! # routes::dashboard
//!
//! **Dashboard read contract** - endpoints สำหรับหน้า viewer (อ่านอย่างเดียว)
//!
//! ## Endpoints
//!
//! | Method | Path                          | Description                          |
//! |--------|-------------------------------|--------------------------------------|
//! | GET    | `/api/health`                 | liveness                             |
//! | GET    | `/api/tickers`                | distinct tickers ที่เคยบันทึก          |
//! | GET    | `/api/prices/:ticker?hours=N` | price series ย้อนหลัง N ชม. (1..=48)  |
//! | GET    | `/api/summary`                | ตาราง summary_24h ทั้งหมด              |

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{Result, StockwatchError},
    state::{SharedState, DEFAULT_SERIES_HOURS, MAX_SERIES_HOURS},
};

/// `hours` stays a raw string so a non-numeric value gets the JSON error
/// body instead of axum's plain-text rejection.
#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub hours: Option<String>,
}

fn parse_hours(raw: Option<&str>) -> Result<i64> {
    let hours = match raw.map(str::trim) {
        None | Some("") => DEFAULT_SERIES_HOURS,
        Some(raw) => raw
            .parse()
            .map_err(|_| StockwatchError::BadRequest(format!("hours must be an integer (got '{raw}')")))?,
    };

    if !(1..=MAX_SERIES_HOURS).contains(&hours) {
        return Err(StockwatchError::BadRequest(format!(
            "hours must be between 1 and {MAX_SERIES_HOURS} (got {hours})"
        )));
    }
    Ok(hours)
}

/// GET /api/health
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// GET /api/tickers
pub async fn list_tickers(State(state): State<SharedState>) -> Result<impl IntoResponse> {
    let tickers = state.store.list_distinct_tickers().await?;
    Ok(Json(json!({
        "ok":      true,
        "count":   tickers.len(),
        "tickers": tickers,
    })))
}

/// GET /api/prices/:ticker?hours=N
pub async fn price_series(
    State(state): State<SharedState>,
    Path(ticker): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> Result<impl IntoResponse> {
    let hours = parse_hours(query.hours.as_deref())?;

    let ticker = ticker.trim().to_uppercase();
    let since = Utc::now() - Duration::hours(hours);
    let observations = state.store.query_observations(&ticker, since).await?;

    Ok(Json(json!({
        "ok":           true,
        "ticker":       ticker,
        "hours":        hours,
        "count":        observations.len(),
        "observations": observations,
    })))
}

/// GET /api/summary
pub async fn summary_table(State(state): State<SharedState>) -> Result<impl IntoResponse> {
    let summaries = state.store.read_all_summaries().await?;
    Ok(Json(json!({
        "ok":      true,
        "count":   summaries.len(),
        "summary": summaries,
    })))
}
