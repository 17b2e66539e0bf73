//! # store - SQLite Price Ledger
//!
//! ใช้ `sqlx` (SQLite) - เจ้าของตาราง `prices` และ `summary_24h` แต่เพียงผู้เดียว
//! component อื่นเข้าถึงข้อมูลผ่าน [`PriceStore`] เท่านั้น
//!
//! ## Tables
//! ```text
//! prices(id, ticker, fetched_at, price, previous_close, pct_change, volume, raw_json)
//! summary_24h(ticker PK, first_price, last_price, min_price, max_price,
//!             avg_price, pct_change_24h, last_updated)
//! ```
//!
//! Timestamps are stored as fixed-width RFC 3339 text
//! (`2024-03-01T14:30:00.000000Z`) so string order == time order and the
//! `fetched_at >= ?` range scan is correct.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{NewObservation, PriceObservation, TickerSummary};

// ─── Schema ───────────────────────────────────────────────────────────────────

const CREATE_PRICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prices (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  ticker TEXT NOT NULL,
  fetched_at TIMESTAMP NOT NULL,
  price REAL NOT NULL,
  previous_close REAL,
  pct_change REAL,
  volume INTEGER,
  raw_json TEXT
)
"#;

const CREATE_SUMMARY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS summary_24h (
  ticker TEXT PRIMARY KEY,
  first_price REAL,
  last_price REAL,
  min_price REAL,
  max_price REAL,
  avg_price REAL,
  pct_change_24h REAL,
  last_updated TIMESTAMP
)
"#;

const CREATE_PRICES_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_prices_ticker_fetched_at ON prices (ticker, fetched_at)";

// ─── Timestamp encoding ───────────────────────────────────────────────────────

pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub(crate) fn decode_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(format!("bad timestamp '{raw}': {e}").into()).into())
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// Handle to the ledger. Cloning is cheap (shares the pool), so each
/// worker / handler gets its own copy.
#[derive(Debug, Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Opens (creating if missing) the SQLite file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Opening SQLite price store...");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection that never expires,
    /// otherwise the data would vanish with it.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Creates both tables (and the range-scan index) when absent.
    /// Never touches existing rows; safe on every startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for ddl in [CREATE_PRICES_TABLE, CREATE_SUMMARY_TABLE, CREATE_PRICES_INDEX] {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!("✅ Schema ensured (prices, summary_24h)");
        Ok(())
    }

    // ─── Observations ─────────────────────────────────────────────────────────

    /// Appends one row and returns its id.
    pub async fn append_observation(&self, obs: &NewObservation) -> Result<i64> {
        let raw_json = serde_json::to_string(&obs.raw)?;

        let result = sqlx::query(
            r#"
            INSERT INTO prices
              (ticker, fetched_at, price, previous_close, pct_change, volume, raw_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&obs.ticker)
        .bind(encode_ts(&obs.observed_at))
        .bind(obs.price)
        .bind(obs.previous_close)
        .bind(obs.pct_change)
        .bind(obs.volume)
        .bind(raw_json)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Observations for `ticker` with `fetched_at >= since`, oldest first.
    /// Duplicate timestamps keep insertion order.
    pub async fn query_observations(
        &self,
        ticker: &str,
        since:  DateTime<Utc>,
    ) -> Result<Vec<PriceObservation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, ticker, fetched_at, price, previous_close, pct_change, volume, raw_json
            FROM prices
            WHERE ticker = ? AND fetched_at >= ?
            ORDER BY fetched_at ASC, id ASC
            "#,
        )
        .bind(ticker)
        .bind(encode_ts(&since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(observation_from_row).collect()
    }

    /// Every ticker that has at least one observation, sorted.
    pub async fn list_distinct_tickers(&self) -> Result<Vec<String>> {
        let tickers = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT ticker FROM prices ORDER BY ticker",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tickers)
    }

    // ─── Summary ──────────────────────────────────────────────────────────────

    /// Insert-or-replace keyed by ticker, in one statement.
    ///
    /// If the stored row has a newer `last_updated` than `summary`, the
    /// upsert does **not** replace it: the stored row is kept unchanged and
    /// `false` is returned. An equal or newer `summary` overwrites every
    /// column. Returns `true` when the row was written.
    pub async fn upsert_summary(&self, summary: &TickerSummary) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO summary_24h
              (ticker, first_price, last_price, min_price, max_price,
               avg_price, pct_change_24h, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ticker) DO UPDATE SET
              first_price    = excluded.first_price,
              last_price     = excluded.last_price,
              min_price      = excluded.min_price,
              max_price      = excluded.max_price,
              avg_price      = excluded.avg_price,
              pct_change_24h = excluded.pct_change_24h,
              last_updated   = excluded.last_updated
            WHERE summary_24h.last_updated IS NULL
               OR excluded.last_updated >= summary_24h.last_updated
            "#,
        )
        .bind(&summary.ticker)
        .bind(summary.first_price)
        .bind(summary.last_price)
        .bind(summary.min_price)
        .bind(summary.max_price)
        .bind(summary.avg_price)
        .bind(summary.pct_change_24h)
        .bind(encode_ts(&summary.last_updated))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn read_all_summaries(&self) -> Result<Vec<TickerSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT ticker, first_price, last_price, min_price, max_price,
                   avg_price, pct_change_24h, last_updated
            FROM summary_24h
            ORDER BY ticker
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ─── Row Mapping ──────────────────────────────────────────────────────────────

fn observation_from_row(row: &SqliteRow) -> Result<PriceObservation> {
    let fetched_at: String       = row.try_get("fetched_at")?;
    let raw_json: Option<String> = row.try_get("raw_json")?;

    let raw = match raw_json {
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| sqlx::Error::Decode(format!("bad raw_json: {e}").into()))?,
        None => serde_json::Value::Null,
    };

    Ok(PriceObservation {
        id:             row.try_get("id")?,
        ticker:         row.try_get("ticker")?,
        observed_at:    decode_ts(&fetched_at)?,
        price:          row.try_get("price")?,
        previous_close: row.try_get("previous_close")?,
        pct_change:     row.try_get("pct_change")?,
        volume:         row.try_get("volume")?,
        raw,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<TickerSummary> {
    let last_updated: String = row.try_get("last_updated")?;

    Ok(TickerSummary {
        ticker:         row.try_get("ticker")?,
        first_price:    row.try_get("first_price")?,
        last_price:     row.try_get("last_price")?,
        min_price:      row.try_get("min_price")?,
        max_price:      row.try_get("max_price")?,
        avg_price:      row.try_get("avg_price")?,
        pct_change_24h: row.try_get("pct_change_24h")?,
        last_updated:   decode_ts(&last_updated)?,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
