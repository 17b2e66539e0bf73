//! # stockwatch - CLI entry point
//!
//! | Command                      | What it does                                   |
//! |------------------------------|------------------------------------------------|
//! | `stockwatch ingest`          | 1 ingestion cycle (fetch → store → alert)      |
//! | `stockwatch ingest --every N`| repeat the cycle every N seconds               |
//! | `stockwatch summarize`       | recompute `summary_24h` from the ledger        |
//! | `stockwatch serve`           | read-only dashboard API on `BIND_ADDR`         |
//!
//! ## Environment Variables
//!
//! | Variable              | Default                           |
//! |-----------------------|-----------------------------------|
//! | `TICKERS`             | `AAPL,MSFT,GOOGL,AMZN,TSLA`       |
//! | `ALERT_THRESHOLD`     | `3.0`                             |
//! | `DB_PATH`             | `./stocks.db`                     |
//! | `PRICE_SOURCE_URL`    | `https://query1.finance.yahoo.com`|
//! | `EMAIL_SMTP_HOST` ... | unset → webhook, else the log     |
//! | `NOTIFY_WEBHOOK_URL`  | unset → alerts go to the log      |
//! | `BIND_ADDR`           | `0.0.0.0:8501`                    |
//! | `RUST_LOG`            | `stockwatch=debug`                |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stockwatch::{
    config::Config,
    engine::{AlertEvaluator, IngestSettings, IngestionRunner, SummaryAggregator, TickerSelection},
    notifier,
    routes,
    source::YahooSource,
    state::build_state,
    store::PriceStore,
};

#[derive(Parser, Debug)]
#[command(version, about = "Sample equity prices, keep 24h rollups, alert on big moves")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every configured ticker once, store it and raise alerts
    Ingest {
        /// Keep running, one cycle every SECS seconds
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },
    /// Recompute the trailing-window summary table
    Summarize {
        /// Only summarise the configured TICKERS instead of everything observed
        #[arg(long)]
        configured: bool,
    },
    /// Serve the read-only dashboard API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("stockwatch=debug".parse()?)
                .add_directive("sqlx=warn".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load config")?;

    // ── 3. Storage + schema (fatal if this fails) ─────────────────────────────
    let store = PriceStore::open(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;
    store.ensure_schema().await.context("Failed to create schema")?;

    match cli.command {
        Command::Ingest { every }          => ingest(&config, store, every).await,
        Command::Summarize { configured }  => summarize(&config, store, configured).await,
        Command::Serve                     => serve(&config, store).await,
    }
}

async fn ingest(config: &Config, store: PriceStore, every: Option<u64>) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let source = Arc::new(YahooSource::new(client.clone(), &config.source_url, config.fetch_timeout));
    let runner = IngestionRunner::new(
        store,
        source,
        notifier::from_config(&config.notifier, client).context("Failed to set up alert delivery")?,
        AlertEvaluator::new(config.alert_threshold),
        IngestSettings::from_config(config),
    );

    info!(
        tickers   = ?config.tickers,
        threshold = config.alert_threshold,
        every     = ?every,
        "Stockwatch ingestion started"
    );

    loop {
        let report = runner.run_cycle(&config.tickers).await;

        for failed in &report.failed {
            error!(ticker = %failed.ticker, kind = failed.kind, error = %failed.error, "Ticker failed");
        }
        for alert in &report.alerts {
            info!(ticker = %alert.ticker, pct_change = alert.pct_change, delivered = alert.delivered, "Alert fired");
        }

        match every {
            Some(secs) => {
                if report.has_storage_failures() {
                    error!(cycle_id = %report.cycle_id, "Storage errors this cycle - will retry next interval");
                }
                info!(interval_secs = secs, "💤 Sleeping until next cycle...");
                tokio::time::sleep(Duration::from_secs(secs)).await;
            }
            None => {
                if report.has_storage_failures() {
                    bail!("cycle {} had storage failures", report.cycle_id);
                }
                return Ok(());
            }
        }
    }
}

async fn summarize(config: &Config, store: PriceStore, configured: bool) -> anyhow::Result<()> {
    let selection = if configured {
        TickerSelection::Configured(config.tickers.clone())
    } else {
        TickerSelection::AllObserved
    };

    let aggregator = SummaryAggregator::new(store, config.summary_window, selection);
    let report = aggregator.run_cycle().await.context("Summary cycle failed")?;

    info!(
        updated   = report.updated.len(),
        skipped   = report.skipped.len(),
        unchanged = report.unchanged.len(),
        failed    = report.failed.len(),
        "📊 Summary cycle finished"
    );

    if !report.failed.is_empty() {
        bail!("{} ticker(s) failed to summarise", report.failed.len());
    }
    Ok(())
}

async fn serve(config: &Config, store: PriceStore) -> anyhow::Result<()> {
    let app = routes::router(build_state(store));

    info!(addr = ?config.bind_addr, "🚀 Dashboard API starting");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
