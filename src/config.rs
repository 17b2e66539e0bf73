//! # config - อ่าน Config จาก Environment Variables
//!
//! ทุก component รับ `Config` (หรือค่าที่ดึงออกมาจากมัน) ตอนสร้าง;
//! ไม่มี global state. `.env` ถูกโหลดโดย `main` ผ่าน `dotenvy` ก่อนเรียก
//! [`Config::from_env`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};

const DEFAULT_TICKERS:    &str = "AAPL,MSFT,GOOGL,AMZN,TSLA";
const DEFAULT_SOURCE_URL: &str = "https://query1.finance.yahoo.com";

const DEFAULT_SMTP_PORT: u16 = 587;

/// SMTP relay (STARTTLS). Login happens only when both user and pass are set.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from:      String,
    pub to:        String,
    pub user:      Option<String>,
    pub pass:      Option<String>,
}

/// Where alerts go: email first, then webhook, otherwise the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotifierConfig {
    pub email:         Option<EmailConfig>,
    /// `EMAIL_*` variables that were set while host/from/to are incomplete.
    pub email_partial: Vec<&'static str>,
    pub webhook_url:   Option<String>,
    pub webhook_token: Option<String>,
}

/// Config ทั้งหมดที่ stockwatch ต้องการ
#[derive(Debug, Clone)]
pub struct Config {
    /// Symbols ที่จะดึงราคา (upper-case, trimmed)
    pub tickers:          Vec<String>,
    /// |pct_change| >= threshold → alert (percent)
    pub alert_threshold:  f64,
    /// SQLite file
    pub db_path:          PathBuf,
    /// Base URL ของ quote provider
    pub source_url:       String,
    /// Deadline ต่อ 1 fetch - เกินแล้วถือว่า ticker นั้น fail
    pub fetch_timeout:    Duration,
    /// พักหลัง fetch แต่ละ ticker
    pub fetch_delay:      Duration,
    /// จำนวน ticker ที่ทำพร้อมกันได้
    pub concurrency:      usize,
    /// ความยาว rolling window ของ summary
    pub summary_window:   chrono::Duration,
    pub notifier:         NotifierConfig,
    /// Dashboard API bind address
    pub bind_addr:        SocketAddr,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tickers = parse_tickers(&var("TICKERS").unwrap_or_else(|| DEFAULT_TICKERS.to_string()));
        if tickers.is_empty() {
            bail!("TICKERS must contain at least one symbol");
        }

        let alert_threshold: f64 = var("ALERT_THRESHOLD")
            .unwrap_or_else(|| "3.0".to_string())
            .trim()
            .parse()
            .context("ALERT_THRESHOLD must be a number")?;
        if !alert_threshold.is_finite() || alert_threshold < 0.0 {
            bail!("ALERT_THRESHOLD must be a finite, non-negative percent (got {alert_threshold})");
        }

        let fetch_timeout_secs: u64 = parse_or(&var, "FETCH_TIMEOUT_SECS", 10)?;
        if fetch_timeout_secs == 0 {
            bail!("FETCH_TIMEOUT_SECS must be greater than zero");
        }

        let concurrency: usize = parse_or(&var, "INGEST_CONCURRENCY", 1)?;
        if concurrency == 0 {
            bail!("INGEST_CONCURRENCY must be at least 1");
        }

        let window_hours: i64 = parse_or(&var, "SUMMARY_WINDOW_HOURS", 24)?;
        let summary_window = summary_window(window_hours, Utc::now())?;

        let bind_addr: SocketAddr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8501".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address, e.g. 0.0.0.0:8501")?;

        Ok(Self {
            tickers,
            alert_threshold,
            db_path:        PathBuf::from(var("DB_PATH").unwrap_or_else(|| "./stocks.db".to_string())),
            source_url:     var("PRICE_SOURCE_URL")
                .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            fetch_timeout:  Duration::from_secs(fetch_timeout_secs),
            fetch_delay:    Duration::from_millis(parse_or(&var, "FETCH_DELAY_MS", 1000)?),
            concurrency,
            summary_window,
            notifier:       notifier_config(&var)?,
            bind_addr,
        })
    }
}

/// Window must be positive and `now - window` must stay a representable
/// timestamp, otherwise the summary cycle could not compute its range.
fn summary_window(hours: i64, now: DateTime<Utc>) -> anyhow::Result<chrono::Duration> {
    if hours <= 0 {
        bail!("SUMMARY_WINDOW_HOURS must be greater than zero");
    }
    match chrono::Duration::try_hours(hours) {
        Some(window) if now.checked_sub_signed(window).is_some() => Ok(window),
        _ => bail!("SUMMARY_WINDOW_HOURS is too large (got {hours})"),
    }
}

fn notifier_config<F>(var: &F) -> anyhow::Result<NotifierConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let smtp_port: u16 = parse_or(var, "EMAIL_SMTP_PORT", DEFAULT_SMTP_PORT)?;

    let email = match (var("EMAIL_SMTP_HOST"), var("EMAIL_FROM"), var("EMAIL_TO")) {
        (Some(smtp_host), Some(from), Some(to)) => Some(EmailConfig {
            smtp_host: smtp_host.trim().to_string(),
            smtp_port,
            from:      from.trim().to_string(),
            to:        to.trim().to_string(),
            user:      var("EMAIL_USER"),
            pass:      var("EMAIL_PASS"),
        }),
        _ => None,
    };

    let email_partial = if email.is_none() {
        ["EMAIL_SMTP_HOST", "EMAIL_FROM", "EMAIL_TO"]
            .into_iter()
            .filter(|&key| var(key).is_some())
            .collect()
    } else {
        Vec::new()
    };

    Ok(NotifierConfig {
        email,
        email_partial,
        webhook_url:   var("NOTIFY_WEBHOOK_URL"),
        webhook_token: var("NOTIFY_WEBHOOK_TOKEN"),
    })
}

/// `" aapl, msft ,,tsla"` → `["AAPL", "MSFT", "TSLA"]`
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a valid number (got '{raw}')")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_without_env_vars() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.tickers, vec!["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA"]);
        assert_eq!(config.alert_threshold, 3.0);
        assert_eq!(config.db_path, PathBuf::from("./stocks.db"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch_delay, Duration::from_millis(1000));
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.summary_window, chrono::Duration::hours(24));
        assert_eq!(config.notifier, NotifierConfig::default());
    }

    #[test]
    fn tickers_are_normalised() {
        let config = config_with(&[("TICKERS", " aapl, msft ,,tsla ")]).unwrap();
        assert_eq!(config.tickers, vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn rejects_empty_ticker_list() {
        let err = config_with(&[("TICKERS", " , ,")]).unwrap_err();
        assert!(err.to_string().contains("TICKERS"));
    }

    #[test]
    fn rejects_negative_threshold() {
        let err = config_with(&[("ALERT_THRESHOLD", "-1")]).unwrap_err();
        assert!(err.to_string().contains("ALERT_THRESHOLD"));
    }

    #[test]
    fn rejects_non_numeric_threshold() {
        assert!(config_with(&[("ALERT_THRESHOLD", "abc")]).is_err());
        assert!(config_with(&[("ALERT_THRESHOLD", "NaN")]).is_err());
    }

    #[test]
    fn zero_threshold_is_allowed() {
        let config = config_with(&[("ALERT_THRESHOLD", "0")]).unwrap();
        assert_eq!(config.alert_threshold, 0.0);
    }

    #[test]
    fn webhook_settings_are_read() {
        let config = config_with(&[
            ("NOTIFY_WEBHOOK_URL", "https://hooks.example.com/alerts"),
            ("NOTIFY_WEBHOOK_TOKEN", "s3cret"),
        ])
        .unwrap();
        assert_eq!(config.notifier.webhook_url.as_deref(), Some("https://hooks.example.com/alerts"));
        assert_eq!(config.notifier.webhook_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn empty_values_treated_as_absent() {
        let config = config_with(&[("NOTIFY_WEBHOOK_URL", ""), ("DB_PATH", "  ")]).unwrap();
        assert!(config.notifier.webhook_url.is_none());
        assert_eq!(config.db_path, PathBuf::from("./stocks.db"));
    }

    #[test]
    fn rejects_zero_concurrency_and_timeout() {
        assert!(config_with(&[("INGEST_CONCURRENCY", "0")]).is_err());
        assert!(config_with(&[("FETCH_TIMEOUT_SECS", "0")]).is_err());
        assert!(config_with(&[("SUMMARY_WINDOW_HOURS", "0")]).is_err());
    }

    #[test]
    fn oversized_summary_window_is_rejected() {
        let err = config_with(&[("SUMMARY_WINDOW_HOURS", "9999999999999")]).unwrap_err();
        assert!(err.to_string().contains("SUMMARY_WINDOW_HOURS"));

        // fits in a Duration but `now - window` would fall before the earliest timestamp
        let err = config_with(&[("SUMMARY_WINDOW_HOURS", "10000000000")]).unwrap_err();
        assert!(err.to_string().contains("SUMMARY_WINDOW_HOURS"));
    }

    #[test]
    fn long_but_representable_window_is_accepted() {
        let config = config_with(&[("SUMMARY_WINDOW_HOURS", "87600")]).unwrap();
        assert_eq!(config.summary_window, chrono::Duration::hours(87_600));
    }

    #[test]
    fn email_settings_are_read() {
        let config = config_with(&[
            ("EMAIL_SMTP_HOST", "smtp.example.com"),
            ("EMAIL_SMTP_PORT", "2525"),
            ("EMAIL_FROM", "alerts@example.com"),
            ("EMAIL_TO", "ops@example.com"),
            ("EMAIL_USER", "alerts"),
            ("EMAIL_PASS", "hunter2"),
        ])
        .unwrap();

        let email = config.notifier.email.unwrap();
        assert_eq!(email.smtp_host, "smtp.example.com");
        assert_eq!(email.smtp_port, 2525);
        assert_eq!(email.from, "alerts@example.com");
        assert_eq!(email.to, "ops@example.com");
        assert_eq!(email.user.as_deref(), Some("alerts"));
        assert_eq!(email.pass.as_deref(), Some("hunter2"));
        assert!(config.notifier.email_partial.is_empty());
    }

    #[test]
    fn email_port_defaults_to_587_and_login_is_optional() {
        let config = config_with(&[
            ("EMAIL_SMTP_HOST", "smtp.example.com"),
            ("EMAIL_FROM", "alerts@example.com"),
            ("EMAIL_TO", "ops@example.com"),
        ])
        .unwrap();

        let email = config.notifier.email.unwrap();
        assert_eq!(email.smtp_port, 587);
        assert!(email.user.is_none() && email.pass.is_none());
    }

    #[test]
    fn incomplete_email_settings_are_recorded() {
        let config = config_with(&[("EMAIL_SMTP_HOST", "smtp.example.com"), ("EMAIL_TO", "ops@example.com")]).unwrap();
        assert!(config.notifier.email.is_none());
        assert_eq!(config.notifier.email_partial, vec!["EMAIL_SMTP_HOST", "EMAIL_TO"]);
    }

    #[test]
    fn rejects_bad_smtp_port() {
        let err = config_with(&[("EMAIL_SMTP_PORT", "70000")]).unwrap_err();
        assert!(err.to_string().contains("EMAIL_SMTP_PORT"));
    }

    #[test]
    fn source_url_trailing_slash_is_trimmed() {
        let config = config_with(&[("PRICE_SOURCE_URL", "http://localhost:9000/")]).unwrap();
        assert_eq!(config.source_url, "http://localhost:9000");
    }
}
