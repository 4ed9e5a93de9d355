//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use checkout::ReceiptHeader;
use domain::{DEFAULT_CUSTOMER_LIMIT, DashboardSettings};

/// Log output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: Postgres connection string; in-memory store when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `SEED_FILE`: JSON catalog loaded into the in-memory store
/// - `LOW_STOCK_THRESHOLD`: dashboard low-stock cutoff (default: `5`)
/// - `RECENT_INVOICE_LIMIT`: invoices read by the dashboard (default: `50`)
/// - `CUSTOMER_LIST_LIMIT`: customers listed at the terminal (default: `20`)
/// - `STORE_NAME`, `STORE_BRANCH`, `STORE_VAT_NUMBER`: receipt header
/// - `SESSION_IDLE_TIMEOUT_SECS`: evict sessions unused this long
///   (default: `1800`; `0` keeps sessions until closed)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub seed_file: Option<PathBuf>,
    pub low_stock_threshold: u32,
    pub recent_invoice_limit: usize,
    pub customer_list_limit: usize,
    pub receipt_header: ReceiptHeader,
    pub session_idle_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; empty strings count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: var("LOG_FORMAT")
                .and_then(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: var("DATABASE_URL"),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            seed_file: var("SEED_FILE").map(PathBuf::from),
            low_stock_threshold: var("LOW_STOCK_THRESHOLD")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.low_stock_threshold),
            recent_invoice_limit: var("RECENT_INVOICE_LIMIT")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.recent_invoice_limit),
            customer_list_limit: var("CUSTOMER_LIST_LIMIT")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.customer_list_limit),
            receipt_header: ReceiptHeader {
                store_name: var("STORE_NAME").unwrap_or(defaults.receipt_header.store_name),
                branch: var("STORE_BRANCH"),
                vat_number: var("STORE_VAT_NUMBER"),
            },
            session_idle_timeout: match var("SESSION_IDLE_TIMEOUT_SECS")
                .and_then(|n| n.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.session_idle_timeout,
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            low_stock_threshold: self.low_stock_threshold,
            recent_invoice_limit: self.recent_invoice_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let dashboard = DashboardSettings::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            seed_file: None,
            low_stock_threshold: dashboard.low_stock_threshold,
            recent_invoice_limit: dashboard.recent_invoice_limit,
            customer_list_limit: DEFAULT_CUSTOMER_LIMIT,
            receipt_header: ReceiptHeader::default(),
            session_idle_timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}
