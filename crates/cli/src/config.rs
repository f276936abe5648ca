//! CLI configuration

use std::path::PathBuf;

use clap::{Args, Parser};
use cravely::{
    cart::{DEFAULT_NAMESPACE, StoreOptions},
    prices::parse_rate,
    pricing::{OrderType, PricingConfig},
    session::{StorageError, is_valid_key},
    sync::DEFAULT_POPULAR_LIMIT,
};
use rust_decimal::Decimal;

use crate::commands::Command;

/// Cravely cart CLI
#[derive(Debug, Parser)]
#[command(name = "cravely", about = "Cravely cart CLI", long_about = None)]
pub(crate) struct Cli {
    /// Cart store settings.
    #[command(flatten)]
    pub store: StoreConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

/// Cart store settings.
#[derive(Debug, Args)]
pub(crate) struct StoreConfig {
    /// Storage key namespace
    #[arg(
        long,
        env = "CRAVELY_NAMESPACE",
        default_value = DEFAULT_NAMESPACE,
        value_parser = parse_namespace
    )]
    pub namespace: String,

    /// Directory holding the session records
    #[arg(long, env = "CRAVELY_SESSION_DIR", default_value = ".cravely/session")]
    pub session_dir: PathBuf,

    /// Menu catalog (YAML)
    #[arg(long, env = "CRAVELY_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Tax rate, as a fraction (0.15) or percentage (15%)
    #[arg(long, env = "CRAVELY_TAX_RATE", default_value = "0.15", value_parser = parse_rate)]
    pub tax_rate: Decimal,

    /// Flat fee added to delivery orders
    #[arg(long, env = "CRAVELY_DELIVERY_FEE", default_value_t = 200)]
    pub delivery_fee: u64,

    /// Order type when neither the query nor the session names one
    #[arg(long, env = "CRAVELY_ORDER_TYPE", default_value_t = OrderType::Delivery)]
    pub order_type: OrderType,

    /// Page query string, e.g. "?type=pickup"
    #[arg(long)]
    pub query: Option<String>,

    /// Number of popular items to suggest
    #[arg(long, env = "CRAVELY_POPULAR_LIMIT", default_value_t = DEFAULT_POPULAR_LIMIT)]
    pub popular_limit: usize,
}

impl StoreConfig {
    /// Options for opening the cart store.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            namespace: self.namespace.clone(),
            pricing: PricingConfig {
                tax_rate: self.tax_rate,
                delivery_fee: self.delivery_fee,
                ..PricingConfig::default()
            },
            default_order_type: self.order_type,
            query: self.query.clone(),
        }
    }
}

/// Accept only namespaces that yield valid session record keys.
fn parse_namespace(s: &str) -> Result<String, StorageError> {
    if is_valid_key(s) {
        Ok(s.to_string())
    } else {
        Err(StorageError::InvalidKey(s.to_string()))
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub(crate) struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}
