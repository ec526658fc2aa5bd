//! Library configuration and one-time initialization.

use std::env;
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "tessel=info";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tracing filter directive (`TESSEL_LOG`)
    pub log_filter: String,
    /// Reject property names that are not plain identifiers (`TESSEL_STRICT_NAMES`)
    pub strict_property_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            strict_property_names: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let log_filter = lookup("TESSEL_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let strict_property_names = match lookup("TESSEL_STRICT_NAMES") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidStrictNames(value))?,
        };

        Ok(Self {
            log_filter,
            strict_property_names,
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TESSEL_STRICT_NAMES value: {0}")]
    InvalidStrictNames(String),
}

/// Initialize the library once per process.
///
/// Stores `config` and installs a `tracing` subscriber filtered by
/// `config.log_filter`. Returns `false` if a configuration was already in
/// effect, either from an earlier `init` or because a schema was derived
/// with the defaults first.
pub fn init(config: Config) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_filter)
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    if CONFIG.set(config).is_err() {
        tracing::warn!("tessel already initialized; ignoring new configuration");
        return false;
    }

    // A host may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::debug!(config = ?current(), "tessel initialized");
    true
}

/// The configuration in effect.
pub fn current() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}
