//! Configuration infrastructure
//!
//! Configuration is layered, later layers win:
//! 1. Built-in defaults (`AppConfig::default()`)
//! 2. Optional config file (JSON or TOML, picked by extension)
//! 3. Environment overrides, e.g. `BOOKS_ETL__SCHEDULER__TARGET_COUNT=20`

#![allow(clippy::derivable_impls)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "BOOKS_ETL_CONFIG";

/// Prefix for per-key environment overrides
pub const ENV_PREFIX: &str = "BOOKS_ETL";

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where and how to scrape
    pub source: SourceConfig,

    /// Destination datastore
    pub database: DatabaseConfig,

    /// Periodic trigger and retry policy
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Search endpoint, request headers and HTML selectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Search URL; the page number is appended as `&page=N`
    pub search_url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Hard ceiling on pages requested in one run
    pub max_pages: u32,

    /// Static headers sent with every request, in order
    pub headers: Vec<HeaderEntry>,

    /// CSS selectors for listing containers and fields
    pub selectors: BookListSelectors,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// CSS selectors for search-result pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookListSelectors {
    /// One match per candidate listing
    pub container: String,
    pub title: String,
    pub author: String,
    pub price: String,
    pub rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:/var/lib/books-etl/books.db`
    pub url: String,

    /// Pool size
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between scheduled runs
    pub interval_secs: u64,

    /// Extra attempts after a failed run
    pub retries: u32,

    /// Delay between a failed attempt and its retry
    pub retry_delay_secs: u64,

    /// Number of records the collector aims for
    pub target_count: usize,

    /// Run immediately at startup instead of waiting one interval
    pub run_on_start: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable daily rolling file output
    pub file_output: bool,

    /// Directory for log files; defaults to `<data dir>/books-etl/logs`
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            search_url: amazon::SEARCH_URL.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_pages: defaults::MAX_PAGES,
            headers: amazon::HEADERS
                .iter()
                .map(|(name, value)| HeaderEntry::new(name, value))
                .collect(),
            selectors: BookListSelectors::default(),
        }
    }
}

impl Default for BookListSelectors {
    fn default() -> Self {
        Self {
            container: amazon::selectors::CONTAINER.to_string(),
            title: amazon::selectors::TITLE.to_string(),
            author: amazon::selectors::AUTHOR.to_string(),
            price: amazon::selectors::PRICE.to_string(),
            rating: amazon::selectors::RATING.to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let db_path = ConfigManager::get_app_data_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(defaults::DATABASE_FILE);

        Self {
            url: format!("sqlite:{}", db_path.display()),
            max_connections: defaults::DB_MAX_CONNECTIONS,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::SCHEDULE_INTERVAL_SECS,
            retries: defaults::RUN_RETRIES,
            retry_delay_secs: defaults::RUN_RETRY_DELAY_SECS,
            target_count: defaults::TARGET_COUNT,
            run_on_start: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Config file from `BOOKS_ETL_CONFIG`, else `<config dir>/books-etl/config.json`
    pub fn new() -> Result<Self> {
        let config_path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::get_config_dir()?.join(defaults::CONFIG_FILE),
        };

        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Build the layered configuration. A missing file is not an error.
    pub fn load_config(&self) -> Result<AppConfig> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = config::Config::builder().add_source(defaults);

        if self.config_path.exists() {
            info!("Loading configuration from: {:?}", self.config_path);
            builder = builder.add_source(config::File::from(self.config_path.as_path()));
        } else {
            info!("Configuration file not found, using defaults: {:?}", self.config_path);
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file as pretty JSON
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config)
            .context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.scheduler.target_count > 0,
            "scheduler.target_count must be greater than 0"
        );
        anyhow::ensure!(
            self.scheduler.interval_secs > 0,
            "scheduler.interval_secs must be greater than 0"
        );
        anyhow::ensure!(self.source.max_pages > 0, "source.max_pages must be greater than 0");
        anyhow::ensure!(
            self.database.max_connections > 0,
            "database.max_connections must be greater than 0"
        );
        url::Url::parse(&self.source.search_url)
            .with_context(|| format!("Invalid source.search_url: {}", self.source.search_url))?;
        Ok(())
    }
}

/// Amazon search endpoint, headers and page structure
pub mod amazon {
    /// Search results for "data engineering books"
    pub const SEARCH_URL: &str = "https://www.amazon.com/s?k=data+engineering+books";

    /// Client identification headers sent with every request
    pub const HEADERS: &[(&str, &str)] = &[
        ("Referer", "https://www.amazon.com/"),
        ("Sec-Ch-Ua", "Not_A Brand"),
        ("Sec-Ch-Ua-Mobile", "?0"),
        ("Sec-Ch-Ua-Platform", "macOS"),
        (
            "User-Agent",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36",
        ),
    ];

    pub mod selectors {
        pub const CONTAINER: &str = "div.s-result-item";
        pub const TITLE: &str = "span.a-text-normal";
        pub const AUTHOR: &str = "a.a-size-base";
        pub const PRICE: &str = "span.a-price-whole";
        pub const RATING: &str = "span.a-icon-alt";
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "books-etl";
    pub const CONFIG_FILE: &str = "config.json";
    pub const DATABASE_FILE: &str = "books.db";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default page ceiling per run
    pub const MAX_PAGES: u32 = 20;

    pub const DB_MAX_CONNECTIONS: u32 = 5;

    /// Once per day
    pub const SCHEDULE_INTERVAL_SECS: u64 = 24 * 60 * 60;

    /// One retry after a failed run
    pub const RUN_RETRIES: u32 = 1;

    /// Five minutes between attempts
    pub const RUN_RETRY_DELAY_SECS: u64 = 5 * 60;

    /// Records collected per run
    pub const TARGET_COUNT: usize = 50;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
}
