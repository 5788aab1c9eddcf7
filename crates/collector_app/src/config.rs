//! RON configuration for the collector binary.
//!
//! A missing config file falls back to defaults; an unparsable one is fatal.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use collector_core::{Backoff, RetryPolicy};
use collector_engine::{
    ApiSettings, BrowserSettings, ColumnNames, HttpSettings, PacerConfig, SchedulerConfig,
};

use crate::logging::LoggingSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {0:?}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("could not parse config file {0:?}: {1}")]
    Parse(PathBuf, ron::error::SpannedError),
}

/// Which ledger the run works against.
#[derive(Debug, Clone, Deserialize)]
pub enum LedgerBackend {
    /// Google Sheets; the bearer token is read from the named env var.
    Sheets {
        spreadsheet_id: String,
        worksheet: String,
        token_env: String,
    },
    /// In-process ledger seeded with terms; useful for dry runs.
    Memory { terms: Vec<String> },
}

impl Default for LedgerBackend {
    fn default() -> Self {
        LedgerBackend::Memory { terms: Vec::new() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub sequence: String,
    pub timestamp: String,
    pub term: String,
    pub results: String,
    pub status: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        let names = ColumnNames::default();
        Self {
            sequence: names.sequence,
            timestamp: names.timestamp,
            term: names.term,
            results: names.results,
            status: names.status,
        }
    }
}

impl From<ColumnConfig> for ColumnNames {
    fn from(config: ColumnConfig) -> Self {
        Self {
            sequence: config.sequence,
            timestamp: config.timestamp,
            term: config.term,
            results: config.results,
            status: config.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum BackoffMode {
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub ledger: LedgerBackend,
    pub batch_size: usize,
    pub workers: usize,
    pub max_rounds: u32,
    pub base_retry_delay_secs: u64,
    pub backoff: BackoffMode,
    /// Per-request delay window, milliseconds.
    pub request_delay_ms: (u64, u64),
    /// Inter-batch pause window, milliseconds.
    pub batch_delay_ms: (u64, u64),
    /// Browser settle window after navigation, milliseconds.
    pub settle_delay_ms: (u64, u64),
    pub request_timeout_secs: u64,
    pub page_load_timeout_secs: u64,
    pub search_url: String,
    pub autocomplete_url: String,
    pub landing_url: String,
    /// Ordered selector patterns; first match wins. Markup drift is handled
    /// by editing this list, not the code.
    pub selector_patterns: Vec<String>,
    pub columns: ColumnConfig,
    pub use_browser: bool,
    pub chrome_executable: Option<PathBuf>,
    pub logging: LoggingSettings,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let http = HttpSettings::default();
        let api = ApiSettings::default();
        let browser = BrowserSettings::default();
        Self {
            ledger: LedgerBackend::default(),
            batch_size: 3,
            workers: 1,
            max_rounds: 3,
            base_retry_delay_secs: 5,
            backoff: BackoffMode::Linear,
            request_delay_ms: (2000, 6000),
            batch_delay_ms: (15_000, 45_000),
            settle_delay_ms: (1500, 4000),
            request_timeout_secs: 15,
            page_load_timeout_secs: 30,
            search_url: http.search_url,
            autocomplete_url: api.autocomplete_url,
            landing_url: browser.landing_url,
            selector_patterns: vec![
                "span.keywordItem_text__7ZVpD".to_string(),
                "div.relatedTags_relation_srh__YG9s7 a".to_string(),
                "ul.relatedKeywords a".to_string(),
            ],
            columns: ColumnConfig::default(),
            use_browser: true,
            chrome_executable: None,
            logging: LoggingSettings::default(),
        }
    }
}

impl CollectorConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_rounds: self.max_rounds,
            base_delay: Duration::from_secs(self.base_retry_delay_secs),
            backoff: match self.backoff {
                BackoffMode::Linear => Backoff::Linear,
                BackoffMode::Exponential => Backoff::Exponential,
            },
        }
    }

    pub fn pacer_config(&self) -> PacerConfig {
        let window = |(min, max): (u64, u64)| {
            (Duration::from_millis(min), Duration::from_millis(max))
        };
        PacerConfig {
            request_delay: window(self.request_delay_ms),
            batch_delay: window(self.batch_delay_ms),
            settle_delay: window(self.settle_delay_ms),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            batch_size: self.batch_size,
            workers: self.workers,
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            search_url: self.search_url.clone(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            autocomplete_url: self.autocomplete_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            search_url: self.search_url.clone(),
            landing_url: self.landing_url.clone(),
            page_load_timeout: Duration::from_secs(self.page_load_timeout_secs),
            chrome_executable: self.chrome_executable.clone(),
            scroll: true,
        }
    }
}

/// Load the config file, or defaults if it does not exist. Runs before the
/// logger is up, so a missing file is reported by the caller, not here.
pub fn load(path: &Path) -> Result<CollectorConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(CollectorConfig::default());
        }
        Err(err) => return Err(ConfigError::Io(path.to_path_buf(), err)),
    };
    ron::from_str(&content).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
}
