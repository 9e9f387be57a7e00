//! Runtime settings for policy_checker.
//!
//! Layered lowest precedence first: built-in defaults, `policy_checker.toml`
//! (or an explicit `--config` file), then `POLICY_CHECKER_*` environment
//! variables. CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Settings file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "policy_checker.toml";

const ENV_PREFIX: &str = "POLICY_CHECKER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Service-account key used for authenticated spreadsheet access.
    pub credentials_path: PathBuf,
    pub output_path: PathBuf,
    /// Phrases always checked; CLI phrases are appended after these.
    pub phrases: Vec<String>,
    /// Sub-paths tried, in order, when probing for a privacy page.
    pub privacy_paths: Vec<String>,
    /// Total fetch attempts per candidate URL.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    /// Pause after every processed URL.
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub sheets_api_base: String,
    pub sheets_export_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            output_path: PathBuf::from("output_results.csv"),
            phrases: vec!["Social Security Number".to_string()],
            privacy_paths: vec![
                "/privacy".to_string(),
                "/privacy-policy".to_string(),
                "/privacy-notice".to_string(),
            ],
            max_retries: 3,
            backoff_base_ms: 1000,
            request_delay_ms: 1000,
            timeout_secs: 30,
            user_agent: concat!("policy_checker/", env!("CARGO_PKG_VERSION")).to_string(),
            sheets_api_base: "https://sheets.googleapis.com".to_string(),
            sheets_export_base: "https://docs.google.com".to_string(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::FileNotFound(p.to_path_buf()));
                }
                File::from(p).required(true)
            }
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("phrases")
                    .with_list_parse_key("privacy_paths"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid {
                field: "max_retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(bad) = self.privacy_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(ConfigError::Invalid {
                field: "privacy_paths",
                reason: format!("'{}' must start with '/'", bad),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Merge configured phrases with extra ones: trimmed, empties dropped,
/// case-insensitive duplicates removed, first spelling kept.
pub fn merge_phrases<I, S>(base: &[String], extra: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut merged: Vec<String> = Vec::new();
    let extra: Vec<String> = extra.into_iter().map(|s| s.as_ref().to_string()).collect();
    for phrase in base.iter().chain(extra.iter()) {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            continue;
        }
        if merged.iter().any(|p| p.eq_ignore_ascii_case(phrase)) {
            continue;
        }
        merged.push(phrase.to_string());
    }
    merged
}

/// Split a comma-separated phrase list as typed at the prompt or on the CLI.
pub fn split_phrases(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ──
