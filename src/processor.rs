use std::time::Duration;

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::fetch::ContentFetcher;
use crate::matcher::PhraseMatcher;
use crate::record::ResultRecord;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("empty URL")]
    EmptyUrl,
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CheckMode {
    /// Check the listed URL itself
    Direct,
    /// Try the privacy sub-paths under each listed URL
    #[default]
    Probe,
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub mode: CheckMode,
    pub privacy_paths: Vec<String>,
    /// Pause after every URL, whatever its outcome.
    pub delay: Duration,
    pub show_progress: bool,
}

impl ProcessOptions {
    pub fn from_settings(settings: &Settings, mode: CheckMode, show_progress: bool) -> Self {
        Self {
            mode,
            privacy_paths: settings.privacy_paths.clone(),
            delay: settings.request_delay(),
            show_progress,
        }
    }
}

/// Check every URL in order, one at a time. Always one record per URL.
pub async fn process_urls(
    urls: &[String],
    matcher: &PhraseMatcher,
    fetcher: &ContentFetcher,
    opts: &ProcessOptions,
) -> Vec<ResultRecord> {
    let pb = if opts.show_progress {
        let pb = ProgressBar::new(urls.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("Processing URLs [{elapsed_precise}] {bar:40} {pos}/{len} URL ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut records = Vec::with_capacity(urls.len());
    for url in urls {
        let record = match process_one(url, matcher, fetcher, opts).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Error processing {}: {}", url, e);
                ResultRecord::unavailable(url, e.to_string())
            }
        };
        records.push(record);
        pb.inc(1);

        if !opts.delay.is_zero() {
            tokio::time::sleep(opts.delay).await;
        }
    }
    pb.finish_and_clear();

    let available = records.iter().filter(|r| r.is_available()).count();
    info!(
        "Processed {} URLs ({} checked, {} unavailable)",
        records.len(),
        available,
        records.len() - available
    );
    records
}

/// Fetch candidates in order and match the first one with content.
pub async fn process_one(
    url: &str,
    matcher: &PhraseMatcher,
    fetcher: &ContentFetcher,
    opts: &ProcessOptions,
) -> Result<ResultRecord, ProcessError> {
    for candidate in candidate_urls(url, opts.mode, &opts.privacy_paths)? {
        debug!("Trying {}", candidate);
        let content = fetcher.fetch_text(&candidate).await;
        if !content.is_empty() {
            return Ok(ResultRecord::checked(url, candidate, matcher.check(&content)));
        }
    }
    Ok(ResultRecord::unavailable(url, "no content could be fetched"))
}

/// Pages to try for `url`: the URL itself, or each privacy path under it.
pub fn candidate_urls(url: &str, mode: CheckMode, privacy_paths: &[String]) -> Result<Vec<String>, ProcessError> {
    let base = normalize_url(url)?;
    Ok(match mode {
        CheckMode::Direct => vec![base],
        CheckMode::Probe => {
            let stripped = base.trim_end_matches('/');
            privacy_paths.iter().map(|p| format!("{}{}", stripped, p)).collect()
        }
    })
}

/// Add `https://` to bare hosts and make sure the result parses.
fn normalize_url(url: &str) -> Result<String, ProcessError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ProcessError::EmptyUrl);
    }
    let full = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    match url::Url::parse(&full) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => Ok(full),
        Ok(parsed) => Err(ProcessError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        }),
        Err(e) => Err(ProcessError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> Vec<String> {
        Settings::default().privacy_paths
    }

    #[test]
    fn probe_strips_trailing_slashes() {
        let c = candidate_urls("https://a.com//", CheckMode::Probe, &paths()).unwrap();
        assert_eq!(
            c,
            vec![
                "https://a.com/privacy",
                "https://a.com/privacy-policy",
                "https://a.com/privacy-notice"
            ]
        );
    }

    #[test]
    fn direct_is_the_url_itself() {
        let c = candidate_urls("https://a.com/legal/privacy", CheckMode::Direct, &paths()).unwrap();
        assert_eq!(c, vec!["https://a.com/legal/privacy"]);
    }

    #[test]
    fn bare_host_gets_https() {
        let c = candidate_urls(" example.org ", CheckMode::Probe, &["/privacy".to_string()]).unwrap();
        assert_eq!(c, vec!["https://example.org/privacy"]);
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(matches!(
            candidate_urls("   ", CheckMode::Direct, &paths()),
            Err(ProcessError::EmptyUrl)
        ));
        assert!(matches!(
            candidate_urls("ftp://files.example.com", CheckMode::Direct, &paths()),
            Err(ProcessError::InvalidUrl { .. })
        ));
        assert!(matches!(
            candidate_urls("http://exa mple.com", CheckMode::Direct, &paths()),
            Err(ProcessError::InvalidUrl { .. })
        ));
    }
}
