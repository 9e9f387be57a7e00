//! One full run: read URLs, check each site, write results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::{merge_phrases, Settings};
use crate::export::{self, OutputFormat};
use crate::fetch::{build_client, ContentFetcher};
use crate::matcher::PhraseMatcher;
use crate::processor::{process_urls, CheckMode, ProcessOptions};
use crate::record::{Flag, ResultRecord};
use crate::sheets::SheetsClient;
use crate::source::{self, UrlSource};

/// Everything a run needs, no prompts or globals.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Spreadsheet URL/ID or path to a local CSV file.
    pub source: String,
    /// Read the spreadsheet through the Sheets API instead of the public export.
    pub authenticated: bool,
    /// Checked in addition to `settings.phrases`.
    pub extra_phrases: Vec<String>,
    pub mode: CheckMode,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Also write Y/N/NA rows back into the source spreadsheet.
    pub write_back: bool,
    pub show_progress: bool,
    pub settings: Settings,
}

impl RunConfig {
    pub fn new(source: impl Into<String>, settings: Settings) -> Self {
        let output = settings.output_path.clone();
        Self {
            source: source.into(),
            authenticated: false,
            extra_phrases: Vec::new(),
            mode: CheckMode::default(),
            format: OutputFormat::from_path(&output),
            output,
            write_back: false,
            show_progress: true,
            settings,
        }
    }

    pub fn phrases(&self) -> Vec<String> {
        merge_phrases(&self.settings.phrases, &self.extra_phrases)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records: Vec<ResultRecord>,
    pub phrases: Vec<String>,
    pub output: PathBuf,
    /// Set when write-back was requested and failed.
    pub sheet_error: Option<String>,
    pub sheet_updated: bool,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn unavailable(&self) -> usize {
        self.records.iter().filter(|r| !r.is_available()).count()
    }

    pub fn mentions(&self, phrase: &str) -> usize {
        self.records.iter().filter(|r| r.flag(phrase) == Flag::Yes).count()
    }
}

/// Run the pipeline. `Ok(None)` means no URLs could be read; the reason has
/// already been printed.
pub async fn run(cfg: &RunConfig) -> Result<Option<RunSummary>> {
    let phrases = cfg.phrases();
    if phrases.is_empty() {
        anyhow::bail!("No phrases to check. Configure `phrases` or pass --phrases");
    }
    let matcher = PhraseMatcher::new(&phrases).context("Failed to compile phrase patterns")?;
    let client = build_client(&cfg.settings)?;

    let url_source = match UrlSource::from_locator(&cfg.source, cfg.authenticated) {
        Ok(s) => s,
        Err(e) => {
            println!("Error: {}", e);
            return Ok(None);
        }
    };
    let list = source::read_from(&url_source, &client, &cfg.settings).await;
    if let Some(warning) = &list.warning {
        println!("{}", warning);
    }
    if list.urls.is_empty() {
        return Ok(None);
    }

    println!("\nFound {} URLs to process.", list.urls.len());
    println!("Checking for: {}", matcher.phrases().collect::<Vec<_>>().join(", "));

    let fetcher = ContentFetcher::from_settings(client.clone(), &cfg.settings);
    let opts = ProcessOptions::from_settings(&cfg.settings, cfg.mode, cfg.show_progress);
    let records = process_urls(&list.urls, &matcher, &fetcher, &opts).await;

    export::write_results(&records, &phrases, &cfg.output, cfg.format)
        .with_context(|| format!("Failed to write results to {}", cfg.output.display()))?;
    println!("\nResults have been written to {}", cfg.output.display());

    let mut summary = RunSummary {
        records,
        phrases,
        output: cfg.output.clone(),
        sheet_error: None,
        sheet_updated: false,
    };

    if cfg.write_back {
        match url_source.spreadsheet_id() {
            Some(id) => match write_back(&client, &cfg.settings, id, &list.rows, &summary).await {
                Ok(()) => {
                    summary.sheet_updated = true;
                    println!("Spreadsheet updated with results.");
                }
                Err(e) => {
                    error!("Failed to update spreadsheet {}: {:#}", id, e);
                    println!("Could not update the spreadsheet: {:#}", e);
                    summary.sheet_error = Some(format!("{:#}", e));
                }
            },
            None => {
                warn!("Write-back requested but {} is not a spreadsheet", url_source.describe());
                summary.sheet_error = Some("write-back needs a spreadsheet source".to_string());
            }
        }
    }

    info!(
        "Run complete: {} URLs, {} unavailable",
        summary.total(),
        summary.unavailable()
    );
    Ok(Some(summary))
}

async fn write_back(
    client: &reqwest::Client,
    settings: &Settings,
    spreadsheet_id: &str,
    source_rows: &[usize],
    summary: &RunSummary,
) -> Result<()> {
    let sheets = SheetsClient::connect(client.clone(), &settings.sheets_api_base, &settings.credentials_path).await?;
    let grid = export::sheet_rows(&summary.records, source_rows, &summary.phrases);
    sheets.write_rows(spreadsheet_id, &grid).await?;
    Ok(())
}
