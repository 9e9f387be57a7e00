use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use csv::Writer;
use serde::Serialize;
use tracing::{debug, info};

use crate::record::ResultRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Format implied by a file extension, CSV unless it is `.json`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

pub fn write_results(records: &[ResultRecord], phrases: &[String], path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => export_csv(records, phrases, path),
        OutputFormat::Json => export_json(records, phrases, path),
    }
}

/// `url,policy_url,status,reason,<phrase...>`, one row per record. Overwrites `path`.
pub fn export_csv(records: &[ResultRecord], phrases: &[String], path: &Path) -> Result<()> {
    debug!("Exporting {} results to CSV: {}", records.len(), path.display());

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut wtr = Writer::from_writer(file);

    let mut header = ["url", "policy_url", "status", "reason"].map(String::from).to_vec();
    header.extend(phrases.iter().cloned());
    wtr.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.url.clone(),
            record.policy_url.clone().unwrap_or_default(),
            record.status(),
            record.reason().unwrap_or_default().to_string(),
        ];
        row.extend(phrases.iter().map(|p| record.flag(p).to_string()));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    info!("Wrote {} results to {}", records.len(), path.display());
    Ok(())
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generated_at: DateTime<Utc>,
    phrases: &'a [String],
    total: usize,
    records: Vec<JsonRecord<'a>>,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    url: &'a str,
    policy_url: Option<&'a str>,
    status: String,
    reason: Option<&'a str>,
    flags: BTreeMap<&'a str, &'static str>,
}

pub fn export_json(records: &[ResultRecord], phrases: &[String], path: &Path) -> Result<()> {
    debug!("Exporting {} results to JSON: {}", records.len(), path.display());

    let export = JsonExport {
        generated_at: Utc::now(),
        phrases,
        total: records.len(),
        records: records
            .iter()
            .map(|r| JsonRecord {
                url: &r.url,
                policy_url: r.policy_url.as_deref(),
                status: r.status(),
                reason: r.reason(),
                flags: phrases.iter().map(|p| (p.as_str(), r.flag(p).as_str())).collect(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&export)?;
    let mut file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;

    info!("Wrote {} results to {}", records.len(), path.display());
    Ok(())
}

/// Write-back grid anchored at A1, one grid row per sheet row.
///
/// `rows[i]` is the sheet row `records[i]` was read from. The header row is
/// `URL,<phrase...>`; below it column A and rows without a record are `None`
/// so the existing cells are left alone.
pub fn sheet_rows(records: &[ResultRecord], rows: &[usize], phrases: &[String]) -> Vec<Vec<Option<String>>> {
    let width = phrases.len() + 1;
    let height = rows.iter().copied().max().unwrap_or(1).max(1);

    let mut grid = vec![vec![None; width]; height];
    grid[0] = std::iter::once("URL".to_string())
        .chain(phrases.iter().cloned())
        .map(Some)
        .collect();
    for (record, &row) in records.iter().zip(rows) {
        if row < 2 {
            continue;
        }
        for (cell, phrase) in grid[row - 1].iter_mut().skip(1).zip(phrases) {
            *cell = Some(record.flag(phrase).to_string());
        }
    }
    grid
}

pub fn print_summary(records: &[ResultRecord], phrases: &[String]) {
    if records.is_empty() {
        println!("No URLs processed.");
        return;
    }
    let checked = records.iter().filter(|r| r.is_available()).count();

    println!("\n=== Results ===");
    println!("URLs processed:    {}", records.len());
    println!("Policies checked:  {}", checked);
    println!("Unavailable (NA):  {}", records.len() - checked);
    for phrase in phrases {
        let hits = records
            .iter()
            .filter(|r| r.flag(phrase) == crate::record::Flag::Yes)
            .count();
        println!("  {:<28} mentioned on {} site(s)", phrase, hits);
    }
}

// ── Tests ──
