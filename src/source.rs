//! Where the list of sites comes from.
//!
//! A locator string is resolved to one of three sources by its shape: a
//! spreadsheet URL or ID (read publicly through the CSV export, or through
//! the Sheets API when authenticated access is requested) or a local file.
//! Reading never fails outright; problems come back as an empty list plus a
//! warning for the operator.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::sheets::{SheetError, SheetsClient};

static SHEET_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap());
static GID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[#&?]gid=(\d+)").unwrap());
static SHEET_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{25,}$").unwrap());

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Invalid Google Sheet URL format: {0}")]
    InvalidLocator(String),

    #[error("Failed to fetch the sheet: {0}. Make sure it is shared as \"Anyone with the link can view\"")]
    Fetch(String),

    #[error("Failed to parse CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Sheet(#[from] SheetError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    PublicSheet { spreadsheet_id: String, gid: String },
    AuthenticatedSheet { spreadsheet_id: String },
    LocalFile { path: PathBuf },
}

/// A URL and the 1-based sheet row it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub row: usize,
    pub url: String,
}

/// URLs read from a source. An empty list always carries a warning.
///
/// `rows[i]` is the sheet row of `urls[i]`; blank cells are skipped, so rows
/// are increasing but not necessarily contiguous.
#[derive(Debug, Clone, Default)]
pub struct UrlList {
    pub urls: Vec<String>,
    pub rows: Vec<usize>,
    pub warning: Option<String>,
}

impl UrlList {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            urls: Vec::new(),
            rows: Vec::new(),
            warning: Some(message.into()),
        }
    }

    fn from_rows(entries: Vec<SourceRow>) -> Self {
        let (rows, urls) = entries.into_iter().map(|e| (e.row, e.url)).unzip();
        Self {
            urls,
            rows,
            warning: None,
        }
    }
}

impl UrlSource {
    pub fn from_locator(locator: &str, authenticated: bool) -> Result<Self, SourceError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(SourceError::InvalidLocator("empty locator".to_string()));
        }

        let spreadsheet_id = if locator.starts_with("http://") || locator.starts_with("https://") {
            let id = SHEET_URL_RE
                .captures(locator)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| SourceError::InvalidLocator(locator.to_string()))?;
            Some(id)
        } else if SHEET_ID_RE.is_match(locator) && !Path::new(locator).exists() {
            Some(locator.to_string())
        } else {
            None
        };

        Ok(match spreadsheet_id {
            Some(spreadsheet_id) if authenticated => UrlSource::AuthenticatedSheet { spreadsheet_id },
            Some(spreadsheet_id) => {
                let gid = GID_RE
                    .captures(locator)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| "0".to_string());
                UrlSource::PublicSheet { spreadsheet_id, gid }
            }
            None => UrlSource::LocalFile {
                path: PathBuf::from(locator),
            },
        })
    }

    pub fn spreadsheet_id(&self) -> Option<&str> {
        match self {
            UrlSource::PublicSheet { spreadsheet_id, .. } | UrlSource::AuthenticatedSheet { spreadsheet_id } => {
                Some(spreadsheet_id.as_str())
            }
            UrlSource::LocalFile { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            UrlSource::PublicSheet { spreadsheet_id, gid } => {
                format!("public sheet {} (gid {})", spreadsheet_id, gid)
            }
            UrlSource::AuthenticatedSheet { spreadsheet_id } => format!("sheet {} via Sheets API", spreadsheet_id),
            UrlSource::LocalFile { path } => format!("file {}", path.display()),
        }
    }

    async fn fetch(&self, client: &Client, settings: &Settings) -> Result<Vec<SourceRow>, SourceError> {
        match self {
            UrlSource::PublicSheet { spreadsheet_id, gid } => {
                let url = export_url(&settings.sheets_export_base, spreadsheet_id, gid);
                info!("Fetching sheet CSV export: {}", url);
                let resp = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| SourceError::Fetch(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(SourceError::Fetch(format!("HTTP {}", resp.status().as_u16())));
                }
                let body = resp.text().await.map_err(|e| SourceError::Fetch(e.to_string()))?;
                first_column(body.as_bytes())
            }
            UrlSource::AuthenticatedSheet { spreadsheet_id } => {
                let sheets =
                    SheetsClient::connect(client.clone(), &settings.sheets_api_base, &settings.credentials_path)
                        .await?;
                let column = sheets.read_column_a(spreadsheet_id).await?;
                Ok(column
                    .iter()
                    .enumerate()
                    .skip(1)
                    .filter_map(|(i, cell)| {
                        let url = cell.trim();
                        (!url.is_empty()).then(|| SourceRow {
                            row: i + 1,
                            url: url.to_string(),
                        })
                    })
                    .collect())
            }
            UrlSource::LocalFile { path } => {
                let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;
                first_column(file)
            }
        }
    }
}

/// Resolve `locator` and read its URLs. Never errors: failures become a warning.
pub async fn read_urls(locator: &str, authenticated: bool, client: &Client, settings: &Settings) -> UrlList {
    let source = match UrlSource::from_locator(locator, authenticated) {
        Ok(s) => s,
        Err(e) => return UrlList::failed(format!("Error: {}", e)),
    };
    read_from(&source, client, settings).await
}

pub async fn read_from(source: &UrlSource, client: &Client, settings: &Settings) -> UrlList {
    match source.fetch(client, settings).await {
        Ok(entries) if entries.is_empty() => UrlList::failed(format!(
            "Error: No valid URLs found in {}. Please check the input source and try again.",
            source.describe()
        )),
        Ok(entries) => {
            info!("Read {} URLs from {}", entries.len(), source.describe());
            UrlList::from_rows(entries)
        }
        Err(e) => {
            warn!("Failed to read URLs from {}: {}", source.describe(), e);
            UrlList::failed(format!("Error: {}", e))
        }
    }
}

pub fn export_url(base: &str, spreadsheet_id: &str, gid: &str) -> String {
    format!(
        "{}/spreadsheets/d/{}/export?format=csv&gid={}",
        base.trim_end_matches('/'),
        spreadsheet_id,
        gid
    )
}

/// First column of each non-empty CSV row, header row skipped.
///
/// Rows are numbered by physical line so blank lines keep their place; a
/// cell spanning several lines is not supported.
pub fn first_column<R: Read>(mut reader: R) -> Result<Vec<SourceRow>, SourceError> {
    let mut text = String::new();
    reader.read_to_string(&mut text).map_err(csv::Error::from)?;

    let mut entries = Vec::new();
    let mut record = csv::StringRecord::new();
    for (i, line) in text.lines().enumerate().skip(1) {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());
        if !rdr.read_record(&mut record)? {
            continue;
        }
        if let Some(cell) = record.get(0).map(str::trim).filter(|c| !c.is_empty()) {
            entries.push(SourceRow {
                row: i + 1,
                url: cell.to_string(),
            });
        }
    }
    Ok(entries)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET_ID: &str = "1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms";

    #[test]
    fn public_sheet_from_url() {
        let url = format!("https://docs.google.com/spreadsheets/d/{}/edit#gid=1234", SHEET_ID);
        let src = UrlSource::from_locator(&url, false).unwrap();
        assert_eq!(
            src,
            UrlSource::PublicSheet {
                spreadsheet_id: SHEET_ID.to_string(),
                gid: "1234".to_string()
            }
        );
    }

    #[test]
    fn gid_defaults_to_zero() {
        let url = format!("https://docs.google.com/spreadsheets/d/{}/edit", SHEET_ID);
        match UrlSource::from_locator(&url, false).unwrap() {
            UrlSource::PublicSheet { gid, .. } => assert_eq!(gid, "0"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn authenticated_when_requested() {
        let src = UrlSource::from_locator(SHEET_ID, true).unwrap();
        assert_eq!(
            src,
            UrlSource::AuthenticatedSheet {
                spreadsheet_id: SHEET_ID.to_string()
            }
        );
        assert_eq!(src.spreadsheet_id(), Some(SHEET_ID));
    }

    #[test]
    fn non_sheet_url_is_invalid() {
        let err = UrlSource::from_locator("https://example.com/list.csv", false).unwrap_err();
        assert!(matches!(err, SourceError::InvalidLocator(_)));
    }

    #[test]
    fn anything_else_is_a_file() {
        let src = UrlSource::from_locator("data/sites.csv", true).unwrap();
        assert_eq!(
            src,
            UrlSource::LocalFile {
                path: PathBuf::from("data/sites.csv")
            }
        );
        assert_eq!(src.spreadsheet_id(), None);
    }

    #[test]
    fn first_column_skips_header_and_blanks() {
        let csv = "URL,Notes\nhttps://a.com,x\n,\n  \nhttps://b.com\nhttps://c.com,y,z\n";
        let entries = first_column(csv.as_bytes()).unwrap();
        let urls: Vec<&str> = entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com", "https://b.com", "https://c.com"]);
    }

    #[test]
    fn first_column_keeps_sheet_rows() {
        let csv = "URL\nhttps://a.com\n\n\nhttps://b.com\n\"\"\nhttps://c.com\n";
        let rows: Vec<usize> = first_column(csv.as_bytes()).unwrap().iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 5, 7]);
    }

    #[test]
    fn header_only_is_empty() {
        assert!(first_column("URL\n".as_bytes()).unwrap().is_empty());
        assert!(first_column("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn export_url_shape() {
        assert_eq!(
            export_url("https://docs.google.com/", "abc", "7"),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=7"
        );
    }

    #[tokio::test]
    async fn local_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.csv");
        std::fs::write(&path, "URL\nhttps://a.com\nhttps://b.com/\n").unwrap();

        let client = Client::new();
        let list = read_urls(path.to_str().unwrap(), false, &client, &Settings::default()).await;
        assert_eq!(list.urls, vec!["https://a.com", "https://b.com/"]);
        assert_eq!(list.rows, vec![2, 3]);
        assert!(list.warning.is_none());
    }

    #[tokio::test]
    async fn missing_file_degrades_to_warning() {
        let client = Client::new();
        let list = read_urls("/nonexistent/sites.csv", false, &client, &Settings::default()).await;
        assert!(list.urls.is_empty());
        assert!(list.warning.unwrap().contains("/nonexistent/sites.csv"));
    }

    #[tokio::test]
    async fn bad_locator_degrades_to_warning() {
        let client = Client::new();
        let list = read_urls("https://example.com/not-a-sheet", false, &client, &Settings::default()).await;
        assert!(list.urls.is_empty());
        assert!(list.warning.unwrap().contains("Invalid Google Sheet URL"));
    }
}
