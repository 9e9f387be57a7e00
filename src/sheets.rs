//! Minimal Google Sheets v4 client authenticated with a service-account key.
//!
//! Only what the checker needs: read column A of the first worksheet and
//! update a block of cells on it. Access tokens last an hour, so callers
//! connect separately for the read at the start of a run and the write at
//! the end.

use std::path::{Path, PathBuf};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Credentials file {path} could not be read ({reason}). Create a service-account key and save it there, or pass --credentials")]
    Credentials { path: PathBuf, reason: String },

    #[error("Failed to sign service-account token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Permission denied. Share the spreadsheet with {client_email} and give it Editor access")]
    PermissionDenied { client_email: String },

    #[error("Spreadsheet {0} not found")]
    NotFound(String),

    #[error("Spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("Sheets API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid Sheets API base URL: {0}")]
    BaseUrl(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, SheetError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SheetError::Credentials {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| SheetError::Credentials {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<Option<String>>],
}

pub struct SheetsClient {
    http: Client,
    api_base: String,
    client_email: String,
    token: String,
}

impl SheetsClient {
    /// Load the key at `credentials` and exchange it for an access token.
    pub async fn connect(http: Client, api_base: &str, credentials: &Path) -> Result<Self, SheetError> {
        let key = ServiceAccountKey::from_file(credentials)?;
        let token = fetch_access_token(&http, &key).await?;
        debug!("Authenticated to Sheets API as {}", key.client_email);
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            client_email: key.client_email,
            token,
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub async fn first_sheet_title(&self, spreadsheet_id: &str) -> Result<String, SheetError> {
        let mut url = self.url(&["v4", "spreadsheets", spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties.title");

        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let meta: SpreadsheetMeta = self.check(resp, spreadsheet_id).await?.json().await?;
        meta.sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or(SheetError::NoWorksheet)
    }

    /// Column A of the first worksheet, header included. Non-string cells are dropped.
    pub async fn read_column_a(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetError> {
        let title = self.first_sheet_title(spreadsheet_id).await?;
        let range = a1_range(&title, "A:A");
        let url = self.url(&["v4", "spreadsheets", spreadsheet_id, "values", range.as_str()])?;

        let resp = self.http.get(url).bearer_auth(&self.token).send().await?;
        let body: ValueRange = self.check(resp, spreadsheet_id).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| match row.into_iter().next() {
                Some(serde_json::Value::String(s)) => s,
                _ => String::new(),
            })
            .collect())
    }

    /// Write `rows` to the first worksheet starting at A1. `None` cells are
    /// sent as null, which the API leaves untouched.
    pub async fn write_rows(&self, spreadsheet_id: &str, rows: &[Vec<Option<String>>]) -> Result<(), SheetError> {
        if rows.is_empty() {
            return Ok(());
        }
        let title = self.first_sheet_title(spreadsheet_id).await?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let range = a1_range(&title, &format!("A1:{}{}", column_letter(width), rows.len()));

        let mut url = self.url(&["v4", "spreadsheets", spreadsheet_id, "values", range.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = ValueUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: rows,
        };
        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        self.check(resp, spreadsheet_id).await?;
        info!("Wrote {} rows to spreadsheet {}", rows.len(), spreadsheet_id);
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| SheetError::BaseUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetError::BaseUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(&self, resp: Response, spreadsheet_id: &str) -> Result<Response, SheetError> {
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::FORBIDDEN => Err(SheetError::PermissionDenied {
                client_email: self.client_email.clone(),
            }),
            StatusCode::NOT_FOUND => Err(SheetError::NotFound(spreadsheet_id.to_string())),
            s => Err(SheetError::Api {
                status: s.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}

async fn fetch_access_token(http: &Client, key: &ServiceAccountKey) -> Result<String, SheetError> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims {
        iss: &key.client_email,
        scope: SCOPE,
        aud: &key.token_uri,
        iat,
        exp: iat + TOKEN_LIFETIME_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    let assertion = encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?;

    let resp = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(SheetError::Api {
            status: resp.status().as_u16(),
            body: resp.text().await.unwrap_or_default(),
        });
    }
    let token: TokenResponse = resp.json().await?;
    Ok(token.access_token)
}

/// `'Title'!cells`, with quotes in the title doubled.
pub fn a1_range(title: &str, cells: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), cells)
}

/// 1-based column index to its A1 letters (1 → A, 27 → AA).
pub fn column_letter(mut n: usize) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

// ── Tests ──
