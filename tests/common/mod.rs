#![allow(dead_code)]

use std::path::{Path, PathBuf};

use policy_checker::Settings;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

/// Settings pointed at `server`, with no pauses and millisecond backoff.
pub fn test_settings(server: &MockServer) -> Settings {
    Settings {
        max_retries: 3,
        backoff_base_ms: 1,
        request_delay_ms: 0,
        timeout_secs: 5,
        sheets_api_base: server.uri(),
        sheets_export_base: server.uri(),
        ..Settings::default()
    }
}

pub fn html_page(body: &str) -> String {
    format!(
        "<html><head><title>Privacy</title></head><body><nav>Home | About</nav><main>{}</main><footer>(c) 2024</footer></body></html>",
        body
    )
}

/// Serve `html` at `url_path` on `server`.
pub async fn mount_page(server: &MockServer, url_path: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Copy of the fixture key whose token endpoint is `server`.
pub fn credentials_for(server: &MockServer, dir: &Path) -> PathBuf {
    let raw = std::fs::read_to_string(fixture_path("service_account.json")).unwrap();
    let mut key: serde_json::Value = serde_json::from_str(&raw).unwrap();
    key["token_uri"] = serde_json::Value::String(format!("{}/token", server.uri()));
    let out = dir.join("credentials.json");
    std::fs::write(&out, serde_json::to_string(&key).unwrap()).unwrap();
    out
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

pub async fn mount_sheet_meta(server: &MockServer, spreadsheet_id: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{}", spreadsheet_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sheets": [{ "properties": { "title": title } }]
        })))
        .mount(server)
        .await;
}
