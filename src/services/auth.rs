use crate::domain::errors::ApiError;
use crate::services::config::{Credentials, Settings};
use reqwest::blocking::Client;

/// Exchanges client credentials for a bearer token. No caching and no retry:
/// every run requests a fresh token.
pub fn fetch_access_token(
    client: &Client,
    settings: &Settings,
    credentials: &Credentials,
) -> anyhow::Result<String> {
    let resp = client
        .post(&settings.token_url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()?;

    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(ApiError::AuthFailure {
            status: status.as_u16(),
            url,
            body: resp.text().unwrap_or_default(),
        }
        .into());
    }

    let body: serde_json::Value = resp.json()?;
    body.get("access_token")
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("token response from {} had no access_token", url))
}
