use crate::domain::errors::ApiError;
use crate::domain::models::CodeRecord;
use crate::services::config::Settings;
use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Candidate dm+d codes are runs of 7 or more digits on word boundaries.
pub fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d{7,}\b").expect("valid code pattern"))
}

/// Distinct candidate codes in a SQL text, independent of order and
/// multiplicity of appearance.
pub fn extract_codes(sql_text: &str) -> BTreeSet<String> {
    code_pattern()
        .find_iter(sql_text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct DirEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Walks the measures directory of the source repository and extracts one
/// `CodeRecord` per (code, folder) pair.
///
/// A failing top-level listing is fatal; a failing per-folder listing or file
/// fetch skips that folder and produces no records for it.
pub fn extract_code_records(
    client: &Client,
    settings: &Settings,
) -> anyhow::Result<Vec<CodeRecord>> {
    let resp = client.get(&settings.repo_api_url).send()?;
    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(ApiError::DirectoryFetchFailure {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            url,
            body: resp.text().unwrap_or_default(),
        }
        .into());
    }
    let listing: Vec<DirEntry> = resp.json()?;
    let folders = listing.into_iter().filter(|e| e.kind == "dir");

    let mut records = Vec::new();
    for folder in folders {
        let folder_api_url = format!("{}/{}", settings.repo_api_url, folder.name);
        let folder_html_url = format!("{}/{}", settings.repo_html_url, folder.name);

        let folder_resp = match client.get(&folder_api_url).send() {
            Ok(r) if r.status().is_success() => r,
            // Per-folder failures are soft: skip the folder entirely.
            _ => continue,
        };
        let files: Vec<DirEntry> = match folder_resp.json() {
            Ok(f) => f,
            Err(_) => continue,
        };
        let Some(sql_file) = files.iter().find(|f| f.name.ends_with(".sql")) else {
            continue;
        };

        let raw_url = format!("{}/{}/{}", settings.raw_base_url, folder.name, sql_file.name);
        let sql_text = match client.get(&raw_url).send() {
            Ok(r) if r.status().is_success() => match r.text() {
                Ok(t) => t,
                Err(_) => continue,
            },
            _ => continue,
        };

        for code in extract_codes(&sql_text) {
            records.push(CodeRecord::new(
                code,
                folder.name.clone(),
                folder_html_url.clone(),
            ));
        }
    }

    Ok(records)
}
