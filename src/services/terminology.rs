use crate::domain::errors::ApiError;
use crate::domain::models::{CodeRecord, CodeStatus};
use crate::services::config::Settings;
use crate::services::extract::code_pattern;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::collections::HashMap;

fn lookup_parameters(system_url: &str, code: &str) -> Value {
    json!({
        "resourceType": "Parameters",
        "parameter": [
            { "name": "system", "valueUri": system_url },
            { "name": "code", "valueCode": code }
        ]
    })
}

/// Reads the terminology server's current dm+d release version by looking up
/// the anchor code and scanning the response parameters for `version`.
pub fn resolve_dmd_version(
    client: &Client,
    settings: &Settings,
    access_token: &str,
) -> anyhow::Result<Option<String>> {
    let resp = client
        .post(settings.lookup_url())
        .bearer_auth(access_token)
        .header(reqwest::header::ACCEPT, "application/json")
        .json(&lookup_parameters(
            &settings.code_system_url,
            &settings.anchor_code,
        ))
        .send()?;

    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(ApiError::LookupFailure {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            url,
            body: resp.text().unwrap_or_default(),
        }
        .into());
    }

    let body: Value = resp.json()?;
    let version = body
        .get("parameter")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|p| p.get("name").and_then(Value::as_str) == Some("version"))
        .and_then(|p| p.get("valueString"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(version)
}

/// Builds one FHIR batch Bundle with a `$lookup` sub-request per code.
pub fn build_lookup_bundle<'a, I>(codes: I, system_url: &str) -> Value
where
    I: IntoIterator<Item = &'a str>,
{
    let entries: Vec<Value> = codes
        .into_iter()
        .map(|code| {
            json!({
                "request": {
                    "method": "POST",
                    "url": "CodeSystem/$lookup"
                },
                "resource": lookup_parameters(system_url, code)
            })
        })
        .collect();

    json!({
        "resourceType": "Bundle",
        "type": "batch",
        "entry": entries
    })
}

/// Submits a batch bundle to the FHIR root endpoint. Non-200 is fatal.
pub fn send_lookup_bundle(
    client: &Client,
    settings: &Settings,
    access_token: &str,
    bundle: &Value,
) -> anyhow::Result<Value> {
    let resp = client
        .post(settings.batch_url())
        .bearer_auth(access_token)
        .header(reqwest::header::CONTENT_TYPE, "application/fhir+json")
        .header(reqwest::header::ACCEPT, "application/fhir+json")
        .body(bundle.to_string())
        .send()?;

    let status = resp.status();
    let url = resp.url().to_string();
    if !status.is_success() {
        return Err(ApiError::LookupFailure {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            url,
            body: resp.text().unwrap_or_default(),
        }
        .into());
    }
    Ok(resp.json()?)
}

fn parameter_entries(resource: &Value) -> impl Iterator<Item = &Value> {
    resource
        .get("parameter")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn parameters_code(resource: &Value) -> Option<&str> {
    parameter_entries(resource)
        .find(|p| p.get("name").and_then(Value::as_str) == Some("code"))
        .and_then(|p| p.get("valueCode"))
        .and_then(Value::as_str)
}

/// Status from a `Parameters` resource: the `property` entry whose parts name
/// the `inactive` property decides active/inactive; no such property means the
/// server said nothing about the code's validity.
fn parameters_status(resource: &Value) -> CodeStatus {
    let mut status = CodeStatus::Unknown;
    for param in parameter_entries(resource) {
        if param.get("name").and_then(Value::as_str) != Some("property") {
            continue;
        }
        let parts: Vec<&Value> = param
            .get("part")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .collect();
        let is_inactive_property = parts.iter().any(|part| {
            part.get("name").and_then(Value::as_str) == Some("code")
                && part.get("valueCode").and_then(Value::as_str) == Some("inactive")
        });
        if !is_inactive_property {
            continue;
        }
        for part in parts {
            if part.get("name").and_then(Value::as_str) == Some("value") {
                match part.get("valueBoolean").and_then(Value::as_bool) {
                    Some(true) => status = CodeStatus::Inactive,
                    Some(false) => status = CodeStatus::Active,
                    None => {}
                }
            }
        }
    }
    status
}

/// Maps each entry of a batch $lookup response bundle back to a code status.
///
/// `OperationOutcome` entries carry their code only in free-text diagnostics,
/// so it is recovered with the same digit pattern used during extraction.
pub fn parse_lookup_responses(response_bundle: &Value) -> HashMap<String, CodeStatus> {
    let mut status_map = HashMap::new();

    let entries = response_bundle
        .get("entry")
        .and_then(Value::as_array)
        .into_iter()
        .flatten();
    for entry in entries {
        let resource = entry.get("resource").unwrap_or(&Value::Null);
        let (code, status) = match resource.get("resourceType").and_then(Value::as_str) {
            Some("Parameters") => (
                parameters_code(resource).map(str::to_string),
                parameters_status(resource),
            ),
            Some("OperationOutcome") => {
                let diagnostics = resource
                    .get("issue")
                    .and_then(Value::as_array)
                    .and_then(|issues| issues.first())
                    .and_then(|issue| issue.get("diagnostics"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let code = code_pattern()
                    .find(diagnostics)
                    .map(|m| m.as_str().to_string());
                (code, CodeStatus::Unknown)
            }
            _ => (None, CodeStatus::Unknown),
        };
        if let Some(code) = code {
            status_map.insert(code, status);
        }
    }

    status_map
}

/// Sets every record's status from the map, defaulting to unknown for codes
/// whose batch entry could not be matched at all.
pub fn apply_status_map(records: &mut [CodeRecord], status_map: &HashMap<String, CodeStatus>) {
    for record in records {
        record.status = Some(
            status_map
                .get(&record.code)
                .copied()
                .unwrap_or(CodeStatus::Unknown),
        );
    }
}
