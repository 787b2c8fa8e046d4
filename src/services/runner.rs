use crate::cli::Mode;
use crate::domain::models::{CodeRecord, RunOutcome};
use crate::services::auth::fetch_access_token;
use crate::services::config::{Credentials, Settings};
use crate::services::extract::extract_code_records;
use crate::services::report::{write_lookup_report, write_report_index};
use crate::services::storage::{audit, existing_report_versions};
use crate::services::terminology::{
    apply_status_map, build_lookup_bundle, parse_lookup_responses, resolve_dmd_version,
    send_lookup_bundle,
};
use reqwest::blocking::Client;
use std::collections::BTreeSet;
use std::path::Path;

/// One full check: token, version, decision, and (when due) the extract →
/// reconcile → render pipeline. Strictly sequential; any fatal API failure
/// aborts the run.
pub fn run(
    client: &Client,
    settings: &Settings,
    credentials: &Credentials,
    mode: Mode,
    reports_dir: &Path,
) -> anyhow::Result<RunOutcome> {
    let access_token = fetch_access_token(client, settings, credentials)?;
    let existing_versions = existing_report_versions(reports_dir);
    let version = resolve_dmd_version(client, settings, &access_token)?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "terminology server returned no version for anchor code {}",
                settings.anchor_code
            )
        })?;

    let should_run = mode == Mode::Force || !existing_versions.contains(&version);
    if !should_run {
        audit(
            reports_dir,
            "skip",
            serde_json::json!({ "version": version }),
        );
        return Ok(RunOutcome::Skipped { version });
    }

    let records = update_reports(client, settings, &access_token, &version, reports_dir)?;
    Ok(RunOutcome::Completed { version, records })
}

fn update_reports(
    client: &Client,
    settings: &Settings,
    access_token: &str,
    version: &str,
    reports_dir: &Path,
) -> anyhow::Result<Vec<CodeRecord>> {
    let mut records = extract_code_records(client, settings)?;

    // Each code value is looked up once, however many folders it appears in.
    let unique_codes: BTreeSet<&str> = records.iter().map(|r| r.code.as_str()).collect();
    let bundle = build_lookup_bundle(unique_codes.iter().copied(), &settings.code_system_url);
    let response_bundle = send_lookup_bundle(client, settings, access_token, &bundle)?;
    let status_map = parse_lookup_responses(&response_bundle);
    let codes_checked = unique_codes.len();
    apply_status_map(&mut records, &status_map);

    let report_path = write_lookup_report(&records, version, settings, reports_dir)?;
    write_report_index(settings, reports_dir)?;
    audit(
        reports_dir,
        "run",
        serde_json::json!({
            "version": version,
            "codes_checked": codes_checked,
            "report": report_path.to_string_lossy(),
        }),
    );
    Ok(records)
}

/// Records whose reconciled status calls for attention.
pub fn problem_records(records: &[CodeRecord]) -> Vec<&CodeRecord> {
    records.iter().filter(|r| r.is_problem()).collect()
}
