use crate::services::report::version_from_filename;
use std::path::Path;

/// Versions of reports already present in the reports directory, recovered
/// from version-stamped filenames. A missing directory means no versions yet.
pub fn existing_report_versions(reports_dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut versions: Vec<String> = entries
        .flatten()
        .filter_map(|e| version_from_filename(&e.file_name().to_string_lossy()))
        .collect();
    versions.sort();
    versions
}

/// Best-effort append of a run event to the audit log next to the reports.
/// Auditing never fails the run.
pub fn audit(reports_dir: &Path, action: &str, data: serde_json::Value) {
    let _ = std::fs::create_dir_all(reports_dir);
    let event = serde_json::json!({
        "ts": unix_now(),
        "action": action,
        "data": data
    });
    let line = format!("{}\n", event);
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(reports_dir.join("audit.jsonl"))
        .and_then(|mut f| std::io::Write::write_all(&mut f, line.as_bytes()));
}

fn unix_now() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    ts.to_string()
}
