use crate::domain::models::{CodeRecord, JsonOut, RunOutcome};
use crate::services::report::report_filename;
use std::path::Path;

pub fn print_outcome(json: bool, outcome: &RunOutcome, reports_dir: &Path) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut {
                ok: true,
                data: outcome
            })?
        );
        return Ok(());
    }
    match outcome {
        RunOutcome::Skipped { version } => {
            println!("Version {version} already exists in reports directory.");
        }
        RunOutcome::Completed { version, records } => {
            println!(
                "Report written to: {}",
                reports_dir.join(report_filename(version)).display()
            );
            println!("Checked {} codes for version {version}.", records.len());
        }
    }
    Ok(())
}

pub fn print_problems(problems: &[&CodeRecord]) {
    println!("\nIssues detected with the following codes:\n");
    for record in problems {
        println!(
            "- {} ({}) in folder '{}'",
            record.code,
            record.effective_status(),
            record.folder
        );
    }
    println!("\nFailing workflow due to problem codes.\n");
}
