use clap::Parser;
use std::time::Duration;

mod cli;
mod domain;
mod services;

use cli::Cli;
use domain::models::RunOutcome;
use services::config::{load_credentials, load_settings};
use services::output::{print_outcome, print_problems};
use services::runner::{problem_records, run};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli.config)?;
    let credentials = load_credentials(&cli.credentials)?;
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("dmdwatch/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;

    let outcome = run(
        &client,
        &settings,
        &credentials,
        cli.mode,
        &cli.reports_dir,
    )?;
    print_outcome(cli.json, &outcome, &cli.reports_dir)?;

    if cli.fail_on_problem {
        if let RunOutcome::Completed { records, .. } = &outcome {
            let problems = problem_records(records);
            if !problems.is_empty() {
                print_problems(&problems);
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
