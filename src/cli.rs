use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dmdwatch",
    version,
    about = "Checks dm+d codes from OpenPrescribing Hospitals measures against the NHS Terminology Server and publishes HTML status reports"
)]
pub struct Cli {
    #[arg(
        long,
        value_enum,
        default_value_t = Mode::Auto,
        help = "auto: skip when a report for the current version exists; force: always run"
    )]
    pub mode: Mode,
    #[arg(
        long,
        default_value_t = false,
        help = "Exit non-zero if any code is inactive or unknown"
    )]
    pub fail_on_problem: bool,
    #[arg(long, help = "Output a machine-readable JSON run summary")]
    pub json: bool,
    #[arg(long, default_value = "src/config.ini", help = "INI settings file")]
    pub config: PathBuf,
    #[arg(
        long,
        default_value = "credentials.json",
        help = "JSON file with CLIENT_ID and CLIENT_SECRET"
    )]
    pub credentials: PathBuf,
    #[arg(long, default_value = "reports", help = "Directory for rendered reports")]
    pub reports_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Auto,
    Force,
}
