use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Isolated filesystem fixture: a settings file pointing every endpoint at a
/// mock server, a credentials file, and an empty reports directory.
pub struct TestEnv {
    _tmp: TempDir,
    pub config: PathBuf,
    pub credentials: PathBuf,
    pub reports: PathBuf,
}

impl TestEnv {
    pub fn new(base_url: &str) -> Self {
        let tmp = TempDir::new().expect("create temp dir");

        let config = tmp.path().join("config.ini");
        fs::write(
            &config,
            format!(
                "[DEFAULT]\n\
                 preview_base_url = https://preview.example/?url=\n\
                 report_repo_url = https://github.example/reports/\n\
                 token_url = {base_url}/auth/token\n\
                 fhir_base_url = {base_url}/fhir\n\
                 repo_api_url = {base_url}/repo/contents\n\
                 raw_base_url = {base_url}/raw\n\
                 repo_html_url = https://github.example/tree/main/measures\n\
                 anchor_code = 96062004\n"
            ),
        )
        .expect("write config fixture");

        let credentials = tmp.path().join("credentials.json");
        fs::write(
            &credentials,
            r#"{"CLIENT_ID": "test-client", "CLIENT_SECRET": "test-secret"}"#,
        )
        .expect("write credentials fixture");

        let reports = tmp.path().join("reports");

        Self {
            _tmp: tmp,
            config,
            credentials,
            reports,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dmdwatch").expect("binary builds");
        cmd.arg("--config")
            .arg(&self.config)
            .arg("--credentials")
            .arg(&self.credentials)
            .arg("--reports-dir")
            .arg(&self.reports);
        cmd
    }

    pub fn report_html(&self, filename: &str) -> String {
        fs::read_to_string(self.reports.join(filename)).expect("report file exists")
    }
}
