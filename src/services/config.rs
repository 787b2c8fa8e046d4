use anyhow::Context;
use ini::Ini;
use serde::Deserialize;
use std::path::Path;

/// OAuth client credentials, read from a JSON file kept outside the repo.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "CLIENT_SECRET")]
    pub client_secret: String,
}

pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading credentials file {}", path.display()))?;
    let creds: Credentials = serde_json::from_str(&raw)
        .with_context(|| format!("parsing credentials file {}", path.display()))?;
    Ok(creds)
}

/// All endpoint and rendering settings, resolved once at startup and passed
/// into each service. Every key in the INI file is optional; absent keys fall
/// back to the production defaults below.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Prefix prepended to report links so GitHub-hosted HTML renders in a viewer.
    pub preview_base_url: String,
    /// Browsable base URL of the published reports directory.
    pub report_repo_url: String,
    pub token_url: String,
    pub fhir_base_url: String,
    /// GitHub contents-API URL of the measures directory to walk.
    pub repo_api_url: String,
    /// Raw-content base URL for fetching SQL file bodies.
    pub raw_base_url: String,
    /// Browsable base URL for linking back to a measure folder.
    pub repo_html_url: String,
    pub code_system_url: String,
    /// Known-good dm+d code used to read the current release version.
    pub anchor_code: String,
    /// Text file holding a base64 data URI for the report header logo.
    pub logo_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_base_url: String::new(),
            report_repo_url: "https://github.com/chrisjwood16/dmd_tests/blob/main/reports/"
                .to_string(),
            token_url: "https://ontology.nhs.uk/authorisation/auth/realms/nhs-digital-terminology/protocol/openid-connect/token".to_string(),
            fhir_base_url: "https://ontology.nhs.uk/production1/fhir".to_string(),
            repo_api_url: "https://api.github.com/repos/bennettoxford/openprescribing-hospitals/contents/viewer/measures".to_string(),
            raw_base_url: "https://raw.githubusercontent.com/bennettoxford/openprescribing-hospitals/main/viewer/measures".to_string(),
            repo_html_url: "https://github.com/bennettoxford/openprescribing-hospitals/tree/main/viewer/measures".to_string(),
            code_system_url: "https://dmd.nhs.uk".to_string(),
            anchor_code: "96062004".to_string(),
            logo_path: "src/base64_image.txt".to_string(),
        }
    }
}

impl Settings {
    pub fn lookup_url(&self) -> String {
        format!("{}/CodeSystem/$lookup", self.fhir_base_url)
    }

    /// Batch bundles go to the FHIR root endpoint.
    pub fn batch_url(&self) -> String {
        self.fhir_base_url.clone()
    }
}

/// Loads settings from an INI file. Keys live under `[DEFAULT]` (general
/// section accepted as a fallback). A missing file yields all defaults; a
/// present but unreadable file is fatal.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let conf = Ini::load_from_file(path)
        .map_err(|e| anyhow::anyhow!("parsing config file {}: {}", path.display(), e))?;

    let get = |key: &str| -> Option<String> {
        conf.section(Some("DEFAULT"))
            .and_then(|s| s.get(key))
            .or_else(|| conf.general_section().get(key))
            .map(|v| v.trim().to_string())
    };

    let mut settings = Settings::default();
    if let Some(v) = get("preview_base_url") {
        settings.preview_base_url = v;
    }
    if let Some(v) = get("report_repo_url") {
        settings.report_repo_url = v;
    }
    if let Some(v) = get("token_url") {
        settings.token_url = v;
    }
    if let Some(v) = get("fhir_base_url") {
        settings.fhir_base_url = v;
    }
    if let Some(v) = get("repo_api_url") {
        settings.repo_api_url = v;
    }
    if let Some(v) = get("raw_base_url") {
        settings.raw_base_url = v;
    }
    if let Some(v) = get("repo_html_url") {
        settings.repo_html_url = v;
    }
    if let Some(v) = get("code_system_url") {
        settings.code_system_url = v;
    }
    if let Some(v) = get("anchor_code") {
        settings.anchor_code = v;
    }
    if let Some(v) = get("logo_path") {
        settings.logo_path = v;
    }
    Ok(settings)
}
