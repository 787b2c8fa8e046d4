use crate::domain::models::{CodeRecord, CodeStatus};
use crate::services::config::Settings;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const LATEST_FILENAME: &str = "dmd_lookup_report_latest.html";
pub const INDEX_FILENAME: &str = "list_dmd_lookup_reports.html";

/// Status sections render in this fixed order.
const STATUS_ORDER: [(CodeStatus, &str); 3] = [
    (CodeStatus::Unknown, "Unknown codes"),
    (CodeStatus::Inactive, "Inactive codes"),
    (CodeStatus::Active, "Active codes"),
];

const REPORT_CSS: &str = r#"
        body {
            font-family: Arial, sans-serif;
            background-color: #f8f9fa;
            margin: 20px;
        }
        .container {
            max-width: 900px;
            margin: 0 auto;
            padding: 20px;
            background-color: white;
            border-radius: 10px;
            box-shadow: 0 2px 5px rgba(0,0,0,0.1);
        }
        header {
            text-align: center;
            margin-bottom: 30px;
        }
        header img {
            max-width: 650px;
        }
        h2 {
            color: #222;
            margin-top: 40px;
        }
        h3 {
            margin-top: 30px;
            color: #444;
        }
        ul {
            padding-left: 20px;
        }
        li {
            margin-bottom: 4px;
        }
        .status-box {
            display: inline-block;
            padding: 3px 10px;
            border-radius: 5px;
            font-size: 0.9em;
        }
        .active { background-color: #d7f0d2; color: #0f7b0f; }
        .inactive { background-color: #fbdcdc; color: #b30000; }
        .unknown { background-color: #fff6cc; color: #cc7a00; }
"#;

const INDEX_CSS: &str = r#"
        body {
            font-family: Arial, sans-serif;
            background-color: #f8f9fa;
            margin: 20px;
        }
        .container {
            max-width: 800px;
            margin: 0 auto;
            padding: 20px;
            background-color: white;
            border-radius: 10px;
            box-shadow: 0 2px 5px rgba(0,0,0,0.1);
        }
        header {
            text-align: center;
            margin-bottom: 40px;
        }
        header img {
            max-width: 650px;
            margin-bottom: 10px;
        }
        h2 {
            color: #333;
        }
        ul {
            padding-left: 20px;
        }
        li {
            margin-bottom: 10px;
        }
        a {
            text-decoration: none;
            color: #0485d1;
        }
        a:hover {
            text-decoration: underline;
        }
"#;

/// Version-stamped report filename: dots in the version become underscores.
pub fn report_filename(version: &str) -> String {
    format!("dmd_lookup_report_{}.html", version.replace('.', "_"))
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^dmd_lookup_report_([\d_]+)\.html$").expect("valid filename pattern")
    })
}

/// Recovers the version from a version-stamped report filename, or `None` for
/// anything else (including the fixed "latest" filename).
pub fn version_from_filename(filename: &str) -> Option<String> {
    filename_pattern()
        .captures(filename)
        .map(|c| c[1].replace('_', "."))
}

/// Sort key for index ordering: the numeric components of a version, compared
/// lexicographically. Orders both `YYYYMM.x.y` releases and plain `YYYY.MM`
/// version strings correctly.
pub fn version_sort_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .filter_map(|part| part.parse::<u64>().ok())
        .collect()
}

fn grouped_by_folder<'a>(
    records: &'a [CodeRecord],
    status: CodeStatus,
) -> BTreeMap<&'a str, Vec<&'a CodeRecord>> {
    let mut folders: BTreeMap<&str, Vec<&CodeRecord>> = BTreeMap::new();
    for record in records {
        if record.effective_status() == status {
            folders.entry(record.folder.as_str()).or_default().push(record);
        }
    }
    folders
}

fn load_logo(settings: &Settings) -> Option<String> {
    // Reports stay usable without branding if the logo file is absent.
    std::fs::read_to_string(&settings.logo_path)
        .ok()
        .map(|s| s.trim().to_string())
}

fn header_image(logo: &Option<String>) -> String {
    match logo {
        Some(data) => format!("<img src=\"{data}\" alt=\"OpenPrescribing logo\" />\n"),
        None => String::new(),
    }
}

fn render_status_section(
    label: &str,
    status: CodeStatus,
    folders: &BTreeMap<&str, Vec<&CodeRecord>>,
) -> String {
    let css_class = status.as_str();
    let mut badge = css_class.to_string();
    badge[..1].make_ascii_uppercase();

    let mut section = format!(
        "<details open>\n<summary><h2>{label} <span class='status-box {css_class}'>{badge}</span></h2></summary>\n"
    );
    if folders.is_empty() {
        section.push_str("<p>No codes found.</p>\n");
    } else {
        for (folder, records) in folders {
            section.push_str(&format!(
                "<h3>Folder: <a href='{}'>{}</a></h3>\n<ul>\n",
                records[0].url, folder
            ));
            for record in records {
                section.push_str(&format!("<li>{}</li>\n", record.code));
            }
            section.push_str("</ul>\n");
        }
    }
    section.push_str("</details>\n");
    section
}

/// Renders the grouped lookup report and writes it twice: version-stamped and
/// as the fixed "latest" filename. Returns the version-stamped path.
pub fn write_lookup_report(
    records: &[CodeRecord],
    version: &str,
    settings: &Settings,
    reports_dir: &Path,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(reports_dir)?;

    let index_link = format!(
        "{}{}{}",
        settings.preview_base_url, settings.report_repo_url, INDEX_FILENAME
    );
    let mut page = format!(
        r#"<html>
<head>
<title>dm+d Lookup Report - version {version}</title>
<style>{REPORT_CSS}</style>
</head>
<body>
<div class="container">
<header>
{logo}<h2>dm+d Lookup Report - version {version}</h2>
<div class="back-link"><p><a href="{index_link}">&larr; Back to all reports</a></p></div>
<p>This report lists all dm+d codes extracted from SQL files in OpenPrescribing Hospitals and their lookup status via the NHS Terminology Server.</p>
</header>
"#,
        logo = header_image(&load_logo(settings)),
    );

    for (status, label) in STATUS_ORDER {
        page.push_str(&render_status_section(
            label,
            status,
            &grouped_by_folder(records, status),
        ));
    }
    page.push_str("</div>\n</body>\n</html>\n");

    let stamped = reports_dir.join(report_filename(version));
    std::fs::write(&stamped, &page)?;
    std::fs::write(reports_dir.join(LATEST_FILENAME), &page)?;
    Ok(stamped)
}

/// Rebuilds the index page listing every version-stamped report, newest first,
/// with the newest marked as latest.
pub fn write_report_index(settings: &Settings, reports_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(reports_dir)?;

    let mut versions: Vec<(Vec<u64>, String, String)> = Vec::new();
    for entry in std::fs::read_dir(reports_dir)? {
        let entry = entry?;
        let filename = entry.file_name().to_string_lossy().to_string();
        if let Some(version) = version_from_filename(&filename) {
            let key = version_sort_key(&version);
            if !key.is_empty() {
                versions.push((key, version, filename));
            }
        }
    }
    versions.sort();
    versions.reverse();

    let mut page = format!(
        r#"<html>
<head>
<title>dm+d Lookup Reports</title>
<style>{INDEX_CSS}</style>
</head>
<body>
<div class="container">
<header>
{logo}<h2>dm+d Lookup Reports Index</h2>
</header>
<ul>
"#,
        logo = header_image(&load_logo(settings)),
    );

    for (i, (_, version, filename)) in versions.iter().enumerate() {
        let label = if i == 0 {
            format!("{version} &larr; Latest")
        } else {
            version.clone()
        };
        page.push_str(&format!(
            "<li><a href=\"{}{}{}\">{}</a></li>\n",
            settings.preview_base_url, settings.report_repo_url, filename, label
        ));
    }
    page.push_str("</ul>\n</div>\n</body>\n</html>\n");

    let path = reports_dir.join(INDEX_FILENAME);
    std::fs::write(&path, page)?;
    Ok(path)
}
