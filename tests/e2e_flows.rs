use predicates::str::contains;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::TestEnv;

// The binary is synchronous, so the mock server runs on its own multithreaded
// runtime while the tests drive the real binary as a subprocess.
fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("build runtime")
}

fn lookup_success_entry(code: &str, inactive: bool) -> Value {
    json!({
        "response": { "status": "200" },
        "resource": {
            "resourceType": "Parameters",
            "parameter": [
                { "name": "code", "valueCode": code },
                { "name": "display", "valueString": "Some product" },
                {
                    "name": "property",
                    "part": [
                        { "name": "code", "valueCode": "inactive" },
                        { "name": "value", "valueBoolean": inactive }
                    ]
                }
            ]
        }
    })
}

fn batch_response(entries: Vec<Value>) -> Value {
    json!({ "resourceType": "Bundle", "type": "batch-response", "entry": entries })
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": "test-token" })),
        )
        .mount(server)
        .await;
}

async fn mount_version_lookup(server: &MockServer, version: &str) {
    Mock::given(method("POST"))
        .and(path("/fhir/CodeSystem/$lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Parameters",
            "parameter": [
                { "name": "name", "valueString": "dm+d" },
                { "name": "version", "valueString": version }
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_measure_repo(server: &MockServer, sql_text: &str) {
    Mock::given(method("GET"))
        .and(path("/repo/contents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "measureA", "type": "dir" },
            { "name": "README.md", "type": "file" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repo/contents/measureA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "notes.txt", "type": "file" },
            { "name": "codes.sql", "type": "file" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/measureA/codes.sql"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sql_text))
        .mount(server)
        .await;
}

async fn mount_batch(server: &MockServer, response: Value) {
    Mock::given(method("POST"))
        .and(path("/fhir"))
        .respond_with(ResponseTemplate::new(200).set_body_json(response))
        .mount(server)
        .await;
}

/// Full stack for the standard scenario: folder measureA yields 1112223 and
/// 4445556; the batch marks 1112223 inactive and says nothing about 4445556.
async fn start_problem_stack(version: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_version_lookup(&server, version).await;
    mount_measure_repo(&server, "SELECT * FROM vmp WHERE id IN (1112223, 4445556)").await;
    mount_batch(
        &server,
        batch_response(vec![lookup_success_entry("1112223", true)]),
    )
    .await;
    server
}

fn requests_to(rt: &tokio::runtime::Runtime, server: &MockServer, req_path: &str) -> usize {
    rt.block_on(server.received_requests())
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == req_path)
        .count()
}

#[test]
fn problem_codes_fail_the_run_and_land_in_the_report() {
    let rt = runtime();
    let server = rt.block_on(start_problem_stack("2025.03"));
    let env = TestEnv::new(&server.uri());

    env.cmd()
        .arg("--fail-on-problem")
        .assert()
        .code(1)
        .stdout(contains("Issues detected with the following codes:"))
        .stdout(contains("- 1112223 (inactive) in folder 'measureA'"))
        .stdout(contains("- 4445556 (unknown) in folder 'measureA'"));

    let html = env.report_html("dmd_lookup_report_2025_03.html");
    let unknown = html.find("Unknown codes").unwrap();
    let inactive = html.find("Inactive codes").unwrap();
    let code_unknown = html.find("<li>4445556</li>").unwrap();
    let code_inactive = html.find("<li>1112223</li>").unwrap();
    assert!(unknown < code_unknown && code_unknown < inactive);
    assert!(inactive < code_inactive);
    assert!(html.contains(">measureA</a>"));

    // the failed exit must not corrupt what was already written
    assert_eq!(env.report_html("dmd_lookup_report_latest.html"), html);
    let index = env.report_html("list_dmd_lookup_reports.html");
    assert!(index.contains("2025.03 &larr; Latest"));
}

#[test]
fn auto_mode_skips_a_version_that_already_has_a_report() {
    let rt = runtime();
    let server = rt.block_on(start_problem_stack("2025.03"));
    let env = TestEnv::new(&server.uri());

    env.cmd()
        .assert()
        .success()
        .stdout(contains("Report written to:"));
    env.cmd()
        .assert()
        .success()
        .stdout(contains("Version 2025.03 already exists in reports directory."));

    // the second run never touched the repository or the batch endpoint
    assert_eq!(requests_to(&rt, &server, "/repo/contents"), 1);
    assert_eq!(requests_to(&rt, &server, "/fhir"), 1);
}

#[test]
fn force_mode_reruns_an_existing_version() {
    let rt = runtime();
    let server = rt.block_on(start_problem_stack("2025.03"));
    let env = TestEnv::new(&server.uri());

    env.cmd().assert().success();
    env.cmd()
        .args(["--mode", "force"])
        .assert()
        .success()
        .stdout(contains("Report written to:"));

    assert_eq!(requests_to(&rt, &server, "/repo/contents"), 2);
}

#[test]
fn healthy_codes_pass_under_fail_on_problem() {
    let rt = runtime();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_version_lookup(&server, "2025.03").await;
        mount_measure_repo(&server, "WHERE id IN (1112223, 4445556)").await;
        mount_batch(
            &server,
            batch_response(vec![
                lookup_success_entry("1112223", false),
                lookup_success_entry("4445556", false),
            ]),
        )
        .await;
        server
    });
    let env = TestEnv::new(&server.uri());

    let assert = env.cmd().arg("--fail-on-problem").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("Issues detected"));

    let html = env.report_html("dmd_lookup_report_latest.html");
    let active = html.find("Active codes").unwrap();
    assert!(html.find("<li>1112223</li>").unwrap() > active);
    assert!(html.find("<li>4445556</li>").unwrap() > active);
}

#[test]
fn json_summary_reports_outcomes() {
    let rt = runtime();
    let server = rt.block_on(start_problem_stack("2025.03"));
    let env = TestEnv::new(&server.uri());

    let assert = env.cmd().arg("--json").assert().success();
    let out: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    assert_eq!(out["ok"], true);
    assert_eq!(out["data"]["outcome"], "completed");
    assert_eq!(out["data"]["version"], "2025.03");
    assert_eq!(out["data"]["records"].as_array().unwrap().len(), 2);

    let assert = env.cmd().arg("--json").assert().success();
    let out: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    assert_eq!(out["data"]["outcome"], "skipped");
}

#[test]
fn a_failing_folder_listing_skips_only_that_folder() {
    let rt = runtime();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_version_lookup(&server, "2025.03").await;
        Mock::given(method("GET"))
            .and(path("/repo/contents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "measureA", "type": "dir" },
                { "name": "measureB", "type": "dir" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repo/contents/measureA"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "codes.sql", "type": "file" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repo/contents/measureB"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/raw/measureA/codes.sql"))
            .respond_with(ResponseTemplate::new(200).set_body_string("id = 1112223"))
            .mount(&server)
            .await;
        mount_batch(
            &server,
            batch_response(vec![lookup_success_entry("1112223", false)]),
        )
        .await;
        server
    });
    let env = TestEnv::new(&server.uri());

    env.cmd().assert().success();
    let html = env.report_html("dmd_lookup_report_latest.html");
    assert!(html.contains("<li>1112223</li>"));
    assert!(!html.contains("measureB"));
}

#[test]
fn token_endpoint_failure_aborts_the_run() {
    let rt = runtime();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;
        server
    });
    let env = TestEnv::new(&server.uri());

    env.cmd()
        .assert()
        .failure()
        .stderr(contains("failed to obtain token"))
        .stderr(contains("401"));
    assert!(!env.reports.exists());
}

#[test]
fn directory_listing_failure_is_fatal() {
    let rt = runtime();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_version_lookup(&server, "2025.03").await;
        Mock::given(method("GET"))
            .and(path("/repo/contents"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;
        server
    });
    let env = TestEnv::new(&server.uri());

    env.cmd()
        .assert()
        .failure()
        .stderr(contains("failed to fetch directory listing"))
        .stderr(contains("503"));
}
