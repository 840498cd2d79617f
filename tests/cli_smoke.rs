//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stratus_against(server: &MockServer) -> Command {
    let mut cmd = cargo_bin_cmd!("stratus");
    cmd.env_remove("STRATUS_CONFIG_PATH")
        .env_remove("GOOGLE_APPLICATION_CREDENTIALS")
        .env("GCP_PROJECT_ID", "proj")
        .env("GCP_ACCESS_TOKEN", "test-token")
        .env("GCP_API_ROOT", server.uri())
        .env("RUST_LOG", "warn");
    cmd
}

async fn run(mut cmd: Command) -> assert_cmd::assert::Assert {
    tokio::task::spawn_blocking(move || cmd.assert())
        .await
        .unwrap_or_else(|err| panic!("join: {err}"))
}

#[test]
fn cli_without_arguments_prints_help_and_fails() {
    let mut cmd = cargo_bin_cmd!("stratus");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: stratus"));
}

#[tokio::test(flavor = "multi_thread")]
async fn bucket_list_prints_one_name_per_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "site-assets"}, {"name": "backups"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = stratus_against(&server);
    cmd.args(["bucket", "list"]);
    run(cmd)
        .await
        .success()
        .stdout("site-assets\nbackups\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_configuration_fails_with_actionable_message() {
    let server = MockServer::start().await;
    let mut cmd = stratus_against(&server);
    cmd.env("GCP_POLL_INTERVAL_SECS", "0").args(["instance", "create"]);

    run(cmd)
        .await
        .failure()
        .code(1)
        .stderr(predicate::str::contains("GCP_POLL_INTERVAL_SECS"));
    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn translate_prompts_for_missing_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/language/translate/v2"))
        .and(body_partial_json(json!({"q": "Good morning", "target": "fr"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [{
                "translatedText": "Bonjour",
                "detectedSourceLanguage": "en"
            }]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = stratus_against(&server);
    cmd.arg("translate").write_stdin("Good morning\nfr\n");

    run(cmd).await.success().stdout(
        predicate::str::contains("Enter the text to translate: ")
            .and(predicate::str::contains("Translation Successful!"))
            .and(predicate::str::contains("Original Text: Good morning"))
            .and(predicate::str::contains("Translated Text: Bonjour"))
            .and(predicate::str::contains("Detected Language: en")),
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_instance_delete_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(
            "/compute/v1/projects/proj/zones/us-central1-a/instances/vm-1",
        ))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let mut cmd = stratus_against(&server);
    cmd.args(["instance", "delete", "--name", "vm-1"]);
    run(cmd)
        .await
        .failure()
        .code(1)
        .stderr(predicate::str::contains("instance deletion failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unset_project_names_the_setting_to_provide() {
    let server = MockServer::start().await;
    let mut cmd = stratus_against(&server);
    cmd.env_remove("GCP_PROJECT_ID")
        .args(["instance", "create", "--name", "vm-1"]);

    run(cmd).await.failure().code(1).stderr(
        predicate::str::contains("set GCP_PROJECT_ID or add project_id")
            .and(predicate::str::contains("stratus.toml")),
    );
    assert!(
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn translate_needs_no_project() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/language/translate/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"translations": [{"translatedText": "Hola"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = stratus_against(&server);
    cmd.env_remove("GCP_PROJECT_ID")
        .args(["translate", "--text", "Hello", "--target", "es"]);

    run(cmd)
        .await
        .success()
        .stdout(predicate::str::contains("Translated Text: Hola"));
}
