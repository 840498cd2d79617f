//! Compute Engine client behaviour against a mocked API.

#[path = "common/mock_api.rs"]
mod mock_api;

use std::time::Duration;

use mock_api::{FAST_POLL, TOKEN, ZONE};
use rstest::rstest;
use serde_json::json;
use stratus::{ComputeClient, ComputeError, InstanceBackend};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INSTANCES: &str = "/compute/v1/projects/proj/zones/us-central1-a/instances";
const OPERATION: &str = "/compute/v1/projects/proj/zones/us-central1-a/operations/op-1";

fn compute(server: &MockServer) -> ComputeClient {
    mock_api::clients(server)
        .compute
        .with_poll_interval(FAST_POLL)
        .with_wait_timeout(Duration::from_secs(5))
}

async fn mount_operation(server: &MockServer, statuses: &[&str]) {
    for status in statuses {
        Mock::given(method("GET"))
            .and(path(OPERATION))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "op-1", "status": status})),
            )
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

#[rstest]
#[tokio::test]
async fn create_inserts_then_polls_until_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INSTANCES))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "op-1", "status": "PENDING"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_operation(&server, &["PENDING", "RUNNING", "DONE"]).await;

    let client = compute(&server);
    let request = mock_api::config(&server)
        .as_instance_request(Some("vm-1"))
        .unwrap_or_else(|err| panic!("request: {err}"));
    let name = client
        .create_instance(&request)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    assert_eq!(name, "vm-1");
    assert_eq!(
        mock_api::request_log(&server).await,
        vec![
            format!("POST {INSTANCES}"),
            format!("GET {OPERATION}"),
            format!("GET {OPERATION}"),
            format!("GET {OPERATION}"),
        ]
    );

    let requests = server.received_requests().await.unwrap_or_default();
    let insert = requests
        .first()
        .unwrap_or_else(|| panic!("insert request missing"));
    assert!(
        insert.url.query_pairs().any(|(key, _)| key == "requestId"),
        "insert should carry a request id"
    );
    let body: serde_json::Value =
        serde_json::from_slice(&insert.body).unwrap_or_else(|err| panic!("body: {err}"));
    assert_eq!(body["name"], "vm-1");
    assert_eq!(
        body["machineType"],
        "zones/us-central1-a/machineTypes/n1-standard-1"
    );
    assert_eq!(body["disks"][0]["initializeParams"]["diskSizeGb"], "10");
}

#[rstest]
#[tokio::test]
async fn failed_operation_reports_provider_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(INSTANCES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "op-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(OPERATION))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "op-1",
            "status": "DONE",
            "error": {"errors": [{"code": "ZONE_RESOURCE_POOL_EXHAUSTED", "message": "try later"}]}
        })))
        .mount(&server)
        .await;

    let request = mock_api::config(&server)
        .as_instance_request(None)
        .unwrap_or_else(|err| panic!("request: {err}"));
    let err = compute(&server)
        .create_instance(&request)
        .await
        .expect_err("operation failed");
    assert_eq!(
        err,
        ComputeError::OperationFailed {
            operation: String::from("op-1"),
            message: String::from("ZONE_RESOURCE_POOL_EXHAUSTED: try later"),
        }
    );
}

#[rstest]
#[tokio::test]
async fn wait_gives_up_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OPERATION))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "op-1", "status": "RUNNING"})),
        )
        .mount(&server)
        .await;

    let client = mock_api::clients(&server)
        .compute
        .with_poll_interval(FAST_POLL)
        .with_wait_timeout(Duration::from_millis(50));
    let err = client
        .wait_for_operation(mock_api::PROJECT, ZONE, "op-1")
        .await
        .expect_err("operation never finishes");
    assert!(matches!(err, ComputeError::Timeout { .. }), "{err}");
}

#[rstest]
#[tokio::test]
async fn list_running_follows_pages_and_filters_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INSTANCES))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"name": "vm-3", "status": "RUNNING"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(INSTANCES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"name": "vm-1", "status": "RUNNING"},
                {"name": "vm-2", "status": "TERMINATED"}
            ],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let running = compute(&server)
        .list_running(ZONE)
        .await
        .unwrap_or_else(|err| panic!("list: {err}"));
    assert_eq!(running, vec![String::from("vm-1"), String::from("vm-3")]);
}

#[rstest]
#[tokio::test]
async fn terminate_deletes_then_waits() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{INSTANCES}/vm-1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "op-1"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_operation(&server, &["DONE"]).await;

    compute(&server)
        .terminate_instance(ZONE, "vm-1")
        .await
        .unwrap_or_else(|err| panic!("terminate: {err}"));
    assert_eq!(
        mock_api::request_log(&server).await,
        vec![format!("DELETE {INSTANCES}/vm-1"), format!("GET {OPERATION}")]
    );
}

#[rstest]
#[tokio::test]
async fn api_errors_keep_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INSTANCES))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let err = compute(&server)
        .list_instances(ZONE)
        .await
        .expect_err("forbidden");
    let ComputeError::Api(api) = err else {
        panic!("expected an API error");
    };
    assert_eq!(api.status(), Some(403));
    assert!(api.to_string().contains("permission denied"));
}

#[rstest]
#[tokio::test]
async fn create_polls_the_operation_in_the_request_project() {
    let server = MockServer::start().await;
    let other_instances = "/compute/v1/projects/other/zones/us-central1-a/instances";
    let other_operation = "/compute/v1/projects/other/zones/us-central1-a/operations/op-1";
    Mock::given(method("POST"))
        .and(path(other_instances))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "op-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(other_operation))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": "op-1", "status": "DONE"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut request = mock_api::config(&server)
        .as_instance_request(Some("vm-other"))
        .unwrap_or_else(|err| panic!("request: {err}"));
    request.project_id = String::from("other");
    let name = compute(&server)
        .create_instance(&request)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));

    assert_eq!(name, "vm-other");
    assert_eq!(
        mock_api::request_log(&server).await,
        vec![format!("POST {other_instances}"), format!("GET {other_operation}")]
    );
}
