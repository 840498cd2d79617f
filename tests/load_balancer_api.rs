//! Load-balancer chain behaviour against a mocked API.

#[path = "common/mock_api.rs"]
mod mock_api;

use std::time::Duration;

use mock_api::FAST_POLL;
use rstest::rstest;
use serde_json::json;
use stratus::{LoadBalancerClient, LoadBalancerError, LoadBalancerRequest};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GLOBAL: &str = "/compute/v1/projects/proj/global";

fn balancer(server: &MockServer) -> LoadBalancerClient {
    mock_api::clients(server)
        .load_balancer
        .with_poll_interval(FAST_POLL)
        .with_wait_timeout(Duration::from_secs(5))
}

async fn mount_insert(server: &MockServer, collection: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(format!("{GLOBAL}/{collection}")))
        .and(body_partial_json(body))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"name": format!("op-{collection}")})),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[rstest]
#[tokio::test]
async fn chain_is_created_in_order_and_waits_for_ip() {
    let server = MockServer::start().await;
    mount_insert(
        &server,
        "backendBuckets",
        json!({"name": "cdn", "bucketName": "site", "enableCdn": true}),
    )
    .await;
    mount_insert(
        &server,
        "urlMaps",
        json!({
            "name": "url-map-cdn",
            "defaultService": "projects/proj/global/backendBuckets/cdn",
            "hostRules": [{"hosts": ["example.com"], "pathMatcher": "path-matcher-cdn"}]
        }),
    )
    .await;
    mount_insert(
        &server,
        "targetHttpProxies",
        json!({
            "name": "target-http-proxy-cdn",
            "urlMap": "projects/proj/global/urlMaps/url-map-cdn"
        }),
    )
    .await;
    mount_insert(
        &server,
        "addresses",
        json!({"name": "ip-cdn", "addressType": "EXTERNAL"}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{GLOBAL}/addresses/ip-cdn")))
        .respond_with(ResponseTemplate::new(404).set_body_string("not yet"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{GLOBAL}/addresses/ip-cdn")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ip-cdn",
            "status": "RESERVING"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{GLOBAL}/addresses/ip-cdn")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "ip-cdn",
            "address": "203.0.113.7",
            "status": "RESERVED"
        })))
        .mount(&server)
        .await;
    mount_insert(
        &server,
        "forwardingRules",
        json!({
            "name": "forwarding-rule-cdn",
            "IPAddress": "203.0.113.7",
            "IPProtocol": "TCP",
            "portRange": "80",
            "target": "projects/proj/global/targetHttpProxies/target-http-proxy-cdn"
        }),
    )
    .await;

    let request = LoadBalancerRequest::new("site", "cdn", Some(String::from("example.com")));
    let ip = balancer(&server)
        .create(&request)
        .await
        .unwrap_or_else(|err| panic!("create: {err}"));
    assert_eq!(ip, "203.0.113.7");

    let address = format!("GET {GLOBAL}/addresses/ip-cdn");
    assert_eq!(
        mock_api::request_log(&server).await,
        vec![
            format!("POST {GLOBAL}/backendBuckets"),
            format!("POST {GLOBAL}/urlMaps"),
            format!("POST {GLOBAL}/targetHttpProxies"),
            format!("POST {GLOBAL}/addresses"),
            address.clone(),
            address.clone(),
            address.clone(),
            address,
            format!("POST {GLOBAL}/forwardingRules"),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn non_404_address_errors_propagate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{GLOBAL}/addresses/ip-cdn")))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = balancer(&server)
        .wait_for_address("ip-cdn")
        .await
        .expect_err("server error");
    let LoadBalancerError::Api(api) = err else {
        panic!("expected an API error");
    };
    assert_eq!(api.status(), Some(500));
}

#[rstest]
#[tokio::test]
async fn address_wait_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{GLOBAL}/addresses/ip-cdn")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = mock_api::clients(&server)
        .load_balancer
        .with_poll_interval(FAST_POLL)
        .with_wait_timeout(Duration::from_millis(50));
    let err = client
        .wait_for_address("ip-cdn")
        .await
        .expect_err("never allocated");
    assert_eq!(
        err,
        LoadBalancerError::Timeout {
            address: String::from("ip-cdn")
        }
    );
}

#[rstest]
#[tokio::test]
async fn failed_step_stops_the_chain() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{GLOBAL}/backendBuckets")))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .expect(1)
        .mount(&server)
        .await;

    let clients = mock_api::clients(&server);
    let ip = stratus::actions::create_load_balancer(
        Some(&clients.load_balancer),
        &LoadBalancerRequest::new("site", "cdn", None),
    )
    .await;
    assert_eq!(ip, None);
    assert_eq!(
        mock_api::request_log(&server).await,
        vec![format!("POST {GLOBAL}/backendBuckets")]
    );
}
