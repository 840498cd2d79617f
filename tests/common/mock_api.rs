//! Shared helpers for tests that talk to a `wiremock` stand-in for the
//! Google APIs.
//!
//! Include from a top-level test file with:
//!
//! ```rust
//! #[path = "common/mock_api.rs"]
//! mod mock_api;
//! ```

use std::time::Duration;

use stratus::{Clients, GcpConfig};
use wiremock::MockServer;

/// Project used by every mocked request.
pub const PROJECT: &str = "proj";
/// Zone used by every mocked request.
pub const ZONE: &str = "us-central1-a";
/// Bearer token sent by clients built from [`config`].
pub const TOKEN: &str = "test-token";
/// Poll interval short enough to keep wait loops fast.
pub const FAST_POLL: Duration = Duration::from_millis(10);

/// Configuration rooting every service at the mock server with a static
/// access token.
pub fn config(server: &MockServer) -> GcpConfig {
    GcpConfig {
        access_token: Some(String::from(TOKEN)),
        api_root: Some(server.uri()),
        zone: String::from(ZONE),
        ..GcpConfig::for_project(PROJECT)
    }
}

/// Clients rooted at the mock server.
pub fn clients(server: &MockServer) -> Clients {
    Clients::initialize(&config(server)).unwrap_or_else(|err| panic!("clients: {err}"))
}

/// Paths of the requests the server received, in arrival order, each
/// prefixed with its method.
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect()
}
