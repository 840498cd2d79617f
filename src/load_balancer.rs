//! Global HTTP load balancer serving a Cloud Storage bucket.
//!
//! The chain is created one resource at a time: backend bucket, URL map,
//! target HTTP proxy, global address and forwarding rule. Only the address
//! lookup is polled; every insert is issued once.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::backend::{BackendFuture, LoadBalancerBackend};
use crate::compute::{POLL_INTERVAL, WAIT_TIMEOUT};

/// Port served by the forwarding rule.
pub const HTTP_PORT_RANGE: &str = "80";

/// Errors raised while building the load-balancer chain.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum LoadBalancerError {
    /// Raised when the request names an empty bucket.
    #[error("invalid load balancer request: {0}")]
    Validation(String),
    /// Raised when the address has no IP before the timeout.
    #[error("timeout waiting for global address {address}")]
    Timeout {
        /// Address resource name.
        address: String,
    },
    /// Wrapper for API level failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Names the resources of one load balancer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadBalancerRequest {
    /// Bucket served by the load balancer.
    pub bucket_name: String,
    /// Name of the backend bucket resource wrapping it.
    pub backend_bucket_name: String,
    /// Optional host routed through a host rule.
    pub domain: Option<String>,
}

impl LoadBalancerRequest {
    /// Creates a request; an empty domain is treated as absent.
    #[must_use]
    pub fn new(
        bucket_name: impl Into<String>,
        backend_bucket_name: impl Into<String>,
        domain: Option<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            backend_bucket_name: backend_bucket_name.into(),
            domain: domain.filter(|value| !value.trim().is_empty()),
        }
    }

    /// URL map resource name.
    #[must_use]
    pub fn url_map_name(&self) -> String {
        format!("url-map-{}", self.backend_bucket_name)
    }

    /// Target HTTP proxy resource name.
    #[must_use]
    pub fn proxy_name(&self) -> String {
        format!("target-http-proxy-{}", self.backend_bucket_name)
    }

    /// Global address resource name.
    #[must_use]
    pub fn address_name(&self) -> String {
        format!("ip-{}", self.backend_bucket_name)
    }

    /// Forwarding rule resource name.
    #[must_use]
    pub fn forwarding_rule_name(&self) -> String {
        format!("forwarding-rule-{}", self.backend_bucket_name)
    }

    fn validate(&self) -> Result<(), LoadBalancerError> {
        for (field, value) in [
            ("bucket name", &self.bucket_name),
            ("backend bucket name", &self.backend_bucket_name),
        ] {
            if value.trim().is_empty() {
                return Err(LoadBalancerError::Validation(field.to_owned()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackendBucketResource<'a> {
    name: &'a str,
    bucket_name: &'a str,
    enable_cdn: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HostRule {
    hosts: Vec<String>,
    path_matcher: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PathMatcher {
    name: String,
    default_service: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UrlMapResource {
    name: String,
    default_service: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    host_rules: Vec<HostRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    path_matchers: Vec<PathMatcher>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetHttpProxyResource {
    name: String,
    url_map: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddressResource {
    name: String,
    address_type: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct ForwardingRuleResource {
    name: String,
    #[serde(rename = "IPAddress")]
    ip_address: String,
    #[serde(rename = "IPProtocol")]
    ip_protocol: &'static str,
    #[serde(rename = "portRange")]
    port_range: &'static str,
    target: String,
}

/// Global address as returned by the API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Address {
    /// Resource name.
    pub name: String,
    /// Allocated IP, absent while allocation is pending.
    #[serde(default)]
    pub address: Option<String>,
    /// Allocation status.
    #[serde(default)]
    pub status: Option<String>,
}

// Insert responses are operations; the chain does not wait on them.
#[derive(Debug, Deserialize)]
struct InsertResponse {
    #[serde(default)]
    name: Option<String>,
}

/// Client for the global load-balancing resources of one project.
#[derive(Clone, Debug)]
pub struct LoadBalancerClient {
    api: ApiClient,
    project_id: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl LoadBalancerClient {
    /// Creates a client on the Compute Engine API root.
    #[must_use]
    pub fn new(api: ApiClient, project_id: impl Into<String>) -> Self {
        Self {
            api,
            project_id: project_id.into(),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }

    /// Overrides the address polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the address wait timeout.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    fn global_path(&self, collection: &str, name: &str) -> String {
        format!("projects/{}/global/{collection}/{name}", self.project_id)
    }

    async fn insert<B: Serialize + Sync>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<(), LoadBalancerError> {
        let url = self
            .api
            .url(&["projects", self.project_id.as_str(), "global", collection])?;
        let response: InsertResponse = self.api.post_json(&url, body).await?;
        debug!(collection, operation = ?response.name, "insert accepted");
        Ok(())
    }

    fn url_map(&self, request: &LoadBalancerRequest) -> UrlMapResource {
        let service = self.global_path("backendBuckets", &request.backend_bucket_name);
        let (host_rules, path_matchers) = request.domain.as_ref().map_or_else(
            || (Vec::new(), Vec::new()),
            |domain| {
                let matcher = format!("path-matcher-{}", request.backend_bucket_name);
                (
                    vec![HostRule {
                        hosts: vec![domain.clone()],
                        path_matcher: matcher.clone(),
                    }],
                    vec![PathMatcher {
                        name: matcher,
                        default_service: service.clone(),
                    }],
                )
            },
        );
        UrlMapResource {
            name: request.url_map_name(),
            default_service: service,
            host_rules,
            path_matchers,
        }
    }

    /// Fetches a global address.
    ///
    /// # Errors
    ///
    /// Returns [`LoadBalancerError::Api`] when the request fails, including
    /// 404 while the address does not exist yet.
    pub async fn get_address(&self, name: &str) -> Result<Address, LoadBalancerError> {
        let url = self.api.url(&[
            "projects",
            self.project_id.as_str(),
            "global",
            "addresses",
            name,
        ])?;
        Ok(self.api.get_json(&url).await?)
    }

    /// Polls a global address until it carries an IP. A 404 or a missing IP
    /// means allocation is still pending.
    ///
    /// # Errors
    ///
    /// Returns [`LoadBalancerError::Timeout`] when the deadline passes and
    /// [`LoadBalancerError::Api`] for any other API failure.
    pub async fn wait_for_address(&self, name: &str) -> Result<String, LoadBalancerError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            match self.get_address(name).await {
                Ok(Address {
                    address: Some(ip), ..
                }) if !ip.is_empty() => return Ok(ip),
                Ok(_) => {}
                Err(LoadBalancerError::Api(err)) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }

            info!(address = name, "waiting for IP allocation");
            if Instant::now() + self.poll_interval > deadline {
                return Err(LoadBalancerError::Timeout {
                    address: name.to_owned(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Creates the whole chain and returns the allocated IP address.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; earlier resources are left in
    /// place.
    pub async fn create(&self, request: &LoadBalancerRequest) -> Result<String, LoadBalancerError> {
        request.validate()?;

        self.insert(
            "backendBuckets",
            &BackendBucketResource {
                name: &request.backend_bucket_name,
                bucket_name: &request.bucket_name,
                enable_cdn: true,
            },
        )
        .await?;
        info!(backend_bucket = %request.backend_bucket_name, "created backend bucket");

        self.insert("urlMaps", &self.url_map(request)).await?;
        info!(url_map = %request.url_map_name(), domain = ?request.domain, "created URL map");

        self.insert(
            "targetHttpProxies",
            &TargetHttpProxyResource {
                name: request.proxy_name(),
                url_map: self.global_path("urlMaps", &request.url_map_name()),
            },
        )
        .await?;
        info!(proxy = %request.proxy_name(), "created target HTTP proxy");

        let address_name = request.address_name();
        self.insert(
            "addresses",
            &AddressResource {
                name: address_name.clone(),
                address_type: "EXTERNAL",
                description: "Load balancer IP",
            },
        )
        .await?;
        info!(address = %address_name, "allocated global address");

        let ip = self.wait_for_address(&address_name).await?;
        info!(address = %address_name, ip = %ip, "address ready");

        self.insert(
            "forwardingRules",
            &ForwardingRuleResource {
                name: request.forwarding_rule_name(),
                ip_address: ip.clone(),
                ip_protocol: "TCP",
                port_range: HTTP_PORT_RANGE,
                target: self.global_path("targetHttpProxies", &request.proxy_name()),
            },
        )
        .await?;
        info!(rule = %request.forwarding_rule_name(), "created forwarding rule");
        Ok(ip)
    }
}

impl LoadBalancerBackend for LoadBalancerClient {
    type Error = LoadBalancerError;

    fn create_load_balancer<'a>(
        &'a self,
        request: &'a LoadBalancerRequest,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(self.create(request))
    }
}
