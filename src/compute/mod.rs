//! Compute Engine implementation of the instance lifecycle.

mod error;
pub mod models;
mod wait;

use std::time::Duration;

use reqwest::Url;
use tracing::info;
use uuid::Uuid;

use crate::api::{ApiClient, ApiError};
use crate::backend::{BackendFuture, InstanceBackend, InstanceRequest};
use models::{
    AccessConfig, AttachedDisk, INSTANCE_RUNNING, InitializeParams, Instance, InstanceList,
    InstanceResource, NetworkInterface, Operation,
};

pub use error::ComputeError;

/// Default interval between zone operation polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Default upper bound on a zone operation wait.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for Compute Engine instances in one project.
#[derive(Clone, Debug)]
pub struct ComputeClient {
    api: ApiClient,
    project_id: String,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl ComputeClient {
    /// Creates a client using the default polling settings.
    #[must_use]
    pub fn new(api: ApiClient, project_id: impl Into<String>) -> Self {
        Self {
            api,
            project_id: project_id.into(),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }

    /// Overrides the operation polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides the operation wait timeout.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Project the client operates on.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn instances_url(&self, project: &str, zone: &str, name: Option<&str>) -> Result<Url, ApiError> {
        let mut segments = vec!["projects", project, "zones", zone, "instances"];
        segments.extend(name);
        self.api.url(&segments)
    }

    /// Builds the insert body for a request: one persistent boot disk and
    /// one interface with an external NAT address.
    #[must_use]
    pub fn instance_resource(request: &InstanceRequest) -> InstanceResource {
        InstanceResource {
            name: request.name.clone(),
            machine_type: format!(
                "zones/{}/machineTypes/{}",
                request.zone, request.machine_type
            ),
            disks: vec![AttachedDisk {
                boot: true,
                auto_delete: true,
                disk_type: String::from("PERSISTENT"),
                initialize_params: InitializeParams {
                    source_image: request.source_image.clone(),
                    disk_size_gb: request.disk_size_gb.to_string(),
                },
            }],
            network_interfaces: vec![NetworkInterface {
                network: format!(
                    "projects/{}/global/networks/{}",
                    request.project_id, request.network
                ),
                access_configs: vec![AccessConfig {
                    name: String::from("External NAT"),
                    access_type: String::from("ONE_TO_ONE_NAT"),
                }],
            }],
        }
    }

    /// Submits an instance insert and returns the pending operation.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::Validation`] for incomplete requests and
    /// [`ComputeError::Api`] when the API rejects the insert.
    pub async fn insert_instance(
        &self,
        request: &InstanceRequest,
    ) -> Result<Operation, ComputeError> {
        request.validate()?;
        let mut url = self.instances_url(&request.project_id, &request.zone, None)?;
        url.query_pairs_mut()
            .append_pair("requestId", &Uuid::new_v4().to_string());
        let body = Self::instance_resource(request);
        info!(instance = %request.name, zone = %request.zone, machine_type = %request.machine_type, "inserting instance");
        Ok(self.api.post_json(&url, &body).await?)
    }

    /// Lists every instance in the zone, following pagination.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::Api`] when a page cannot be fetched.
    pub async fn list_instances(&self, zone: &str) -> Result<Vec<Instance>, ComputeError> {
        let mut instances = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.instances_url(&self.project_id, zone, None)?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: InstanceList = self.api.get_json(&url).await?;
            instances.extend(page.items);
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(instances),
            }
        }
    }

    /// Submits an instance delete and returns the pending operation.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::Api`] when the API rejects the delete.
    pub async fn delete_instance(&self, zone: &str, name: &str) -> Result<Operation, ComputeError> {
        let url = self.instances_url(&self.project_id, zone, Some(name))?;
        info!(instance = name, zone, "deleting instance");
        Ok(self.api.delete_json(&url).await?)
    }
}

impl InstanceBackend for ComputeClient {
    type Error = ComputeError;

    fn create_instance<'a>(
        &'a self,
        request: &'a InstanceRequest,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            let operation = self.insert_instance(request).await?;
            self.wait_for_operation(&request.project_id, &request.zone, &operation.name)
                .await?;
            info!(instance = %request.name, "created instance");
            Ok(request.name.clone())
        })
    }

    fn list_running<'a>(&'a self, zone: &'a str) -> BackendFuture<'a, Vec<String>, Self::Error> {
        Box::pin(async move {
            let running = self
                .list_instances(zone)
                .await?
                .into_iter()
                .filter(|instance| instance.status == INSTANCE_RUNNING)
                .map(|instance| instance.name)
                .collect::<Vec<_>>();
            info!(zone, ?running, "running instances");
            Ok(running)
        })
    }

    fn terminate_instance<'a>(
        &'a self,
        zone: &'a str,
        name: &'a str,
    ) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let operation = self.delete_instance(zone, name).await?;
            self.wait_for_operation(&self.project_id, zone, &operation.name)
                .await?;
            info!(instance = name, "terminated instance");
            Ok(())
        })
    }
}
