//! Backend abstractions for the compute, storage, and load-balancer tasks.

use std::future::Future;
use std::pin::Pin;

use camino::Utf8Path;
use thiserror::Error;

use crate::load_balancer::LoadBalancerRequest;

/// Parameters required to create a new instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceRequest {
    /// Instance name, unique within the zone.
    pub name: String,
    /// Project identifier used for billing and ownership.
    pub project_id: String,
    /// Target zone (for example `us-central1-a`).
    pub zone: String,
    /// Machine type (for example `n1-standard-1`).
    pub machine_type: String,
    /// Boot image, either an image or an image family URL.
    pub source_image: String,
    /// VPC network name.
    pub network: String,
    /// Boot disk size in GB.
    pub disk_size_gb: u64,
}

impl InstanceRequest {
    /// Starts a builder for an [`InstanceRequest`].
    #[must_use]
    pub fn builder() -> InstanceRequestBuilder {
        InstanceRequestBuilder::new()
    }

    /// Validates the request, returning a descriptive error when a required
    /// field is missing.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when any string field is empty or
    /// the disk size is zero.
    pub fn validate(&self) -> Result<(), BackendError> {
        let fields = [
            ("name", &self.name),
            ("project_id", &self.project_id),
            ("zone", &self.zone),
            ("machine_type", &self.machine_type),
            ("source_image", &self.source_image),
            ("network", &self.network),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(BackendError::Validation((*field).to_owned()));
        }
        if self.disk_size_gb == 0 {
            return Err(BackendError::Validation("disk_size_gb".to_owned()));
        }
        Ok(())
    }
}

/// Builder for [`InstanceRequest`] that defers trimming and validation to
/// construction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceRequestBuilder {
    name: String,
    project_id: String,
    zone: String,
    machine_type: String,
    source_image: String,
    network: String,
    disk_size_gb: u64,
}

impl InstanceRequestBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instance name.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = value.into();
        self
    }

    /// Sets the project identifier.
    #[must_use]
    pub fn project_id(mut self, value: impl Into<String>) -> Self {
        self.project_id = value.into();
        self
    }

    /// Sets the zone.
    #[must_use]
    pub fn zone(mut self, value: impl Into<String>) -> Self {
        self.zone = value.into();
        self
    }

    /// Sets the machine type.
    #[must_use]
    pub fn machine_type(mut self, value: impl Into<String>) -> Self {
        self.machine_type = value.into();
        self
    }

    /// Sets the boot image.
    #[must_use]
    pub fn source_image(mut self, value: impl Into<String>) -> Self {
        self.source_image = value.into();
        self
    }

    /// Sets the network name.
    #[must_use]
    pub fn network(mut self, value: impl Into<String>) -> Self {
        self.network = value.into();
        self
    }

    /// Sets the boot disk size.
    #[must_use]
    pub const fn disk_size_gb(mut self, value: u64) -> Self {
        self.disk_size_gb = value;
        self
    }

    /// Builds and validates the [`InstanceRequest`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when any required field is empty.
    pub fn build(self) -> Result<InstanceRequest, BackendError> {
        let request = InstanceRequest {
            name: self.name.trim().to_owned(),
            project_id: self.project_id.trim().to_owned(),
            zone: self.zone.trim().to_owned(),
            machine_type: self.machine_type.trim().to_owned(),
            source_image: self.source_image.trim().to_owned(),
            network: self.network.trim().to_owned(),
            disk_size_gb: self.disk_size_gb,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Parameters required to create a bucket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BucketRequest {
    /// Globally unique bucket name.
    pub name: String,
    /// Bucket location, for example `US`.
    pub location: String,
    /// Storage class, for example `STANDARD` or `NEARLINE`.
    pub storage_class: String,
}

impl BucketRequest {
    /// Creates a request with the `US` location and `STANDARD` class.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: String::from("US"),
            storage_class: String::from("STANDARD"),
        }
    }
}

/// Errors raised by backends.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum BackendError {
    /// Raised when a request is missing a required field.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Compute instance lifecycle.
pub trait InstanceBackend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates an instance and waits for the insert operation; returns its name.
    fn create_instance<'a>(
        &'a self,
        request: &'a InstanceRequest,
    ) -> BackendFuture<'a, String, Self::Error>;

    /// Lists names of running instances in the zone.
    fn list_running<'a>(&'a self, zone: &'a str) -> BackendFuture<'a, Vec<String>, Self::Error>;

    /// Deletes the instance and waits for the delete operation.
    fn terminate_instance<'a>(
        &'a self,
        zone: &'a str,
        name: &'a str,
    ) -> BackendFuture<'a, (), Self::Error>;
}

/// Object storage buckets and their contents.
pub trait BucketBackend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates a bucket and returns the name the provider assigned.
    fn create_bucket<'a>(
        &'a self,
        request: &'a BucketRequest,
    ) -> BackendFuture<'a, String, Self::Error>;

    /// Lists bucket names in the project.
    fn list_buckets(&self) -> BackendFuture<'_, Vec<String>, Self::Error>;

    /// Uploads a local file and returns the stored object name. The object
    /// name defaults to the file name.
    fn upload_file<'a>(
        &'a self,
        bucket: &'a str,
        source: &'a Utf8Path,
        destination: Option<&'a str>,
    ) -> BackendFuture<'a, String, Self::Error>;

    /// Lists object names in the bucket.
    fn list_objects<'a>(&'a self, bucket: &'a str)
    -> BackendFuture<'a, Vec<String>, Self::Error>;

    /// Deletes one object.
    fn delete_object<'a>(
        &'a self,
        bucket: &'a str,
        object: &'a str,
    ) -> BackendFuture<'a, (), Self::Error>;

    /// Deletes an empty bucket.
    fn delete_bucket<'a>(&'a self, bucket: &'a str) -> BackendFuture<'a, (), Self::Error>;
}

/// HTTP load balancing in front of a bucket.
pub trait LoadBalancerBackend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Builds the load-balancer chain and returns its public IP address.
    fn create_load_balancer<'a>(
        &'a self,
        request: &'a LoadBalancerRequest,
    ) -> BackendFuture<'a, String, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn builder() -> InstanceRequestBuilder {
        InstanceRequest::builder()
            .name(" vm ")
            .project_id("proj")
            .zone("us-central1-a")
            .machine_type("n1-standard-1")
            .source_image("projects/debian-cloud/global/images/family/debian-11")
            .network("default")
            .disk_size_gb(10)
    }

    #[rstest]
    fn build_trims_fields() {
        let request = builder()
            .build()
            .unwrap_or_else(|err| panic!("build: {err}"));
        assert_eq!(request.name, "vm");
    }

    #[rstest]
    #[case::name(builder().name("  "), "name")]
    #[case::zone(builder().zone(""), "zone")]
    #[case::image(builder().source_image(" "), "source_image")]
    #[case::disk(builder().disk_size_gb(0), "disk_size_gb")]
    fn build_rejects_missing_fields(#[case] input: InstanceRequestBuilder, #[case] field: &str) {
        let err = input.build().expect_err("invalid request");
        assert_eq!(err, BackendError::Validation(field.to_owned()));
    }
}
