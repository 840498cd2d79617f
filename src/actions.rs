//! Task wrappers that never fail.
//!
//! Each wrapper runs one task against a backend that may be unavailable,
//! logs any error and returns a sentinel: `None`, `false` or an empty list.
//! Errors are not classified and nothing is retried.

use camino::Utf8Path;
use tracing::{error, info, warn};

use crate::backend::{
    BucketBackend, BucketRequest, InstanceBackend, InstanceRequest, LoadBalancerBackend,
};
use crate::load_balancer::LoadBalancerRequest;

/// Creates an instance, returning its name.
pub async fn create_instance<B: InstanceBackend + Sync>(
    backend: Option<&B>,
    request: &InstanceRequest,
) -> Option<String> {
    let Some(compute) = backend else {
        error!(instance = %request.name, "compute client unavailable; instance not created");
        return None;
    };
    match compute.create_instance(request).await {
        Ok(name) => {
            info!(instance = %name, zone = %request.zone, "instance created");
            Some(name)
        }
        Err(err) => {
            error!(instance = %request.name, error = %err, "failed to create instance");
            None
        }
    }
}

/// Lists running instances in `zone`.
pub async fn list_instances<B: InstanceBackend + Sync>(
    backend: Option<&B>,
    zone: &str,
) -> Vec<String> {
    let Some(compute) = backend else {
        error!(zone, "compute client unavailable; cannot list instances");
        return Vec::new();
    };
    compute.list_running(zone).await.unwrap_or_else(|err| {
        error!(zone, error = %err, "failed to list instances");
        Vec::new()
    })
}

/// Terminates an instance, reporting whether it was deleted.
pub async fn terminate_instance<B: InstanceBackend + Sync>(
    backend: Option<&B>,
    zone: &str,
    name: &str,
) -> bool {
    let Some(compute) = backend else {
        error!(instance = name, "compute client unavailable; instance not terminated");
        return false;
    };
    match compute.terminate_instance(zone, name).await {
        Ok(()) => {
            info!(instance = name, zone, "instance terminated");
            true
        }
        Err(err) => {
            error!(instance = name, zone, error = %err, "failed to terminate instance");
            false
        }
    }
}

/// Creates a bucket, returning its name.
pub async fn create_bucket<B: BucketBackend + Sync>(
    backend: Option<&B>,
    request: &BucketRequest,
) -> Option<String> {
    let Some(storage) = backend else {
        error!(bucket = %request.name, "storage client unavailable; bucket not created");
        return None;
    };
    match storage.create_bucket(request).await {
        Ok(name) => {
            info!(bucket = %name, location = %request.location, "bucket created");
            Some(name)
        }
        Err(err) => {
            error!(bucket = %request.name, error = %err, "failed to create bucket");
            None
        }
    }
}

/// Lists the project's buckets.
pub async fn list_buckets<B: BucketBackend + Sync>(backend: Option<&B>) -> Vec<String> {
    let Some(storage) = backend else {
        error!("storage client unavailable; cannot list buckets");
        return Vec::new();
    };
    storage.list_buckets().await.unwrap_or_else(|err| {
        error!(error = %err, "failed to list buckets");
        Vec::new()
    })
}

/// Uploads a local file, reporting whether the upload succeeded.
pub async fn upload_file<B: BucketBackend + Sync>(
    backend: Option<&B>,
    bucket: &str,
    source: &Utf8Path,
    destination: Option<&str>,
) -> bool {
    let Some(storage) = backend else {
        error!(bucket, source = %source, "storage client unavailable; file not uploaded");
        return false;
    };
    match storage.upload_file(bucket, source, destination).await {
        Ok(object) => {
            info!(bucket, source = %source, object = %object, "file uploaded");
            true
        }
        Err(err) => {
            error!(bucket, source = %source, error = %err, "failed to upload file");
            false
        }
    }
}

/// Deletes every object in `bucket`, then the bucket itself.
pub async fn delete_bucket<B: BucketBackend + Sync>(backend: Option<&B>, bucket: &str) -> bool {
    let Some(storage) = backend else {
        error!(bucket, "storage client unavailable; bucket not deleted");
        return false;
    };
    let objects = match storage.list_objects(bucket).await {
        Ok(objects) => objects,
        Err(err) => {
            error!(bucket, error = %err, "failed to list bucket contents");
            return false;
        }
    };
    for object in &objects {
        if let Err(err) = storage.delete_object(bucket, object).await {
            error!(bucket, object = %object, error = %err, "failed to delete object");
            return false;
        }
    }
    if !objects.is_empty() {
        warn!(bucket, count = objects.len(), "emptied bucket before deletion");
    }
    match storage.delete_bucket(bucket).await {
        Ok(()) => {
            info!(bucket, "bucket deleted");
            true
        }
        Err(err) => {
            error!(bucket, error = %err, "failed to delete bucket");
            false
        }
    }
}

/// Builds a load balancer in front of a bucket, returning its IP address.
pub async fn create_load_balancer<B: LoadBalancerBackend + Sync>(
    backend: Option<&B>,
    request: &LoadBalancerRequest,
) -> Option<String> {
    let Some(balancer) = backend else {
        error!(bucket = %request.bucket_name, "compute client unavailable; load balancer not created");
        return None;
    };
    match balancer.create_load_balancer(request).await {
        Ok(ip) => {
            info!(ip = %ip, "access your content at http://{ip}");
            Some(ip)
        }
        Err(err) => {
            error!(bucket = %request.bucket_name, error = %err, "failed to create load balancer");
            None
        }
    }
}
