//! End-to-end demonstration of the compute and storage tasks.
//!
//! The workflow creates an instance and a bucket, lists both, uploads a file,
//! optionally fronts the bucket with a load balancer, waits for the cleanup
//! delay and then removes whatever it created. Every step goes through the
//! sentinel wrappers in [`crate::actions`], so a failed step is logged and the
//! workflow carries on.

use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::time::sleep;
use tracing::{error, info};

use crate::actions;
use crate::backend::{
    BucketBackend, BucketRequest, InstanceBackend, InstanceRequest, LoadBalancerBackend,
};
use crate::files;
use crate::load_balancer::LoadBalancerRequest;

/// What the workflow should create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkflowPlan {
    /// Instance to create and later terminate.
    pub instance: InstanceRequest,
    /// Bucket to create and later delete.
    pub bucket: BucketRequest,
    /// Local file uploaded into the bucket.
    pub upload: Option<Utf8PathBuf>,
    /// Load balancer placed in front of the bucket.
    pub load_balancer: Option<LoadBalancerRequest>,
    /// Pause between creation and cleanup.
    pub cleanup_delay: Duration,
}

/// What the workflow achieved.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WorkflowReport {
    /// Name of the created instance.
    pub instance: Option<String>,
    /// Instances running after creation.
    pub running_instances: Vec<String>,
    /// Name of the created bucket.
    pub bucket: Option<String>,
    /// Buckets visible after creation.
    pub buckets: Vec<String>,
    /// Whether the upload succeeded.
    pub uploaded: bool,
    /// Public IP of the load balancer.
    pub load_balancer_ip: Option<String>,
    /// Whether the created instance was terminated.
    pub instance_terminated: bool,
    /// Whether the created bucket was deleted.
    pub bucket_deleted: bool,
}

/// Runs a [`WorkflowPlan`] against backends that may be unavailable.
#[derive(Debug)]
pub struct Workflow<'a, I, B, L> {
    instances: Option<&'a I>,
    buckets: Option<&'a B>,
    balancer: Option<&'a L>,
}

impl<'a, I, B, L> Workflow<'a, I, B, L>
where
    I: InstanceBackend + Sync,
    B: BucketBackend + Sync,
    L: LoadBalancerBackend + Sync,
{
    /// Creates a workflow over the given backends.
    #[must_use]
    pub const fn new(instances: Option<&'a I>, buckets: Option<&'a B>, balancer: Option<&'a L>) -> Self {
        Self {
            instances,
            buckets,
            balancer,
        }
    }

    /// Executes the plan. Cleanup only touches resources this run created.
    pub async fn execute(&self, plan: &WorkflowPlan) -> WorkflowReport {
        let mut report = WorkflowReport {
            instance: actions::create_instance(self.instances, &plan.instance).await,
            ..WorkflowReport::default()
        };
        report.running_instances =
            actions::list_instances(self.instances, &plan.instance.zone).await;

        report.bucket = actions::create_bucket(self.buckets, &plan.bucket).await;
        report.buckets = actions::list_buckets(self.buckets).await;

        report.uploaded = self.upload(plan, report.bucket.as_deref()).await;

        if let Some(request) = &plan.load_balancer {
            report.load_balancer_ip = actions::create_load_balancer(self.balancer, request).await;
        }

        info!(
            delay_secs = plan.cleanup_delay.as_secs(),
            "waiting before deleting created resources"
        );
        sleep(plan.cleanup_delay).await;

        if let Some(name) = &report.instance {
            report.instance_terminated =
                actions::terminate_instance(self.instances, &plan.instance.zone, name).await;
        }
        if let Some(bucket) = &report.bucket {
            report.bucket_deleted = actions::delete_bucket(self.buckets, bucket).await;
        }
        report
    }

    async fn upload(&self, plan: &WorkflowPlan, bucket: Option<&str>) -> bool {
        let Some(source) = &plan.upload else {
            info!("no upload configured");
            return false;
        };
        match bucket {
            Some(name) if files::exists(source) => {
                actions::upload_file(self.buckets, name, source, None).await
            }
            _ => {
                error!(source = %source, "file does not exist or bucket creation failed");
                false
            }
        }
    }
}
