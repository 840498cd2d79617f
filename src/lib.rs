//! Core library for the `stratus` Google Cloud task runner.
//!
//! Each task calls one managed API: Compute Engine instances, Cloud Storage
//! buckets, an HTTP load balancer in front of a bucket, Sheets ranges,
//! Speech-to-Text and Translation. The [`backend`] traits are the seams the
//! [`workflow`] and the sentinel wrappers in [`actions`] run against.

pub mod actions;
pub mod api;
pub mod auth;
pub mod backend;
pub mod clients;
pub mod compute;
pub mod config;
pub mod files;
pub mod load_balancer;
pub mod logging;
pub mod sheets;
pub mod speech;
pub mod storage;
pub mod test_support;
pub mod translate;
pub mod workflow;

pub use api::{ApiClient, ApiError, Endpoints};
pub use auth::{AuthError, Credentials, ServiceAccountKey, TokenProvider};
pub use backend::{
    BackendError, BucketBackend, BucketRequest, InstanceBackend, InstanceRequest,
    InstanceRequestBuilder, LoadBalancerBackend,
};
pub use clients::{ClientError, Clients};
pub use compute::{ComputeClient, ComputeError};
pub use config::{ConfigError, GcpConfig};
pub use load_balancer::{LoadBalancerClient, LoadBalancerError, LoadBalancerRequest};
pub use sheets::{SheetsClient, SheetsError};
pub use speech::{AudioError, SpeechClient, SpeechError};
pub use storage::{StorageClient, StorageError};
pub use translate::{TranslateClient, TranslateError, Translation};
pub use workflow::{Workflow, WorkflowPlan, WorkflowReport};
