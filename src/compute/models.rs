//! Compute Engine request and response models.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Status reported by an operation once it has finished.
pub const OPERATION_DONE: &str = "DONE";
/// Status reported by an instance that is up.
pub const INSTANCE_RUNNING: &str = "RUNNING";

/// Instance insert body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResource {
    /// Instance name.
    pub name: String,
    /// Partial machine type URL (`zones/{zone}/machineTypes/{type}`).
    pub machine_type: String,
    /// Attached disks.
    pub disks: Vec<AttachedDisk>,
    /// Network interfaces.
    pub network_interfaces: Vec<NetworkInterface>,
}

/// Disk attached at creation time.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    /// Whether this is the boot disk.
    pub boot: bool,
    /// Whether the disk is deleted with the instance.
    pub auto_delete: bool,
    /// Disk type; always `PERSISTENT` here.
    #[serde(rename = "type")]
    pub disk_type: String,
    /// Parameters for a newly created disk.
    pub initialize_params: InitializeParams,
}

/// Parameters for a new boot disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Image used to initialise the disk.
    pub source_image: String,
    /// Size in GB; int64 fields travel as JSON strings.
    pub disk_size_gb: String,
}

/// Network interface definition.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Network URL.
    pub network: String,
    /// External access configuration.
    pub access_configs: Vec<AccessConfig>,
}

/// External NAT configuration.
#[derive(Debug, Serialize)]
pub struct AccessConfig {
    /// Access config name.
    pub name: String,
    /// Access type (`ONE_TO_ONE_NAT`).
    #[serde(rename = "type")]
    pub access_type: String,
}

/// Zone or global operation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation name used for polling.
    #[serde(default)]
    pub name: String,
    /// `PENDING`, `RUNNING` or `DONE`.
    #[serde(default)]
    pub status: String,
    /// Errors reported once the operation is done.
    #[serde(default)]
    pub error: Option<OperationErrors>,
    /// Target resource URL.
    #[serde(default)]
    pub target_link: Option<String>,
}

impl Operation {
    /// Whether the operation has finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status == OPERATION_DONE
    }

    /// Joined error messages of a failed operation.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let errors = &self.error.as_ref()?.errors;
        if errors.is_empty() {
            return None;
        }
        Some(
            errors
                .iter()
                .map(|err| format!("{}: {}", err.code, err.message))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Error container of an operation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OperationErrors {
    /// Individual errors.
    #[serde(default)]
    pub errors: Vec<OperationError>,
}

/// A single operation error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OperationError {
    /// Error code, for example `QUOTA_EXCEEDED`.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// Instance as returned by list calls.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance name.
    pub name: String,
    /// Lifecycle status such as `RUNNING` or `TERMINATED`.
    #[serde(default)]
    pub status: String,
    /// Labels attached to the instance.
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

/// Page of instances.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceList {
    /// Instances on this page.
    #[serde(default)]
    pub items: Vec<Instance>,
    /// Token for the next page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}
