//! Configuration loading via `ortho-config`.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::backend::{BucketRequest, InstanceRequest};

/// Environment variable honoured by Google client libraries for a service
/// account key file.
pub const APPLICATION_CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const CONFIG_FILE: &str = "stratus.toml";
const SECTION: &str = "gcp";

/// Google Cloud settings derived from environment variables and configuration
/// files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "GCP",
    discovery(
        app_name = "stratus",
        env_var = "STRATUS_CONFIG_PATH",
        config_file_name = "stratus.toml",
        dotfile_name = ".stratus.toml",
        project_file_name = "stratus.toml"
    )
)]
pub struct GcpConfig {
    /// Path to a service account key file. Falls back to
    /// `GOOGLE_APPLICATION_CREDENTIALS` when unset.
    pub credentials_file: Option<String>,
    /// Pre-issued OAuth2 access token. Takes precedence over the key file.
    pub access_token: Option<String>,
    /// Project identifier used for billing and resource scoping. Left empty
    /// when unset so `validate` can name the setting.
    #[ortho_config(default = String::new())]
    pub project_id: String,
    /// Compute Engine zone. Defaults to `us-central1-a`.
    #[ortho_config(default = "us-central1-a".to_owned())]
    pub zone: String,
    /// Machine type for new instances.
    #[ortho_config(default = "n1-standard-1".to_owned())]
    pub machine_type: String,
    /// Boot image for new instances.
    #[ortho_config(default = "projects/debian-cloud/global/images/family/debian-11".to_owned())]
    pub source_image: String,
    /// VPC network attached to new instances.
    #[ortho_config(default = "default".to_owned())]
    pub network: String,
    /// Boot disk size in GB.
    #[ortho_config(default = 10)]
    pub disk_size_gb: u64,
    /// Instance name used by the demo workflow.
    #[ortho_config(default = "stratus-instance".to_owned())]
    pub instance_name: String,
    /// Bucket location, for example `US` or `EU`.
    #[ortho_config(default = "US".to_owned())]
    pub bucket_location: String,
    /// Storage class for new buckets.
    #[ortho_config(default = "STANDARD".to_owned())]
    pub storage_class: String,
    /// Spreadsheet identifier (the ID, not the full URL).
    pub spreadsheet_id: Option<String>,
    /// BCP-47 language code used for transcription.
    #[ortho_config(default = "en-US".to_owned())]
    pub speech_language: String,
    /// Overrides the sample rate read from the WAV header.
    pub speech_sample_rate_hertz: Option<u32>,
    /// Seconds between polls of long-running operations.
    #[ortho_config(default = 1)]
    pub poll_interval_secs: u64,
    /// Upper bound on operation and IP allocation waits.
    #[ortho_config(default = 300)]
    pub operation_timeout_secs: u64,
    /// Delay before the demo workflow tears resources down.
    #[ortho_config(default = 120)]
    pub cleanup_delay_secs: u64,
    /// Root URL override for every Google API (emulators, mocks).
    pub api_root: Option<String>,
    /// OAuth2 token endpoint override.
    pub token_uri: Option<String>,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl GcpConfig {
    /// Builds a configuration populated with defaults for the given project.
    #[must_use]
    pub fn for_project(project_id: impl Into<String>) -> Self {
        Self {
            credentials_file: None,
            access_token: None,
            project_id: project_id.into(),
            zone: String::from("us-central1-a"),
            machine_type: String::from("n1-standard-1"),
            source_image: String::from("projects/debian-cloud/global/images/family/debian-11"),
            network: String::from("default"),
            disk_size_gb: 10,
            instance_name: String::from("stratus-instance"),
            bucket_location: String::from("US"),
            storage_class: String::from("STANDARD"),
            spreadsheet_id: None,
            speech_language: String::from("en-US"),
            speech_sample_rate_hertz: None,
            poll_interval_secs: 1,
            operation_timeout_secs: 300,
            cleanup_delay_secs: 120,
            api_root: None,
            token_uri: None,
        }
    }

    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to [{SECTION}] in {CONFIG_FILE}",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("stratus")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on the fields project-scoped tasks need:
    /// the project, the instance defaults, and the polling settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Invalid`] when a numeric setting is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.project_id,
            &FieldMetadata::new("Google Cloud project ID", "GCP_PROJECT_ID", "project_id"),
        )?;
        Self::require_field(
            &self.zone,
            &FieldMetadata::new("Compute Engine zone", "GCP_ZONE", "zone"),
        )?;
        Self::require_field(
            &self.machine_type,
            &FieldMetadata::new("machine type", "GCP_MACHINE_TYPE", "machine_type"),
        )?;
        Self::require_field(
            &self.source_image,
            &FieldMetadata::new("boot image", "GCP_SOURCE_IMAGE", "source_image"),
        )?;
        Self::require_field(
            &self.network,
            &FieldMetadata::new("VPC network", "GCP_NETWORK", "network"),
        )?;
        self.validate_polling()
    }

    /// Validates only the polling settings. Sheets, Speech-to-Text and
    /// Translation calls need nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the interval is zero or the
    /// timeout is shorter than the interval.
    pub fn validate_polling(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(String::from(
                "poll_interval_secs must be at least 1 (GCP_POLL_INTERVAL_SECS)",
            )));
        }
        if self.operation_timeout_secs < self.poll_interval_secs {
            return Err(ConfigError::Invalid(String::from(
                "operation_timeout_secs must not be shorter than poll_interval_secs",
            )));
        }
        Ok(())
    }

    /// Returns the spreadsheet identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when no spreadsheet is configured.
    pub fn require_spreadsheet_id(&self) -> Result<&str, ConfigError> {
        let id = self.spreadsheet_id.as_deref().unwrap_or_default();
        Self::require_field(
            id,
            &FieldMetadata::new("spreadsheet ID", "GCP_SPREADSHEET_ID", "spreadsheet_id"),
        )?;
        Ok(id.trim())
    }

    /// Resolves the service account key path, consulting
    /// `GOOGLE_APPLICATION_CREDENTIALS` when the file is not configured.
    #[must_use]
    pub fn credentials_path(&self) -> Option<Utf8PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| std::env::var(APPLICATION_CREDENTIALS_ENV).ok())
            .map(|path| path.trim().to_owned())
            .filter(|path| !path.is_empty())
            .map(Utf8PathBuf::from)
    }

    /// Interval between operation polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Upper bound on long-running waits.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Delay applied by the demo workflow before cleanup.
    #[must_use]
    pub const fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.cleanup_delay_secs)
    }

    /// Builds an [`InstanceRequest`] using the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn as_instance_request(&self, name: Option<&str>) -> Result<InstanceRequest, ConfigError> {
        self.validate()?;
        InstanceRequest::builder()
            .name(name.unwrap_or(&self.instance_name))
            .project_id(&self.project_id)
            .zone(&self.zone)
            .machine_type(&self.machine_type)
            .source_image(&self.source_image)
            .network(&self.network)
            .disk_size_gb(self.disk_size_gb)
            .build()
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Builds a [`BucketRequest`] using the configured location and class.
    #[must_use]
    pub fn as_bucket_request(&self, name: &str) -> BucketRequest {
        BucketRequest {
            name: name.trim().to_owned(),
            location: self.bucket_location.clone(),
            storage_class: self.storage_class.clone(),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a field holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
