//! Construction of every service client from one configuration.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::api::{self, ApiClient, ApiError, Endpoints};
use crate::auth::{
    AuthError, CLOUD_PLATFORM_SCOPE, Credentials, SPREADSHEETS_SCOPE, TokenProvider,
};
use crate::compute::ComputeClient;
use crate::config::{ConfigError, GcpConfig};
use crate::load_balancer::LoadBalancerClient;
use crate::sheets::SheetsClient;
use crate::speech::SpeechClient;
use crate::storage::StorageClient;
use crate::translate::TranslateClient;

/// Errors raised while initialising clients.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ClientError {
    /// Raised when configuration is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised when credentials cannot be loaded.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Raised when an endpoint is unusable or the HTTP client fails to build.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Every service client, sharing one HTTP connection pool.
#[derive(Clone, Debug)]
pub struct Clients {
    /// Compute Engine instances.
    pub compute: ComputeClient,
    /// Cloud Storage buckets and objects.
    pub storage: StorageClient,
    /// Global HTTP load balancing.
    pub load_balancer: LoadBalancerClient,
    /// Speech-to-Text.
    pub speech: SpeechClient,
    /// Translation.
    pub translate: TranslateClient,
    sheets_api: ApiClient,
}

impl Clients {
    /// Validates `config` for project-scoped tasks, resolves credentials and
    /// builds each client.
    ///
    /// API roots come from `api_root` when set, otherwise the public Google
    /// endpoints are used.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when validation, credential loading, or
    /// endpoint parsing fails.
    pub fn initialize(config: &GcpConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Self::build(config)
    }

    /// Builds the clients after checking only the polling settings. For
    /// Sheets, Speech-to-Text and Translation, which need no project, zone,
    /// or instance defaults; the compute and storage clients it returns are
    /// unscoped when no project is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when validation, credential loading, or
    /// endpoint parsing fails.
    pub fn initialize_unscoped(config: &GcpConfig) -> Result<Self, ClientError> {
        config.validate_polling()?;
        Self::build(config)
    }

    fn build(config: &GcpConfig) -> Result<Self, ClientError> {
        let credentials = Credentials::from_config(config)?;
        let endpoints = config
            .api_root
            .as_deref()
            .map_or_else(Endpoints::google, Endpoints::rooted_at);
        debug!(?endpoints, "resolved endpoints");

        let http = api::http_client()?;
        let token_uri = config.token_uri.as_deref();
        let cloud = Arc::new(TokenProvider::new(
            http.clone(),
            credentials.clone(),
            &[CLOUD_PLATFORM_SCOPE],
            token_uri,
        ));
        let sheets_tokens = Arc::new(TokenProvider::new(
            http.clone(),
            credentials,
            &[SPREADSHEETS_SCOPE],
            token_uri,
        ));

        let client = |base: &str| ApiClient::new(http.clone(), Arc::clone(&cloud), base);
        let compute_api = client(&endpoints.compute)?;

        let clients = Self {
            compute: ComputeClient::new(compute_api.clone(), &config.project_id)
                .with_poll_interval(config.poll_interval())
                .with_wait_timeout(config.operation_timeout()),
            storage: StorageClient::new(
                client(&endpoints.storage)?,
                client(&endpoints.storage_upload)?,
                &config.project_id,
            ),
            load_balancer: LoadBalancerClient::new(compute_api, &config.project_id)
                .with_poll_interval(config.poll_interval())
                .with_wait_timeout(config.operation_timeout()),
            speech: SpeechClient::new(client(&endpoints.speech)?)
                .with_language(&config.speech_language)
                .with_sample_rate(config.speech_sample_rate_hertz),
            translate: TranslateClient::new(client(&endpoints.translate)?),
            sheets_api: ApiClient::new(http, sheets_tokens, &endpoints.sheets)?,
        };
        info!(project = %config.project_id, "initialised clients");
        Ok(clients)
    }

    /// Sheets client for one spreadsheet, authorised with the spreadsheets
    /// scope.
    #[must_use]
    pub fn sheets(&self, spreadsheet_id: &str) -> SheetsClient {
        SheetsClient::new(self.sheets_api.clone(), spreadsheet_id)
    }
}
