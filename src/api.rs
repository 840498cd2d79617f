//! Authenticated JSON transport shared by the service clients.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::{AuthError, TokenProvider};

/// Timeout applied to every API request.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised by API calls.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised when no access token could be obtained.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    /// Raised when a base URL cannot be used to build request URLs.
    #[error("invalid API URL {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },
    /// Raised when the request cannot be sent or the body cannot be read.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Request URL.
        url: String,
        /// Transport error message.
        message: String,
    },
    /// Raised when the API answers with a non-success status.
    #[error("{url} returned {status}: {message}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body returned by the API.
        message: String,
    },
    /// Raised when a success response cannot be decoded.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Decoder message.
        message: String,
    },
}

impl ApiError {
    /// HTTP status for [`ApiError::Status`] errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), Some(404))
    }
}

/// Builds a `reqwest` client with the API timeout applied.
///
/// # Errors
///
/// Returns [`ApiError::Transport`] when the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|err| ApiError::Transport {
            url: String::new(),
            message: err.to_string(),
        })
}

/// REST client for one Google API rooted at a base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
    base: Url,
}

impl ApiClient {
    /// Creates a client rooted at `base_url` (for example
    /// `https://compute.googleapis.com/compute/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the URL cannot carry path
    /// segments.
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenProvider>,
        base_url: &str,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(base_url).map_err(|err| ApiError::InvalidUrl {
            url: base_url.to_owned(),
            message: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_owned(),
                message: String::from("URL cannot be a base"),
            });
        }
        Ok(Self { http, tokens, base })
    }

    /// Base URL of the API.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the base cannot be extended.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl {
                url: self.base.to_string(),
                message: String::from("URL cannot be a base"),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: &Url) -> Result<RequestBuilder, ApiError> {
        let token = self.tokens.access_token().await?;
        debug!(method = %method, url = %url, "API request");
        Ok(self
            .http
            .request(method, url.clone())
            .bearer_auth(token)
            .timeout(HTTP_TIMEOUT))
    }

    async fn send(url: &Url, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|err| ApiError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|err| format!("<failed to read error body: {err}>"));
        if status != StatusCode::NOT_FOUND {
            warn!(url = %url, status = status.as_u16(), "API request failed");
        }
        Err(ApiError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, ApiError> {
        let body = response.text().await.map_err(|err| ApiError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        let text = if body.trim().is_empty() { "{}" } else { &body };
        serde_json::from_str(text).map_err(|err| ApiError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }

    /// Sends a GET request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on authentication, transport, status, or decode
    /// failures.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, url).await?;
        let response = Self::send(url, builder).await?;
        Self::decode(url, response).await
    }

    /// Sends a JSON body with POST and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on authentication, transport, status, or decode
    /// failures.
    pub async fn post_json<T, B>(&self, url: &Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, url).await?.json(body);
        let response = Self::send(url, builder).await?;
        Self::decode(url, response).await
    }

    /// Sends a JSON body with PUT and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on authentication, transport, status, or decode
    /// failures.
    pub async fn put_json<T, B>(&self, url: &Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, url).await?.json(body);
        let response = Self::send(url, builder).await?;
        Self::decode(url, response).await
    }

    /// Sends raw bytes with POST and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on authentication, transport, status, or decode
    /// failures.
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        url: &Url,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<T, ApiError> {
        let builder = self
            .request(Method::POST, url)
            .await?
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        let response = Self::send(url, builder).await?;
        Self::decode(url, response).await
    }

    /// Sends a DELETE request and decodes the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on authentication, transport, status, or decode
    /// failures.
    pub async fn delete_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ApiError> {
        let builder = self.request(Method::DELETE, url).await?;
        let response = Self::send(url, builder).await?;
        Self::decode(url, response).await
    }

    /// Sends a DELETE request and discards the response body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on authentication, transport, or status failures.
    pub async fn delete(&self, url: &Url) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, url).await?;
        Self::send(url, builder).await.map(drop)
    }
}

/// Service endpoint roots, overridable for emulators and mocks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoints {
    /// Compute Engine v1 root.
    pub compute: String,
    /// Cloud Storage JSON API root.
    pub storage: String,
    /// Cloud Storage upload root.
    pub storage_upload: String,
    /// Sheets v4 root.
    pub sheets: String,
    /// Speech-to-Text v1 root.
    pub speech: String,
    /// Translation v2 root.
    pub translate: String,
}

impl Endpoints {
    /// Public Google endpoints.
    #[must_use]
    pub fn google() -> Self {
        Self {
            compute: String::from("https://compute.googleapis.com/compute/v1"),
            storage: String::from("https://storage.googleapis.com/storage/v1"),
            storage_upload: String::from("https://storage.googleapis.com/upload/storage/v1"),
            sheets: String::from("https://sheets.googleapis.com/v4"),
            speech: String::from("https://speech.googleapis.com/v1"),
            translate: String::from("https://translation.googleapis.com/language/translate/v2"),
        }
    }

    /// Every service rooted under a single URL, keeping each API's path
    /// layout. Used with emulators and HTTP mocks.
    #[must_use]
    pub fn rooted_at(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            compute: format!("{root}/compute/v1"),
            storage: format!("{root}/storage/v1"),
            storage_upload: format!("{root}/upload/storage/v1"),
            sheets: format!("{root}/v4"),
            speech: format!("{root}/v1"),
            translate: format!("{root}/language/translate/v2"),
        }
    }
}
