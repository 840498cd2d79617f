//! OAuth2 access tokens for Google APIs.
//!
//! Two credential sources are supported: a pre-issued access token (for
//! example from `gcloud auth print-access-token`) and a service account key,
//! exchanged for a token through the JWT bearer grant. Exchanged tokens are
//! cached until shortly before they expire.

mod error;
mod key;

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::GcpConfig;

pub use error::AuthError;
pub use key::ServiceAccountKey;

/// Full access to Google Cloud APIs.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
/// Read and write access to Google Sheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
/// Google's OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Where access tokens come from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Credentials {
    /// A service account key exchanged for short-lived tokens.
    ServiceAccount(ServiceAccountKey),
    /// A static bearer token used as-is.
    AccessToken(String),
}

impl Credentials {
    /// Resolves credentials from configuration. A configured access token
    /// wins over a key file.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoCredentials`] when nothing is configured, or the
    /// key loading errors from [`ServiceAccountKey::from_file`].
    pub fn from_config(config: &GcpConfig) -> Result<Self, AuthError> {
        if let Some(token) = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            return Ok(Self::AccessToken(token.to_owned()));
        }

        let path = config.credentials_path().ok_or(AuthError::NoCredentials)?;
        ServiceAccountKey::from_file(&path).map(Self::ServiceAccount)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Issues bearer tokens for a fixed set of scopes.
#[derive(Debug)]
pub struct TokenProvider {
    http: reqwest::Client,
    credentials: Credentials,
    scopes: Vec<String>,
    token_uri: String,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// Creates a provider. The token endpoint is taken from `token_uri`, then
    /// from the key file, then [`DEFAULT_TOKEN_URI`].
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        credentials: Credentials,
        scopes: &[&str],
        token_uri: Option<&str>,
    ) -> Self {
        let key_uri = match &credentials {
            Credentials::ServiceAccount(key) => key.token_uri.clone(),
            Credentials::AccessToken(_) => None,
        };
        let resolved = token_uri
            .map(str::to_owned)
            .or(key_uri)
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_owned());
        Self {
            http,
            credentials,
            scopes: scopes.iter().map(|scope| (*scope).to_owned()).collect(),
            token_uri: resolved,
            cache: Mutex::new(None),
        }
    }

    /// Returns the token endpoint in use.
    #[must_use]
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Returns a valid access token, exchanging the key when the cached token
    /// is missing or about to expire.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when signing or the exchange fails.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let key = match &self.credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref().filter(|c| Instant::now() < c.refresh_at) {
            return Ok(cached.value.clone());
        }

        let (value, lifetime) = self.exchange(key).await?;
        let refresh_at = Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN);
        *cache = Some(CachedToken {
            value: value.clone(),
            refresh_at,
        });
        Ok(value)
    }

    fn assertion(&self, key: &ServiceAccountKey) -> Result<String, AuthError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| AuthError::Signing(err.to_string()))?
            .as_secs();
        let claims = Claims {
            iss: &key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME.as_secs(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&key.private_key_id);
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|err| AuthError::InvalidKey(err.to_string()))?;
        jsonwebtoken::encode(&header, &claims, &signing_key)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<(String, Duration), AuthError> {
        let assertion = self.assertion(key)?;
        debug!(token_uri = %self.token_uri, client_email = %key.client_email, "exchanging service account assertion");

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            AuthError::TokenExchange {
                status: status.as_u16(),
                message: format!("malformed token response: {err}"),
            }
        })?;
        let lifetime = token
            .expires_in
            .map_or(ASSERTION_LIFETIME, Duration::from_secs);
        info!(client_email = %key.client_email, expires_in = lifetime.as_secs(), "obtained access token");
        Ok((token.access_token, lifetime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn access_token_config_wins_over_key_file() {
        let cfg = GcpConfig {
            access_token: Some(String::from(" ya29.token ")),
            credentials_file: Some(String::from("/does/not/exist.json")),
            ..GcpConfig::for_project("proj")
        };
        let creds = Credentials::from_config(&cfg).unwrap_or_else(|err| panic!("creds: {err}"));
        assert_eq!(creds, Credentials::AccessToken(String::from("ya29.token")));
    }

    #[rstest]
    fn missing_key_file_is_reported_with_path() {
        let cfg = GcpConfig {
            credentials_file: Some(String::from("/does/not/exist.json")),
            ..GcpConfig::for_project("proj")
        };
        let err = Credentials::from_config(&cfg).expect_err("missing key file");
        assert_eq!(
            err,
            AuthError::CredentialsNotFound {
                path: String::from("/does/not/exist.json")
            }
        );
    }

    #[rstest]
    fn key_type_other_than_service_account_is_rejected() {
        let raw = r#"{"type":"authorized_user","private_key":"k","client_email":"e"}"#;
        let err = ServiceAccountKey::from_json(raw).expect_err("wrong key type");
        assert!(matches!(err, AuthError::InvalidKey(_)), "unexpected: {err}");
    }

    #[rstest]
    fn debug_output_redacts_private_key() {
        let raw = r#"{"private_key":"SECRET","client_email":"sa@example.com"}"#;
        let key = ServiceAccountKey::from_json(raw).unwrap_or_else(|err| panic!("key: {err}"));
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("SECRET"), "rendered: {rendered}");
    }

    #[tokio::test]
    async fn static_token_is_returned_without_exchange() {
        let provider = TokenProvider::new(
            reqwest::Client::new(),
            Credentials::AccessToken(String::from("static")),
            &[CLOUD_PLATFORM_SCOPE],
            None,
        );
        let token = provider
            .access_token()
            .await
            .unwrap_or_else(|err| panic!("token: {err}"));
        assert_eq!(token, "static");
        assert_eq!(provider.token_uri(), DEFAULT_TOKEN_URI);
    }
}
