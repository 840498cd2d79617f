//! Service account key files.

use std::fmt;
use std::io;

use camino::Utf8Path;
use serde::Deserialize;

use super::AuthError;
use crate::files;

/// The subset of a Google service account key used for token exchange.
#[derive(Clone, Deserialize, Eq, PartialEq)]
pub struct ServiceAccountKey {
    /// Key type; Google issues `service_account`.
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    /// Project the service account belongs to.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Identifier of the signing key, sent as the JWT `kid`.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// PEM encoded RSA private key.
    pub private_key: String,
    /// Service account e-mail, used as the JWT issuer.
    pub client_email: String,
    /// Token endpoint advertised by the key.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parses a key from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidKey`] when the JSON is malformed, is not a
    /// service account key, or lacks a private key.
    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let key: Self =
            serde_json::from_str(raw).map_err(|err| AuthError::InvalidKey(err.to_string()))?;
        match key.key_type.as_deref() {
            None | Some("service_account") => {}
            Some(kind) => {
                return Err(AuthError::InvalidKey(format!(
                    "expected a service_account key, found {kind}"
                )));
            }
        }
        if key.private_key.trim().is_empty() {
            return Err(AuthError::InvalidKey(String::from("private_key is empty")));
        }
        if key.client_email.trim().is_empty() {
            return Err(AuthError::InvalidKey(String::from("client_email is empty")));
        }
        Ok(key)
    }

    /// Reads and parses a key file.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CredentialsNotFound`] when the file is missing,
    /// [`AuthError::Io`] when it cannot be read, and
    /// [`AuthError::InvalidKey`] when parsing fails.
    pub fn from_file(path: &Utf8Path) -> Result<Self, AuthError> {
        let raw = files::read_to_string(path).map_err(|err| Self::read_error(path, &err))?;
        Self::from_json(&raw)
    }

    fn read_error(path: &Utf8Path, err: &io::Error) -> AuthError {
        if err.kind() == io::ErrorKind::NotFound {
            AuthError::CredentialsNotFound {
                path: path.to_string(),
            }
        } else {
            AuthError::Io {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }
}
