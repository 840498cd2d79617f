//! Cloud Translation v2.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::api::{ApiClient, ApiError};

/// Errors raised by the translation client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TranslateError {
    /// Raised when there is nothing to translate.
    #[error("text to translate must not be empty")]
    EmptyText,
    /// Raised when no target language was given.
    #[error("target language must not be empty")]
    EmptyTarget,
    /// Raised when the API answers without a translation.
    #[error("translation response contained no translations")]
    NoTranslation,
    /// Wrapper for API level failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A translated text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Translation {
    /// Text in the target language.
    pub translated_text: String,
    /// Source language detected when none was given.
    pub detected_source_language: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationsData,
}

#[derive(Debug, Deserialize)]
struct TranslationsData {
    #[serde(default)]
    translations: Vec<TranslationItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationItem {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

/// Client for the Translation v2 API.
#[derive(Clone, Debug)]
pub struct TranslateClient {
    api: ApiClient,
}

impl TranslateClient {
    /// Creates a client on the Translation v2 root.
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Translates plain text into `target`, detecting the source language
    /// when `source` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError::EmptyText`] or [`TranslateError::EmptyTarget`]
    /// for blank input, [`TranslateError::NoTranslation`] when the response is
    /// empty, and [`TranslateError::Api`] when the call fails.
    pub async fn translate(
        &self,
        text: &str,
        target: &str,
        source: Option<&str>,
    ) -> Result<Translation, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyText);
        }
        let target_language = target.trim();
        if target_language.is_empty() {
            return Err(TranslateError::EmptyTarget);
        }
        let body = TranslateRequest {
            q: text,
            target: target_language,
            source: source.map(str::trim).filter(|value| !value.is_empty()),
            format: "text",
        };
        let url = self.api.base().clone();
        let response: TranslateResponse = self.api.post_json(&url, &body).await?;
        let item = response
            .data
            .translations
            .into_iter()
            .next()
            .ok_or(TranslateError::NoTranslation)?;
        info!(target_language, detected = ?item.detected_source_language, "translated text");
        Ok(Translation {
            translated_text: item.translated_text,
            detected_source_language: item.detected_source_language,
        })
    }
}
