//! Speech-to-Text v1 synchronous recognition of short WAV clips.

pub mod audio;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::api::{ApiClient, ApiError};
use crate::files;

pub use audio::{AudioError, MonoClip, convert_to_mono};

/// Default recognition language.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Errors raised by the speech client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SpeechError {
    /// Raised when the audio cannot be read or decoded.
    #[error(transparent)]
    Audio(#[from] AudioError),
    /// Wrapper for API level failures.
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl RecognizeResponse {
    fn transcripts(self) -> Vec<String> {
        self.results
            .into_iter()
            .filter_map(|result| result.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript)
            .collect()
    }
}

/// Client for synchronous speech recognition.
#[derive(Clone, Debug)]
pub struct SpeechClient {
    api: ApiClient,
    language_code: String,
    sample_rate_hertz: Option<u32>,
}

impl SpeechClient {
    /// Creates a client recognising `en-US` at the file's own sample rate.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            language_code: DEFAULT_LANGUAGE.to_owned(),
            sample_rate_hertz: None,
        }
    }

    /// Sets the BCP-47 recognition language.
    #[must_use]
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    /// Forces the sample rate sent to the API instead of the WAV header's.
    #[must_use]
    pub const fn with_sample_rate(mut self, sample_rate_hertz: Option<u32>) -> Self {
        self.sample_rate_hertz = sample_rate_hertz;
        self
    }

    /// Recognises `LINEAR16` audio and returns the top transcript of each
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`SpeechError::Api`] when the request fails.
    pub async fn recognize(
        &self,
        content: &[u8],
        sample_rate_hertz: u32,
    ) -> Result<Vec<String>, SpeechError> {
        let url = self.api.url(&["speech:recognize"])?;
        let body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz,
                language_code: &self.language_code,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(content),
            },
        };
        let response: RecognizeResponse = self.api.post_json(&url, &body).await?;
        let transcripts = response.transcripts();
        info!(
            language = %self.language_code,
            sample_rate_hertz,
            results = transcripts.len(),
            "recognised speech"
        );
        Ok(transcripts)
    }

    /// Reads a mono WAV file and transcribes it.
    ///
    /// # Errors
    ///
    /// Returns [`SpeechError::Audio`] when the file cannot be read or its
    /// header decoded, and [`SpeechError::Api`] when recognition fails.
    pub async fn transcribe_file(&self, path: &Utf8Path) -> Result<Vec<String>, SpeechError> {
        let content = files::read_bytes(path).map_err(|err| AudioError::Io {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        let rate = match self.sample_rate_hertz {
            Some(rate) => rate,
            None => audio::sample_rate(&content)?,
        };
        self.recognize(&content, rate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn request_matches_wire_format() {
        let body = serde_json::to_value(RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: 44_100,
                language_code: "en-US",
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(b"RIFF"),
            },
        })
        .unwrap_or_else(|err| panic!("serialise: {err}"));
        assert_eq!(
            body,
            serde_json::json!({
                "config": {"encoding": "LINEAR16", "sampleRateHertz": 44100, "languageCode": "en-US"},
                "audio": {"content": "UklGRg=="}
            })
        );
    }

    #[rstest]
    fn transcripts_take_first_alternative() {
        let response: RecognizeResponse = serde_json::from_value(serde_json::json!({
            "results": [
                {"alternatives": [{"transcript": "the stale smell", "confidence": 0.9}, {"transcript": "the stale smelt"}]},
                {"alternatives": []},
                {"alternatives": [{"transcript": "of old beer"}]}
            ]
        }))
        .unwrap_or_else(|err| panic!("decode: {err}"));
        assert_eq!(
            response.transcripts(),
            vec![String::from("the stale smell"), String::from("of old beer")]
        );
    }

    #[rstest]
    fn empty_response_has_no_transcripts() {
        let response: RecognizeResponse =
            serde_json::from_str("{}").unwrap_or_else(|err| panic!("decode: {err}"));
        assert!(response.transcripts().is_empty());
    }
}
