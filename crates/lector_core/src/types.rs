use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Readable content isolated from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDocument {
    pub title: Option<String>,
    /// Raw date text as found on the page, never parsed.
    pub published_at: Option<String>,
    pub body: String,
}

impl ArticleDocument {
    /// Body text for generation tasks. An empty body is a terminal extraction failure.
    pub fn require_body(&self) -> Result<&str> {
        if self.body.trim().is_empty() {
            return Err(Error::Content("no readable content extracted".to_string()));
        }
        Ok(&self.body)
    }
}

/// Remote model identifier. Position in a candidate list encodes priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCandidate(String);

impl ModelCandidate {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelCandidate {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ModelCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classified result of a single provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome<T> {
    Success(T),
    /// Provider-wide throttling. Stops the candidate loop.
    RateLimited { retry_after_secs: u64 },
    /// This candidate failed; the next one may still succeed.
    Recoverable {
        message: String,
        retry_after_secs: Option<u64>,
    },
    Fatal(Error),
}

impl<T> CallOutcome<T> {
    pub fn recoverable(message: impl Into<String>) -> Self {
        CallOutcome::Recoverable {
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }
}

/// Generated image, normalized regardless of how the provider encoded it.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageResult {
    pub fn to_data_uri(&self) -> String {
        let mut encoded =
            String::with_capacity(base64::encoded_len(self.bytes.len(), true).unwrap_or(0) + 32);
        encoded.push_str("data:");
        encoded.push_str(&self.mime_type);
        encoded.push_str(";base64,");
        STANDARD.encode_string(&self.bytes, &mut encoded);
        encoded
    }
}

impl fmt::Debug for ImageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResult")
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}
