use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lector_core::{CallOutcome, Config, Error, ModelCandidate, Result};

pub mod openrouter;
pub mod scripted;

pub use openrouter::OpenRouterModel;
pub use scripted::ScriptedTextModel;

/// Seconds to wait after a 429 that carried no usable `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// A remote text-generation provider. One call is one attempt with one candidate.
#[async_trait]
pub trait TextModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn complete(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<String>;
}

/// Builds the text provider. Fails when the credential is missing.
pub fn create_text_model(config: &Config) -> Result<Arc<dyn TextModel>> {
    let api_key = config.credentials.text_api_key()?;
    let model = OpenRouterModel::new(
        api_key,
        &config.providers.text_base_url,
        &config.http,
    )?;
    tracing::info!("🧠 Text provider ready ({})", model.name());
    Ok(Arc::new(model))
}

/// `Retry-After` as whole seconds; HTTP-date and garbage values fall back to the default.
pub(crate) fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Reads a provider response body, giving up once it grows past `max_bytes`.
/// Oversized bodies are `Content` errors, broken streams are `Transport` errors.
pub(crate) async fn read_body(response: reqwest::Response, max_bytes: u64) -> Result<Vec<u8>> {
    if response.content_length().is_some_and(|len| len > max_bytes) {
        return Err(Error::Content(format!("response larger than {} bytes", max_bytes)));
    }
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Transport(e.to_string()))?;
        if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
            return Err(Error::Content(format!("response larger than {} bytes", max_bytes)));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Shortens provider error bodies before they reach logs or outcome messages.
pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
