use std::fmt;

use async_trait::async_trait;
use lector_core::{CallOutcome, Error, HttpSettings, ModelCandidate, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{read_body, retry_after_secs, truncate, TextModel};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// OpenAI-compatible chat completions endpoint (OpenRouter by default).
pub struct OpenRouterModel {
    client: Client,
    api_key: String,
    base_url: String,
    max_body_bytes: u64,
}

impl OpenRouterModel {
    pub fn new(api_key: &str, base_url: &str, http: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(http.connect_timeout)
            .timeout(http.provider_timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_body_bytes: http.max_page_bytes,
        })
    }
}

impl fmt::Debug for OpenRouterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TextModel for OpenRouterModel {
    fn name(&self) -> &str {
        "OpenRouter"
    }

    async fn complete(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<String> {
        let request = ChatRequest {
            model: model.as_str(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return CallOutcome::recoverable(e.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return CallOutcome::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            };
        }

        let body = match read_body(response, self.max_body_bytes).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return CallOutcome::recoverable(e.to_string()),
        };

        if !status.is_success() {
            tracing::warn!("OpenRouter error ({}) {}: {}", model, status, truncate(&body, 500));
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .and_then(|error| error.message)
                .unwrap_or_else(|| format!("API error: {}", status));
            return CallOutcome::recoverable(message);
        }

        let parsed = match serde_json::from_str::<ChatResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => return CallOutcome::recoverable(format!("unparsable response: {}", e)),
        };

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        match content {
            Some(content) => CallOutcome::Success(content),
            None => CallOutcome::recoverable("no usable content"),
        }
    }
}
