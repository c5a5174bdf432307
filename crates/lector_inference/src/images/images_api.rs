use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lector_core::{CallOutcome, Error, Fetcher, HttpSettings, ImageResult, ModelCandidate, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::payload::ImagePayload;
use super::{account_error, ImageModel};
use crate::models::{read_body, retry_after_secs, truncate};

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
}

#[derive(Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<Value>,
}

/// OpenAI-compatible `/images/generations` client.
pub struct ImagesApiModel {
    client: Client,
    api_key: String,
    base_url: String,
    max_body_bytes: u64,
    fetcher: Arc<dyn Fetcher>,
}

impl ImagesApiModel {
    pub fn new(
        api_key: &str,
        base_url: &str,
        http: &HttpSettings,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
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
            fetcher,
        })
    }
}

impl fmt::Debug for ImagesApiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagesApiModel")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl ImageModel for ImagesApiModel {
    fn name(&self) -> &str {
        "ImagesApi"
    }

    async fn generate(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<ImageResult> {
        let request = GenerationRequest {
            model: model.as_str(),
            prompt,
            n: 1,
        };

        let response = match self
            .client
            .post(format!("{}/images/generations", self.base_url))
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
            if let Some(error) = account_error(status, &body) {
                return CallOutcome::Fatal(error);
            }
            tracing::warn!("Images API error ({}) {}: {}", model, status, truncate(&body, 500));
            return CallOutcome::recoverable(format!("API error: {}", status));
        }

        let parsed = match serde_json::from_str::<GenerationResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => return CallOutcome::recoverable(format!("unparsable response: {}", e)),
        };

        match parsed.data.first() {
            Some(entry) => {
                ImagePayload::from_json(entry)
                    .normalize(self.fetcher.as_ref())
                    .await
            }
            None => CallOutcome::recoverable("no image in response"),
        }
    }
}
