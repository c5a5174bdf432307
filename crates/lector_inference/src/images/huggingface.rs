use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lector_core::{CallOutcome, Error, Fetcher, HttpSettings, ImageResult, ModelCandidate, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::payload::ImagePayload;
use super::{account_error, ImageModel};
use crate::models::{read_body, retry_after_secs, truncate};

/// Warm-up hint used when a 503 body carries no `estimated_time`.
pub const DEFAULT_WARMUP_SECS: u64 = 20;

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
struct LoadingBody {
    estimated_time: Option<f64>,
}

/// What one endpoint said about one model.
enum EndpointReply {
    Settled(CallOutcome<ImageResult>),
    /// Endpoint does not serve this model; the next template may.
    Gone(String),
}

/// Raw inference API: bytes in, bytes out, several endpoint generations.
pub struct HuggingFaceModel {
    client: Client,
    api_key: String,
    endpoint_templates: Vec<String>,
    fetcher: Arc<dyn Fetcher>,
    max_body_bytes: u64,
}

impl HuggingFaceModel {
    pub fn new(
        api_key: &str,
        endpoint_templates: Vec<String>,
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
            endpoint_templates,
            fetcher,
            max_body_bytes: http.max_page_bytes,
        })
    }

    async fn call_endpoint(&self, endpoint: &str, prompt: &str) -> EndpointReply {
        let response = match self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&InferenceRequest { inputs: prompt })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return EndpointReply::Gone(e.to_string()),
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return EndpointReply::Settled(CallOutcome::RateLimited {
                retry_after_secs: retry_after_secs(response.headers()),
            });
        }

        let bytes = match read_body(response, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(Error::Content(message)) => {
                return EndpointReply::Settled(CallOutcome::recoverable(message));
            }
            Err(e) => return EndpointReply::Gone(e.to_string()),
        };

        if status.is_success() {
            let is_image = content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("image"));
            if !is_image {
                let body = String::from_utf8_lossy(&bytes);
                return EndpointReply::Settled(CallOutcome::recoverable(format!(
                    "expected an image, got {}: {}",
                    content_type.as_deref().unwrap_or("no content type"),
                    truncate(&body, 200)
                )));
            }
            let mime_type = content_type.map(|ct| {
                ct.split(';').next().unwrap_or(&ct).trim().to_string()
            });
            let payload = ImagePayload::Binary { mime_type, bytes };
            return EndpointReply::Settled(payload.normalize(self.fetcher.as_ref()).await);
        }

        let body = String::from_utf8_lossy(&bytes).into_owned();

        if status == StatusCode::SERVICE_UNAVAILABLE {
            let wait = serde_json::from_str::<LoadingBody>(&body)
                .ok()
                .and_then(|loading| loading.estimated_time)
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(DEFAULT_WARMUP_SECS);
            return EndpointReply::Settled(CallOutcome::Recoverable {
                message: "model is loading".to_string(),
                retry_after_secs: Some(wait),
            });
        }

        if let Some(error) = account_error(status, &body) {
            return EndpointReply::Settled(CallOutcome::Fatal(error));
        }

        EndpointReply::Gone(format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)))
    }
}

impl fmt::Debug for HuggingFaceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceModel")
            .field("api_key", &"<redacted>")
            .field("endpoint_templates", &self.endpoint_templates)
            .finish()
    }
}

#[async_trait]
impl ImageModel for HuggingFaceModel {
    fn name(&self) -> &str {
        "HuggingFace"
    }

    async fn generate(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<ImageResult> {
        let mut last_gone = None;

        for template in &self.endpoint_templates {
            let endpoint = template.replace("{model}", model.as_str());
            match self.call_endpoint(&endpoint, prompt).await {
                EndpointReply::Settled(outcome) => return outcome,
                EndpointReply::Gone(reason) => {
                    tracing::debug!("🔌 {} unavailable at {}: {}", model, endpoint, reason);
                    last_gone = Some(reason);
                }
            }
        }

        CallOutcome::recoverable(match last_gone {
            Some(reason) => format!("no endpoint serves this model ({})", reason),
            None => "no endpoint serves this model".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lector_core::ReqwestFetcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn model_for(server: &MockServer) -> HuggingFaceModel {
        let templates = vec![
            format!("{}/legacy/{{model}}", server.uri()),
            format!("{}/router/{{model}}", server.uri()),
        ];
        let fetcher = Arc::new(ReqwestFetcher::new(HttpSettings::default()).unwrap());
        HuggingFaceModel::new("hf-key", templates, &HttpSettings::default(), fetcher).unwrap()
    }

    #[tokio::test]
    async fn test_image_bytes_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legacy/org/model"))
            .and(bearer_token("hf-key"))
            .and(body_json(json!({"inputs": "a red fox"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"jpeg".to_vec(), "image/jpeg"))
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "a red fox").await;
        assert_eq!(
            outcome,
            CallOutcome::Success(ImageResult {
                mime_type: "image/jpeg".to_string(),
                bytes: b"jpeg".to_vec(),
            })
        );
    }

    #[tokio::test]
    async fn test_gone_endpoint_falls_through_to_next_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legacy/org/model"))
            .respond_with(ResponseTemplate::new(410).set_body_string("no longer supported"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/router/org/model"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_every_endpoint_gone_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert!(matches!(outcome, CallOutcome::Recoverable { .. }));
    }

    #[tokio::test]
    async fn test_loading_model_reports_wait_and_skips_other_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legacy/org/model"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"estimated_time": 12.2})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/router/org/model"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert_eq!(
            outcome,
            CallOutcome::Recoverable {
                message: "model is loading".to_string(),
                retry_after_secs: Some(13),
            }
        );
    }

    #[tokio::test]
    async fn test_loading_without_estimate_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert!(matches!(
            outcome,
            CallOutcome::Recoverable {
                retry_after_secs: Some(DEFAULT_WARMUP_SECS),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_account_errors_are_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legacy/org/model"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid token"))
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert!(matches!(
            outcome,
            CallOutcome::Fatal(Error::Account { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_billing_message_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string("This model requires a paid subscription"),
            )
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert!(matches!(
            outcome,
            CallOutcome::Fatal(Error::Account { status: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_masked_by_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legacy/org/model"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "9"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/router/org/model"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert_eq!(outcome, CallOutcome::RateLimited { retry_after_secs: 9 });
    }

    #[tokio::test]
    async fn test_oversized_image_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/legacy/org/model"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "image/png"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/router/org/model"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
            .expect(0)
            .mount(&server)
            .await;

        let http = HttpSettings {
            max_page_bytes: 16,
            ..HttpSettings::default()
        };
        let fetcher = Arc::new(ReqwestFetcher::new(http.clone()).unwrap());
        let templates = vec![
            format!("{}/legacy/{{model}}", server.uri()),
            format!("{}/router/{{model}}", server.uri()),
        ];
        let model = HuggingFaceModel::new("hf-key", templates, &http, fetcher).unwrap();

        let outcome = model.generate(&"org/model".into(), "p").await;
        assert_eq!(
            outcome,
            CallOutcome::recoverable("response larger than 16 bytes")
        );
    }

    #[tokio::test]
    async fn test_non_image_success_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "oops"})))
            .mount(&server)
            .await;

        let outcome = model_for(&server).generate(&"org/model".into(), "p").await;
        assert!(matches!(outcome, CallOutcome::Recoverable { .. }));
    }
}
