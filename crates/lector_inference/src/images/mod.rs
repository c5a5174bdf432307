use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lector_core::{
    CallOutcome, Config, Error, Fetcher, ImageBackend, ImageResult, ModelCandidate, Result,
};
use reqwest::StatusCode;

use crate::models::truncate;
use crate::pipeline::run_candidates;

pub mod huggingface;
pub mod images_api;
pub mod payload;

pub use huggingface::HuggingFaceModel;
pub use images_api::ImagesApiModel;
pub use payload::ImagePayload;

/// A remote image-generation provider. One call is one attempt with one candidate.
#[async_trait]
pub trait ImageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn generate(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<ImageResult>;
}

/// Builds the configured image provider. Fails when its credential is missing.
pub fn create_image_model(config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<Arc<dyn ImageModel>> {
    let model: Arc<dyn ImageModel> = match config.providers.image_backend {
        ImageBackend::HuggingFace => Arc::new(HuggingFaceModel::new(
            config.credentials.image_api_key()?,
            config.providers.image_endpoint_templates.clone(),
            &config.http,
            fetcher,
        )?),
        ImageBackend::ImagesApi => Arc::new(ImagesApiModel::new(
            config.credentials.text_api_key()?,
            &config.providers.images_api_base_url,
            &config.http,
            fetcher,
        )?),
    };
    tracing::info!("🎨 Image provider ready ({})", model.name());
    Ok(model)
}

/// Credential or billing problems. These end the whole candidate loop.
pub(crate) fn account_error(status: StatusCode, body: &str) -> Option<Error> {
    let lowered = body.to_lowercase();
    let account_status = matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::PAYMENT_REQUIRED | StatusCode::FORBIDDEN
    );
    if account_status || lowered.contains("billing") || lowered.contains("paid") {
        let message = match truncate(body, 200) {
            text if text.is_empty() => status.canonical_reason().unwrap_or("account error").to_string(),
            text => text,
        };
        return Some(Error::Account {
            status: status.as_u16(),
            message,
        });
    }
    None
}

/// Runs image candidates against one image provider.
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    model: Arc<dyn ImageModel>,
}

impl ImagePipeline {
    pub fn new(model: Arc<dyn ImageModel>) -> Self {
        Self { model }
    }

    pub async fn invoke(&self, prompt: &str, candidates: &[ModelCandidate]) -> Result<ImageResult> {
        if prompt.trim().is_empty() {
            return Err(Error::Content("image prompt is empty".to_string()));
        }

        let model = &self.model;
        run_candidates("image", candidates, move |candidate| async move {
            model.generate(&candidate, prompt).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scripted::ScriptedImageModel;
    use pretty_assertions::assert_eq;

    fn candidates(ids: &[&str]) -> Vec<ModelCandidate> {
        ids.iter().copied().map(ModelCandidate::from).collect()
    }

    fn png() -> ImageResult {
        ImageResult {
            mime_type: "image/png".to_string(),
            bytes: b"png".to_vec(),
        }
    }

    #[test]
    fn test_account_error_classification() {
        assert!(account_error(StatusCode::UNAUTHORIZED, "").is_some());
        assert!(account_error(StatusCode::FORBIDDEN, "nope").is_some());
        assert!(account_error(StatusCode::BAD_REQUEST, "Billing hard limit reached").is_some());
        assert!(account_error(StatusCode::NOT_FOUND, "Not Found").is_none());
        assert!(account_error(StatusCode::INTERNAL_SERVER_ERROR, "boom").is_none());
    }

    #[tokio::test]
    async fn test_second_model_succeeds_and_later_ones_are_skipped() {
        let model = Arc::new(
            ScriptedImageModel::new("script")
                .on("a", CallOutcome::recoverable("no endpoint serves this model"))
                .on("b", CallOutcome::Success(png()))
                .on("c", CallOutcome::Success(png())),
        );
        let pipeline = ImagePipeline::new(model.clone());

        let image = pipeline.invoke("a fox", &candidates(&["a", "b", "c"])).await.unwrap();
        assert_eq!(image, png());
        assert_eq!(model.attempted(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_account_error_stops_all_models() {
        let model = Arc::new(
            ScriptedImageModel::new("script")
                .on(
                    "a",
                    CallOutcome::Fatal(Error::Account {
                        status: 401,
                        message: "Invalid token".to_string(),
                    }),
                )
                .on("b", CallOutcome::Success(png())),
        );
        let pipeline = ImagePipeline::new(model.clone());

        let err = pipeline.invoke("a fox", &candidates(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, Error::Account { status: 401, .. }));
        assert_eq!(model.attempted(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_warming_models_exhaust_pipeline() {
        let loading = CallOutcome::Recoverable {
            message: "model is loading".to_string(),
            retry_after_secs: Some(20),
        };
        let model = Arc::new(
            ScriptedImageModel::new("script")
                .on("a", loading.clone())
                .on("b", loading),
        );
        let pipeline = ImagePipeline::new(model.clone());

        let err = pipeline.invoke("a fox", &candidates(&["a", "b"])).await.unwrap_err();
        assert_eq!(
            err,
            Error::Exhausted {
                task: "image".to_string(),
                last_error: Some("b: model is loading".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_pipeline_walks_endpoints_then_models() {
        use lector_core::{HttpSettings, ReqwestFetcher};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        for (route, status, calls) in [
            ("/a/org/one", 410u16, 1u64),
            ("/b/org/one", 404, 1),
            ("/a/org/two", 410, 1),
            ("/a/org/three", 200, 0),
            ("/b/org/three", 200, 0),
        ] {
            Mock::given(method("POST"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status).set_body_raw(b"png".to_vec(), "image/png"))
                .expect(calls)
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/b/org/two"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"png".to_vec(), "image/png"))
            .expect(1)
            .mount(&server)
            .await;

        let templates = vec![
            format!("{}/a/{{model}}", server.uri()),
            format!("{}/b/{{model}}", server.uri()),
        ];
        let fetcher = Arc::new(ReqwestFetcher::new(HttpSettings::default()).unwrap());
        let model =
            HuggingFaceModel::new("hf-key", templates, &HttpSettings::default(), fetcher).unwrap();
        let pipeline = ImagePipeline::new(Arc::new(model));

        let image = pipeline
            .invoke("a fox", &candidates(&["org/one", "org/two", "org/three"]))
            .await
            .unwrap();
        assert_eq!(image, png());
    }

    #[test]
    fn test_create_image_model_requires_matching_key() {
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(lector_core::ReqwestFetcher::new(Default::default()).unwrap());

        let mut config = Config::default();
        config.credentials.text_api_key = Some("sk".to_string());
        assert!(matches!(
            create_image_model(&config, fetcher.clone()),
            Err(Error::Configuration(_))
        ));

        config.providers.image_backend = ImageBackend::ImagesApi;
        let model = create_image_model(&config, fetcher).unwrap();
        assert_eq!(model.name(), "ImagesApi");
    }
}
