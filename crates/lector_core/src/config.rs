use std::fmt;
use std::time::Duration;

use crate::{Error, Result};

/// Browser identity sent with every outbound request. Some publishers refuse
/// requests that do not look like a desktop browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Tried in order for every image model; `{model}` is replaced by the model id.
pub const HUGGINGFACE_ENDPOINT_TEMPLATES: &[&str] = &[
    "https://api-inference.huggingface.co/models/{model}",
    "https://router.huggingface.co/models/{model}",
    "https://hf-inference.huggingface.co/models/{model}",
];

#[derive(Clone, Default)]
pub struct Credentials {
    pub text_api_key: Option<String>,
    pub image_api_key: Option<String>,
}

impl Credentials {
    pub fn text_api_key(&self) -> Result<&str> {
        non_empty(&self.text_api_key)
            .ok_or_else(|| Error::Configuration("OPENROUTER_API_KEY is not configured".to_string()))
    }

    pub fn image_api_key(&self) -> Result<&str> {
        non_empty(&self.image_api_key)
            .ok_or_else(|| Error::Configuration("HUGGINGFACE_API_KEY is not configured".to_string()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("text_api_key", &self.text_api_key.as_deref().map(|_| "<redacted>"))
            .field("image_api_key", &self.image_api_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// Budget for fetching an article page or a remote image.
    pub fetch_timeout: Duration,
    /// Budget for a single model attempt.
    pub provider_timeout: Duration,
    pub max_page_bytes: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(30),
            provider_timeout: Duration::from_secs(120),
            max_page_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageBackend {
    /// Raw inference endpoints returning image bytes.
    #[default]
    HuggingFace,
    /// OpenAI-compatible `/images/generations` endpoint.
    ImagesApi,
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub text_base_url: String,
    pub image_backend: ImageBackend,
    pub image_endpoint_templates: Vec<String>,
    pub images_api_base_url: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            text_base_url: OPENROUTER_BASE_URL.to_string(),
            image_backend: ImageBackend::default(),
            image_endpoint_templates: HUGGINGFACE_ENDPOINT_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            images_api_base_url: OPENROUTER_BASE_URL.to_string(),
        }
    }
}

/// Process-wide configuration snapshot. Built once by the binary and handed
/// to every component at construction time.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub credentials: Credentials,
    pub http: HttpSettings,
    pub providers: ProviderSettings,
}
