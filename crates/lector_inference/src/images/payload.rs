use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lector_core::{CallOutcome, Error, Fetcher, ImageResult};
use percent_encoding::percent_decode_str;
use serde_json::Value;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// The shapes an image provider may hand back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// `data:<mime>[;base64],<data>`
    DataUri(String),
    /// Absolute http(s) URL pointing at the image.
    Remote(String),
    /// Bare base64 without a media type.
    Base64(String),
    Binary {
        mime_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// Anything else; carries a short description of what arrived.
    Unsupported(String),
}

impl ImagePayload {
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        if text.starts_with("data:") {
            ImagePayload::DataUri(text.to_string())
        } else if text.starts_with("http://") || text.starts_with("https://") {
            ImagePayload::Remote(text.to_string())
        } else {
            ImagePayload::Base64(text.to_string())
        }
    }

    /// Interprets a JSON value: plain strings or `{b64_json}` / `{url}` objects.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::from_text(text),
            Value::Object(map) => {
                if let Some(Value::String(encoded)) = map.get("b64_json") {
                    ImagePayload::Base64(encoded.trim().to_string())
                } else if let Some(Value::String(url)) = map.get("url") {
                    Self::from_text(url)
                } else {
                    ImagePayload::Unsupported("object without image data".to_string())
                }
            }
            Value::Null => ImagePayload::Unsupported("null".to_string()),
            Value::Bool(_) => ImagePayload::Unsupported("boolean".to_string()),
            Value::Number(_) => ImagePayload::Unsupported("number".to_string()),
            Value::Array(_) => ImagePayload::Unsupported("array".to_string()),
        }
    }

    /// Converts to mime type plus bytes. Remote payloads are downloaded with `fetcher`.
    pub async fn normalize(self, fetcher: &dyn Fetcher) -> CallOutcome<ImageResult> {
        match self {
            ImagePayload::DataUri(uri) => decode_data_uri(&uri),
            ImagePayload::Remote(url) => match fetcher.fetch(&url).await {
                Ok(page) => {
                    let mime_type = page.media_type().map(str::to_string);
                    if let Some(mime) = mime_type.as_deref() {
                        if !mime.starts_with("image/") {
                            return CallOutcome::recoverable(format!(
                                "remote image has content type {}",
                                mime
                            ));
                        }
                    }
                    image(mime_type, page.bytes)
                }
                Err(e) => CallOutcome::recoverable(format!("failed to download image: {}", e)),
            },
            ImagePayload::Base64(encoded) => decode_base64(None, &encoded),
            ImagePayload::Binary { mime_type, bytes } => image(mime_type, bytes),
            ImagePayload::Unsupported(kind) => CallOutcome::Fatal(Error::Content(format!(
                "unexpected result type: {}",
                kind
            ))),
        }
    }
}

fn decode_data_uri(uri: &str) -> CallOutcome<ImageResult> {
    let Some((header, data)) = uri.trim_start_matches("data:").split_once(',') else {
        return CallOutcome::recoverable("malformed data URI");
    };
    match header.strip_suffix(";base64") {
        Some(mime) => decode_base64(Some(mime.to_string()), data),
        None => {
            // Plain data URIs are percent-encoded; parameters such as charset are dropped.
            let mime = header.split(';').next().unwrap_or_default();
            let bytes: Vec<u8> = percent_decode_str(data).collect();
            image(Some(mime.to_string()), bytes)
        }
    }
}

/// Providers wrap long base64 lines, so whitespace is ignored.
fn decode_base64(mime_type: Option<String>, encoded: &str) -> CallOutcome<ImageResult> {
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    match STANDARD.decode(compact) {
        Ok(bytes) => image(mime_type, bytes),
        Err(e) => CallOutcome::recoverable(format!("invalid base64 image: {}", e)),
    }
}

fn image(mime_type: Option<String>, bytes: Vec<u8>) -> CallOutcome<ImageResult> {
    if bytes.is_empty() {
        return CallOutcome::recoverable("empty image payload");
    }
    let mime_type = mime_type
        .filter(|mime| !mime.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
    CallOutcome::Success(ImageResult { mime_type, bytes })
}
