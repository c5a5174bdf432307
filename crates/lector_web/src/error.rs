use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lector_core::Error;
use serde_json::json;

/// Error body returned by every route: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Page fetch failures: the upstream status is mirrored, anything else is a 500.
    pub fn from_fetch(err: Error) -> Self {
        match err {
            Error::UpstreamStatus { .. } | Error::InvalidUrl(_) | Error::InvalidRequest(_) => {
                ApiError::from(err)
            }
            other => {
                tracing::error!("Failed to parse article: {}", other);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Не удалось загрузить статью.",
                )
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidUrl(message) | Error::InvalidRequest(message) => {
                ApiError::bad_request(message)
            }
            Error::UpstreamStatus { status, message } => ApiError::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                format!("Failed to fetch URL: {}", message),
            ),
            Error::Transport(message) => {
                tracing::error!("Transport failure: {}", message);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Не удалось подключиться к источнику.",
                )
            }
            Error::Content(message) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, message),
            Error::Configuration(message) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            Error::RateLimited { retry_after_secs } => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "Превышен лимит запросов. Попробуйте позже через {} секунд.",
                    retry_after_secs
                ),
            ),
            Error::Account { status, message } => {
                tracing::error!("Provider refused the account ({}): {}", status, message);
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    format!("Ошибка доступа к API ({}). Проверьте ключ и баланс.", status),
                )
            }
            Error::Exhausted { task, last_error } => {
                if let Some(last_error) = last_error {
                    tracing::error!("{}: last provider failure: {}", task, last_error);
                }
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, exhausted_message(&task))
            }
        }
    }
}

fn exhausted_message(task: &str) -> String {
    let action = match task {
        "translate" => "выполнить перевод",
        "summary" => "создать краткое описание",
        "thesis" => "создать тезисы",
        "telegram" => "создать пост для Telegram",
        "illustration-prompt" => "создать промпт",
        "image" => "сгенерировать изображение",
        _ => "выполнить запрос",
    };
    format!("Не удалось {}. Все модели недоступны. Попробуйте позже.", action)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{} {}", self.status, self.message);
        } else {
            tracing::warn!("{} {}", self.status, self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
