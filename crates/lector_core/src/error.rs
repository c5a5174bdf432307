use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// DNS, connection, timeout or body-read failure.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Well-formed response without the content we needed.
    #[error("Content error: {0}")]
    Content(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// 401/403-class failure. Never retried on another candidate.
    #[error("Account error ({status}): {message}")]
    Account { status: u16, message: String },

    #[error("All providers unavailable for {task}")]
    Exhausted {
        task: String,
        last_error: Option<String>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
