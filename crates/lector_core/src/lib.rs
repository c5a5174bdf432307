pub mod config;
pub mod error;
pub mod fetch;
pub mod types;

pub use config::{Config, Credentials, HttpSettings, ImageBackend, ProviderSettings};
pub use error::{Error, Result};
pub use fetch::{FetchedPage, Fetcher, ReqwestFetcher};
pub use types::{ArticleDocument, CallOutcome, ImageResult, ModelCandidate};
