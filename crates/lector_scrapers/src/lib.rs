pub mod extract;
pub mod manager;

pub use extract::{ExtractionRules, Extractor, HeuristicExtractor};
pub use manager::ScraperManager;

pub mod prelude {
    pub use super::extract::Extractor;
    pub use super::manager::ScraperManager;
    pub use lector_core::{ArticleDocument, Error, Result};
}
