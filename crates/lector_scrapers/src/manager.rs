use std::sync::Arc;

use lector_core::{ArticleDocument, Config, Error, Fetcher, ReqwestFetcher, Result};
use url::Url;

use crate::extract::{Extractor, HeuristicExtractor};

/// Fetches a page and runs it through the extractor.
pub struct ScraperManager {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
}

impl ScraperManager {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>) -> Self {
        Self { fetcher, extractor }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = ReqwestFetcher::new(config.http.clone())?;
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(HeuristicExtractor::new()),
        ))
    }

    pub fn fetcher(&self) -> Arc<dyn Fetcher> {
        self.fetcher.clone()
    }

    /// Extracts whatever the page offers. Missing fields are not an error here.
    pub async fn scrape_url(&self, url: &str) -> Result<ArticleDocument> {
        let url = parse_url(url)?;
        let page = self.fetcher.fetch(url.as_str()).await?;
        let document = self.extractor.extract(&page.text());

        tracing::info!(
            "📰 Extracted {:?} ({} chars) from {}",
            document.title.as_deref().unwrap_or("<untitled>"),
            document.body.chars().count(),
            page.final_url
        );
        Ok(document)
    }

    /// Like [`scrape_url`](Self::scrape_url), but an empty body is a failure.
    pub async fn scrape_article(&self, url: &str) -> Result<ArticleDocument> {
        let document = self.scrape_url(url).await?;
        document.require_body()?;
        Ok(document)
    }
}

pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidUrl(format!("unsupported scheme: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lector_core::FetchedPage;

    struct StaticFetcher(&'static str);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage> {
            Ok(FetchedPage {
                final_url: url.to_string(),
                content_type: Some("text/html".to_string()),
                bytes: self.0.as_bytes().to_vec(),
            })
        }
    }

    fn manager(html: &'static str) -> ScraperManager {
        ScraperManager::new(
            Arc::new(StaticFetcher(html)),
            Arc::new(HeuristicExtractor::new()),
        )
    }

    #[test]
    fn test_parse_url() {
        assert!(parse_url("https://example.com/a").is_ok());
        assert!(parse_url("  https://example.com/a  ").is_ok());
        assert!(parse_url("invalid-url").is_err());
        assert!(parse_url("file:///etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_scrape_article_rejects_empty_body() {
        let manager = manager("<html><body><nav>Only navigation</nav></body></html>");
        let doc = manager.scrape_url("https://example.com").await.unwrap();
        assert!(doc.body.is_empty());

        let err = manager.scrape_article("https://example.com").await.unwrap_err();
        assert!(matches!(err, Error::Content(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_fetcher() {
        let manager = manager("<html></html>");
        let err = manager.scrape_url("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
