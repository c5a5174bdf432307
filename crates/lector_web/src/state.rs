use lector_core::{Config, Result};
use lector_inference::{
    create_image_model, create_text_model, ImagePipeline, Illustrator, TextPipeline,
};
use lector_scrapers::ScraperManager;

/// Shared, immutable per-process state. Pipelines whose credentials are
/// missing keep the configuration error and report it on first use.
pub struct AppState {
    pub scraper: ScraperManager,
    text: Result<TextPipeline>,
    images: Result<ImagePipeline>,
}

impl AppState {
    pub fn new(
        scraper: ScraperManager,
        text: Result<TextPipeline>,
        images: Result<ImagePipeline>,
    ) -> Self {
        Self {
            scraper,
            text,
            images,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let scraper = ScraperManager::from_config(config)?;
        let text = create_text_model(config).map(TextPipeline::new);
        if let Err(e) = &text {
            tracing::warn!("Text generation disabled: {}", e);
        }
        let images = create_image_model(config, scraper.fetcher()).map(ImagePipeline::new);
        if let Err(e) = &images {
            tracing::warn!("Image generation disabled: {}", e);
        }
        Ok(Self::new(scraper, text, images))
    }

    pub fn text(&self) -> Result<&TextPipeline> {
        self.text.as_ref().map_err(Clone::clone)
    }

    /// Needs both the text and the image provider.
    pub fn illustrator(&self) -> Result<Illustrator> {
        let text = self.text()?.clone();
        let images = self.images.as_ref().map_err(Clone::clone)?.clone();
        Ok(Illustrator::new(text, images))
    }
}
