use lector_core::{ImageResult, ModelCandidate, Result};

use crate::images::ImagePipeline;
use crate::pipeline::TextPipeline;
use crate::tasks::{image_candidates, GenerationTask, TaskContext, TaskKind};

#[derive(Debug, Clone)]
pub struct Illustration {
    pub prompt: String,
    pub image: ImageResult,
}

/// Writes an image prompt for an article, then renders it.
#[derive(Debug, Clone)]
pub struct Illustrator {
    text: TextPipeline,
    images: ImagePipeline,
    prompt_task: GenerationTask,
    image_candidates: Vec<ModelCandidate>,
}

impl Illustrator {
    pub fn new(text: TextPipeline, images: ImagePipeline) -> Self {
        Self {
            text,
            images,
            prompt_task: GenerationTask::for_kind(TaskKind::IllustrationPrompt),
            image_candidates: image_candidates(),
        }
    }

    pub async fn illustrate(&self, body: &str) -> Result<Illustration> {
        let prompt = self
            .text
            .run_task(&self.prompt_task, body, &TaskContext::default())
            .await?;
        tracing::info!("🖌️ Image prompt: {}", prompt);

        let image = self.images.invoke(&prompt, &self.image_candidates).await?;
        Ok(Illustration { prompt, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scripted::{ScriptedImageModel, ScriptedTextModel};
    use lector_core::{CallOutcome, Error};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const PROMPT_MODEL: &str = "nvidia/nemotron-3-nano-30b-a3b:free";

    fn png() -> ImageResult {
        ImageResult {
            mime_type: "image/png".to_string(),
            bytes: b"png".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_prompt_feeds_image_pipeline() {
        let text = Arc::new(ScriptedTextModel::new("text").on(
            PROMPT_MODEL,
            CallOutcome::Success("A lighthouse at dawn".to_string()),
        ));
        let images = Arc::new(
            ScriptedImageModel::new("images")
                .on("stabilityai/sdxl", CallOutcome::recoverable("gone"))
                .on(
                    "stabilityai/stable-diffusion-xl-base-1.0",
                    CallOutcome::Success(png()),
                ),
        );
        let illustrator = Illustrator::new(
            TextPipeline::new(text.clone()),
            ImagePipeline::new(images.clone()),
        );

        let illustration = illustrator.illustrate("Article body").await.unwrap();
        assert_eq!(illustration.prompt, "A lighthouse at dawn");
        assert_eq!(illustration.image, png());
        assert_eq!(
            images.attempted(),
            vec!["stabilityai/sdxl", "stabilityai/stable-diffusion-xl-base-1.0"]
        );
        assert_eq!(images.prompts()[0], "A lighthouse at dawn");
    }

    #[tokio::test]
    async fn test_prompt_failure_skips_image_generation() {
        let text = Arc::new(
            ScriptedTextModel::new("text")
                .on(PROMPT_MODEL, CallOutcome::RateLimited { retry_after_secs: 5 }),
        );
        let images = Arc::new(ScriptedImageModel::new("images"));
        let illustrator = Illustrator::new(
            TextPipeline::new(text),
            ImagePipeline::new(images.clone()),
        );

        let err = illustrator.illustrate("Article body").await.unwrap_err();
        assert_eq!(err, Error::RateLimited { retry_after_secs: 5 });
        assert!(images.attempted().is_empty());
    }
}
