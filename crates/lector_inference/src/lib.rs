pub mod illustration;
pub mod images;
pub mod models;
pub mod pipeline;
pub mod tasks;

pub mod prelude {
    pub use super::illustration::{Illustration, Illustrator};
    pub use super::images::{create_image_model, ImageModel, ImagePipeline};
    pub use super::models::{create_text_model, TextModel};
    pub use super::pipeline::TextPipeline;
    pub use super::tasks::{GenerationTask, TaskContext, TaskKind};
    pub use lector_core::{CallOutcome, Error, ImageResult, ModelCandidate, Result};
}

pub use illustration::{Illustration, Illustrator};
pub use images::{create_image_model, ImageModel, ImagePipeline};
pub use models::{create_text_model, TextModel};
pub use pipeline::{run_candidates, TextPipeline};
pub use tasks::{GenerationTask, TaskContext, TaskKind};
