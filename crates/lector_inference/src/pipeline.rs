use std::future::Future;
use std::sync::Arc;

use lector_core::{CallOutcome, Error, ModelCandidate, Result};

use crate::models::TextModel;
use crate::tasks::{GenerationTask, TaskContext};

/// Attempts `candidates` in priority order, each exactly once.
///
/// `Success` returns immediately. `RateLimited` and `Fatal` stop the loop and
/// surface as errors. `Recoverable` moves on to the next candidate. Running
/// out of candidates yields [`Error::Exhausted`] carrying the last failure.
pub async fn run_candidates<T, F, Fut>(
    label: &str,
    candidates: &[ModelCandidate],
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(ModelCandidate) -> Fut,
    Fut: Future<Output = CallOutcome<T>>,
{
    let mut last_error = None;

    for candidate in candidates {
        tracing::info!("🤖 {}: trying {}", label, candidate);
        match attempt(candidate.clone()).await {
            CallOutcome::Success(payload) => {
                tracing::info!("✅ {}: {} succeeded", label, candidate);
                return Ok(payload);
            }
            CallOutcome::RateLimited { retry_after_secs } => {
                tracing::warn!(
                    "⏳ {}: rate limited on {}, retry after {}s",
                    label,
                    candidate,
                    retry_after_secs
                );
                return Err(Error::RateLimited { retry_after_secs });
            }
            CallOutcome::Fatal(error) => {
                tracing::error!("⛔ {}: {} failed terminally: {}", label, candidate, error);
                return Err(error);
            }
            CallOutcome::Recoverable {
                message,
                retry_after_secs,
            } => {
                match retry_after_secs {
                    Some(wait) => tracing::warn!(
                        "⚠️ {}: {} unavailable ({}), ready in ~{}s",
                        label,
                        candidate,
                        message,
                        wait
                    ),
                    None => tracing::warn!("⚠️ {}: {} failed: {}", label, candidate, message),
                }
                last_error = Some(format!("{}: {}", candidate, message));
            }
        }
    }

    tracing::error!("{}: all {} candidates failed", label, candidates.len());
    Err(Error::Exhausted {
        task: label.to_string(),
        last_error,
    })
}

/// Runs generation tasks against a text provider.
#[derive(Debug, Clone)]
pub struct TextPipeline {
    model: Arc<dyn TextModel>,
}

impl TextPipeline {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self { model }
    }

    /// One attempt of `task` with a single candidate.
    pub async fn invoke(
        &self,
        task: &GenerationTask,
        candidate: &ModelCandidate,
        body: &str,
        context: &TaskContext,
    ) -> CallOutcome<String> {
        let prompt = task.build_prompt(body, context);
        self.model.complete(candidate, &prompt).await
    }

    /// Runs `task` over its candidate list. An empty body never reaches a provider.
    pub async fn run_task(
        &self,
        task: &GenerationTask,
        body: &str,
        context: &TaskContext,
    ) -> Result<String> {
        if body.trim().is_empty() {
            return Err(Error::Content("article body is empty".to_string()));
        }

        let prompt = task.build_prompt(body, context);
        let model = &self.model;
        let prompt = &prompt;
        run_candidates(task.kind.as_str(), &task.candidates, move |candidate| async move {
            model.complete(&candidate, prompt).await
        })
        .await
    }
}
