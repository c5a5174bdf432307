use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use lector_core::{CallOutcome, ImageResult, ModelCandidate};

use super::TextModel;
use crate::images::ImageModel;

/// Provider stand-in that answers from a per-model script and records every
/// call. Unscripted models fail recoverably.
pub struct Scripted<T> {
    name: &'static str,
    outcomes: HashMap<String, CallOutcome<T>>,
    calls: Mutex<Vec<(String, String)>>,
}

pub type ScriptedTextModel = Scripted<String>;
pub type ScriptedImageModel = Scripted<ImageResult>;

impl<T: Clone> Scripted<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            outcomes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, model: &str, outcome: CallOutcome<T>) -> Self {
        self.outcomes.insert(model.to_string(), outcome);
        self
    }

    /// Models attempted so far, in call order.
    pub fn attempted(&self) -> Vec<String> {
        self.lock_calls().iter().map(|(model, _)| model.clone()).collect()
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock_calls().iter().map(|(_, prompt)| prompt.clone()).collect()
    }

    fn answer(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<T> {
        self.lock_calls()
            .push((model.as_str().to_string(), prompt.to_string()));
        self.outcomes
            .get(model.as_str())
            .cloned()
            .unwrap_or_else(|| CallOutcome::recoverable(format!("{} is not scripted", model)))
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> fmt::Debug for Scripted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scripted")
            .field("name", &self.name)
            .field("models", &self.outcomes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl TextModel for Scripted<String> {
    fn name(&self) -> &str {
        self.name
    }

    async fn complete(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<String> {
        self.answer(model, prompt)
    }
}

#[async_trait]
impl ImageModel for Scripted<ImageResult> {
    fn name(&self) -> &str {
        self.name
    }

    async fn generate(&self, model: &ModelCandidate, prompt: &str) -> CallOutcome<ImageResult> {
        self.answer(model, prompt)
    }
}
