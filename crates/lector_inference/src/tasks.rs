use std::fmt;
use std::str::FromStr;

use lector_core::{Error, ModelCandidate};
use serde::{Deserialize, Serialize};

const DEEPSEEK_R1: &str = "deepseek/deepseek-r1:free";
const DEEPSEEK_CHAT: &str = "deepseek/deepseek-chat:free";
const MIMO_FLASH: &str = "Xiaomi/MiMo-V2-Flash:free";
const NEMOTRON_NANO: &str = "nvidia/nemotron-3-nano-30b-a3b:free";

/// Image models for illustrations, most preferred first.
pub const IMAGE_MODELS: &[&str] = &[
    "stabilityai/sdxl",
    "stabilityai/stable-diffusion-xl-base-1.0",
    "stabilityai/stable-diffusion-2-1",
    "runwayml/stable-diffusion-v1-5",
    "CompVis/stable-diffusion-v1-4",
];

pub fn image_candidates() -> Vec<ModelCandidate> {
    IMAGE_MODELS.iter().copied().map(ModelCandidate::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Translate,
    Summary,
    Thesis,
    /// Social post for a Telegram channel.
    Telegram,
    IllustrationPrompt,
}

impl TaskKind {
    /// Tasks reachable through the generic text endpoint.
    pub const TEXT: [TaskKind; 4] = [
        TaskKind::Translate,
        TaskKind::Summary,
        TaskKind::Thesis,
        TaskKind::Telegram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Translate => "translate",
            TaskKind::Summary => "summary",
            TaskKind::Thesis => "thesis",
            TaskKind::Telegram => "telegram",
            TaskKind::IllustrationPrompt => "illustration-prompt",
        }
    }

    /// JSON field carrying the generated text in API responses.
    pub fn response_field(&self) -> &'static str {
        match self {
            TaskKind::Translate => "translation",
            TaskKind::Summary => "summary",
            TaskKind::Thesis => "thesis",
            TaskKind::Telegram => "post",
            TaskKind::IllustrationPrompt => "prompt",
        }
    }

    fn candidates(&self) -> &'static [&'static str] {
        match self {
            TaskKind::Translate => &[DEEPSEEK_R1, DEEPSEEK_CHAT],
            TaskKind::Summary | TaskKind::Thesis | TaskKind::Telegram => {
                &[DEEPSEEK_R1, DEEPSEEK_CHAT, MIMO_FLASH]
            }
            TaskKind::IllustrationPrompt => &[NEMOTRON_NANO],
        }
    }

    fn prompt_builder(&self) -> PromptBuilder {
        match self {
            TaskKind::Translate => translate_prompt,
            TaskKind::Summary => summary_prompt,
            TaskKind::Thesis => thesis_prompt,
            TaskKind::Telegram => telegram_prompt,
            TaskKind::IllustrationPrompt => illustration_prompt,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "translate" => Ok(TaskKind::Translate),
            "summary" | "summarize" => Ok(TaskKind::Summary),
            "thesis" => Ok(TaskKind::Thesis),
            "telegram" | "social-post" => Ok(TaskKind::Telegram),
            "illustration-prompt" => Ok(TaskKind::IllustrationPrompt),
            other => Err(Error::InvalidRequest(format!("unknown task: {}", other))),
        }
    }
}

/// Optional article metadata some prompts weave in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    pub title: Option<String>,
    pub published_at: Option<String>,
    pub source_url: Option<String>,
}

pub type PromptBuilder = fn(&str, &TaskContext) -> String;

/// A named transformation: prompt template plus ordered candidate models.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub kind: TaskKind,
    pub prompt_builder: PromptBuilder,
    pub candidates: Vec<ModelCandidate>,
}

impl GenerationTask {
    pub fn for_kind(kind: TaskKind) -> Self {
        Self {
            kind,
            prompt_builder: kind.prompt_builder(),
            candidates: kind
                .candidates()
                .iter()
                .copied()
                .map(ModelCandidate::from)
                .collect(),
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn build_prompt(&self, body: &str, context: &TaskContext) -> String {
        (self.prompt_builder)(body, context)
    }
}

fn translate_prompt(body: &str, _context: &TaskContext) -> String {
    format!(
        "Переведи следующую статью на русский язык. Сохрани структуру и форматирование текста:\n\n{}",
        body
    )
}

fn summary_prompt(body: &str, _context: &TaskContext) -> String {
    format!(
        "Опиши кратко, о чем эта статья на русском языке. Ответ должен быть кратким и информативным:\n\n{}",
        body
    )
}

fn thesis_prompt(body: &str, _context: &TaskContext) -> String {
    format!(
        "Создай тезисы этой статьи на русском языке. Выдели основные пункты и идеи в виде структурированного списка:\n\n{}",
        body
    )
}

fn telegram_prompt(body: &str, context: &TaskContext) -> String {
    let mut prompt = String::from(
        "Создай пост для Telegram на русском языке на основе этой статьи. \
         Пост должен быть кратким, информативным и привлекательным. \
         Используй эмодзи для оформления. Включи основные идеи и призыв к действию. \
         В конце поста обязательно добавь ссылку на источник статьи.\n\n",
    );
    if let Some(title) = present(&context.title) {
        prompt.push_str(&format!("Заголовок статьи: {}\n\n", title));
    }
    if let Some(date) = present(&context.published_at) {
        prompt.push_str(&format!("Дата публикации: {}\n\n", date));
    }
    prompt.push_str(&format!("Содержание статьи:\n{}", body));
    if let Some(url) = present(&context.source_url) {
        prompt.push_str(&format!("\n\nСсылка на источник: {}", url));
    }
    prompt
}

fn illustration_prompt(body: &str, _context: &TaskContext) -> String {
    format!(
        "Создай детальный промпт на английском языке для генерации изображения, которое иллюстрирует эту статью. \
         Промпт должен быть конкретным, описательным и подходящим для генерации изображения через Stable Diffusion. \
         Ответ должен содержать только промпт, без дополнительных объяснений:\n\n{}",
        body
    )
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
