use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lector_core::config::OPENROUTER_BASE_URL;
use lector_core::{Config, Credentials, ImageBackend};
use lector_inference::{
    create_image_model, create_text_model, GenerationTask, ImagePipeline, Illustrator,
    TaskContext, TaskKind, TextPipeline,
};
use lector_scrapers::ScraperManager;
use lector_web::{create_app, AppState};
use tracing::info;

mod logging;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Huggingface,
    ImagesApi,
}

impl From<BackendArg> for ImageBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Huggingface => ImageBackend::HuggingFace,
            BackendArg::ImagesApi => ImageBackend::ImagesApi,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Read, summarize and illustrate web articles", long_about = None)]
struct Cli {
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true, global = true)]
    openrouter_api_key: Option<String>,
    #[arg(long, env = "HUGGINGFACE_API_KEY", hide_env_values = true, global = true)]
    huggingface_api_key: Option<String>,
    #[arg(long, value_enum, default_value = "huggingface", global = true)]
    image_backend: BackendArg,
    /// Base URL of the OpenAI-compatible images API
    #[arg(long, default_value = OPENROUTER_BASE_URL, global = true)]
    images_api_url: String,
    /// Log filter, e.g. `info` or `lector_inference=debug`. RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
    },
    /// Extract title, date and body from an article
    Parse { url: String },
    /// Run a text task (translate, summary, thesis, telegram) on an article
    Generate { kind: String, url: String },
    /// Write an image prompt for an article and render it
    Illustrate {
        url: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config {
            credentials: Credentials {
                text_api_key: self.openrouter_api_key.clone(),
                image_api_key: self.huggingface_api_key.clone(),
            },
            ..Config::default()
        };
        config.providers.image_backend = self.image_backend.into();
        config.providers.images_api_base_url = self.images_api_url.clone();
        config
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);
    let config = cli.config();

    match cli.command {
        Commands::Serve { bind } => {
            let state = AppState::from_config(&config)?;
            let app = create_app(state);
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("Failed to bind to {}", bind))?;
            info!("🚀 Listening on http://{}", bind);
            axum::serve(listener, app).await.context("Server error")?;
        }
        Commands::Parse { url } => {
            let scraper = ScraperManager::from_config(&config)?;
            let document = scraper.scrape_url(&url).await?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        Commands::Generate { kind, url } => {
            let kind: TaskKind = kind.parse()?;
            if !TaskKind::TEXT.contains(&kind) {
                bail!("{} is not a text task", kind);
            }
            let pipeline = TextPipeline::new(create_text_model(&config)?);
            let scraper = ScraperManager::from_config(&config)?;

            let document = scraper.scrape_article(&url).await?;
            let context = TaskContext {
                title: document.title.clone(),
                published_at: document.published_at.clone(),
                source_url: Some(url.clone()),
            };
            let text = pipeline
                .run_task(&GenerationTask::for_kind(kind), &document.body, &context)
                .await?;
            println!("{}", text);
        }
        Commands::Illustrate { url, output } => {
            let scraper = ScraperManager::from_config(&config)?;
            let text = TextPipeline::new(create_text_model(&config)?);
            let images = ImagePipeline::new(create_image_model(&config, scraper.fetcher())?);
            let illustrator = Illustrator::new(text, images);

            let document = scraper.scrape_article(&url).await?;
            let illustration = illustrator.illustrate(&document.body).await?;

            let path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "illustration.{}",
                    extension_for(&illustration.image.mime_type)
                ))
            });
            tokio::fs::write(&path, &illustration.image.bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", illustration.prompt);
            info!("🖼️ Saved {} to {}", illustration.image.mime_type, path.display());
        }
    }

    Ok(())
}
