use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use lector_inference::{GenerationTask, TaskContext, TaskKind};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub body: Option<String>,
    pub title: Option<String>,
    pub published_at: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IllustrationRequest {
    pub body: Option<String>,
}

/// Malformed or mistyped JSON gets the same answer as a missing field.
fn json_payload<T>(
    payload: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, ApiError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        ApiError::bad_request(message)
    })
}

fn required_body(body: Option<String>) -> Result<String, ApiError> {
    body.filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Content is required"))
}

pub async fn parse_article(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ParseRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_payload(payload, "URL is required")?;
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    let document = state
        .scraper
        .scrape_url(url.trim())
        .await
        .map_err(ApiError::from_fetch)?;
    let body = (!document.body.is_empty()).then_some(document.body);
    Ok(Json(json!({
        "title": document.title,
        "publishedAt": document.published_at,
        "body": body,
    })))
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult {
    let kind = kind
        .parse::<TaskKind>()
        .ok()
        .filter(|kind| TaskKind::TEXT.contains(kind))
        .ok_or_else(|| ApiError::not_found(format!("Unknown task: {}", kind)))?;
    let request = json_payload(payload, "Content is required")?;
    let body = required_body(request.body)?;
    let pipeline = state.text()?;

    let context = TaskContext {
        title: request.title,
        published_at: request.published_at,
        source_url: request.source_url,
    };
    let text = pipeline
        .run_task(&GenerationTask::for_kind(kind), &body, &context)
        .await?;

    let mut response = serde_json::Map::new();
    response.insert(kind.response_field().to_string(), Value::String(text));
    Ok(Json(Value::Object(response)))
}

pub async fn illustration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IllustrationRequest>, JsonRejection>,
) -> ApiResult {
    let request = json_payload(payload, "Content is required")?;
    let body = required_body(request.body)?;
    let illustrator = state.illustrator()?;

    let illustration = illustrator.illustrate(&body).await?;
    Ok(Json(json!({
        "image": illustration.image.to_data_uri(),
        "prompt": illustration.prompt,
    })))
}
