//! Q&A API client: `POST {base}/prompt?model=...` with a question, answer under `assistant`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "openai";
pub const DEFAULT_TEMPERATURE: f64 = 0.25;
pub const DEFAULT_TOKENS: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error("qa request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("qa api error: {0}")]
    Api(String),
    #[error("qa response decode failed: {0}")]
    Decode(String),
}

/// Remote endpoint and sampling parameters sent with every question.
#[derive(Debug, Clone, PartialEq)]
pub struct QaSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub tokens: u32,
}

impl QaSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            tokens: DEFAULT_TOKENS,
        }
    }
}

/// Anything that can answer a question with a JSON object.
#[async_trait]
pub trait QaBackend: Send + Sync {
    async fn ask(&self, question: &str) -> Result<Map<String, Value>, QaError>;
}

#[async_trait]
impl<T: QaBackend + ?Sized> QaBackend for Arc<T> {
    async fn ask(&self, question: &str) -> Result<Map<String, Value>, QaError> {
        (**self).ask(question).await
    }
}

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    question: &'a str,
    temperature: f64,
    tokens: u32,
}

/// Client for the Q&A HTTP API.
#[derive(Clone)]
pub struct QaClient {
    base_url: String,
    model: String,
    temperature: f64,
    tokens: u32,
    client: reqwest::Client,
}

impl QaClient {
    pub fn new(settings: &QaSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            tokens: settings.tokens,
            client: reqwest::Client::new(),
        }
    }

    fn prompt_url(&self) -> String {
        format!("{}/prompt", self.base_url)
    }
}

#[async_trait]
impl QaBackend for QaClient {
    /// POST /prompt: one question, one JSON object back.
    async fn ask(&self, question: &str) -> Result<Map<String, Value>, QaError> {
        let body = PromptRequest {
            question,
            temperature: self.temperature,
            tokens: self.tokens,
        };
        let res = self
            .client
            .post(self.prompt_url())
            .query(&[("model", self.model.as_str())])
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QaError::Api(format!("{} {}", status, body)));
        }
        let bytes = res.bytes().await?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(QaError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(QaError::Decode(e.to_string())),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
