use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::{ApiKey, LlmSettings, API_KEY_VAR};
use crate::error::AppError;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub media_type: &'static str,
    /// Base64 without any `data:` prefix.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub text: String,
    pub image: Option<ImageAttachment>,
}

/// One self-contained model call. Nothing carries over between requests.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub session_id: String,
    pub model: String,
    pub message: UserMessage,
}

/// The external chat model. Returns the model's text or fails on
/// transport, auth or API errors.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn send_message(&self, request: ChatRequest) -> Result<String>;

    /// Model selector used when the caller has no preference.
    fn model(&self) -> &str;
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct LLMClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl LLMClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, AppError> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| AppError::ConfigurationUnavailable(format!("{} is not set", API_KEY_VAR)))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::ConfigurationUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let mut content = Vec::new();
        if let Some(image) = &request.message.image {
            content.push(json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data
                }
            }));
        }
        content.push(json!({ "type": "text", "text": request.message.text }));

        json!({
            "model": request.model,
            "max_tokens": self.max_tokens,
            "system": request.system_prompt,
            "metadata": { "user_id": request.session_id },
            "messages": [
                { "role": "user", "content": content }
            ]
        })
    }
}

#[async_trait]
impl ModelGateway for LLMClient {
    async fn send_message(&self, request: ChatRequest) -> Result<String> {
        let body = self.request_body(&request);
        debug!(session_id = %request.session_id, model = %request.model, has_image = request.message.image.is_some(), "sending message to model");

        let res = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let error_text = res.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!("Model API error ({}): {}", status, error_text)).into());
        }

        let res_json: Value = res.json().await?;
        response_text(&res_json)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Concatenated text blocks of a Messages API response.
fn response_text(body: &Value) -> Result<String> {
    if let Some(err) = body.get("error") {
        let message = err["message"].as_str().unwrap_or("unknown error");
        return Err(AppError::Gateway(format!("Model API error: {}", message)).into());
    }

    let blocks = body["content"]
        .as_array()
        .ok_or_else(|| AppError::Gateway("No content in model response".to_string()))?;
    let texts: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"].as_str() == Some("text"))
        .filter_map(|b| b["text"].as_str())
        .collect();

    if texts.is_empty() {
        return Err(AppError::Gateway("No text block in model response".to_string()).into());
    }
    Ok(texts.join(""))
}
