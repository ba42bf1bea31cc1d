use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{Config, COMPLETION_SYSTEM_PROMPT, PROMPT_TEMPLATE};
use crate::llm::UpstreamError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.pointer("/error/message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }
    truncate_for_log(trimmed, 500)
}

pub fn fill_prompt_template(user_text: &str) -> String {
    PROMPT_TEMPLATE.replace("{user_message}", user_text)
}

pub fn extract_completion_text(response: &Value) -> Option<String> {
    let content = response
        .pointer("/choices/0/message/content")?
        .as_str()?
        .trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

pub fn extract_image_bytes(response: &Value) -> Option<Vec<u8>> {
    let parsed: ImageGenerationResponse = serde_json::from_value(response.clone()).ok()?;
    let encoded = parsed.data.into_iter().next()?.b64_json?;
    general_purpose::STANDARD.decode(encoded).ok()
}

/// HTTP client for the completion and image-generation endpoints. Owns its
/// reqwest client so tests and the relay never share transport state.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    completion_api_key: String,
    image_api_key: String,
    completion_model: String,
    completion_max_tokens: u32,
    completion_temperature: f32,
    image_model: String,
    image_size: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        OpenAiClient {
            http: Client::new(),
            completion_api_key: config.completion_api_key.clone(),
            image_api_key: config.image_api_key.clone(),
            completion_model: config.completion_model.clone(),
            completion_max_tokens: config.completion_max_tokens,
            completion_temperature: config.completion_temperature,
            image_model: config.image_model.clone(),
            image_size: config.image_size.clone(),
        }
    }

    async fn post_json(
        &self,
        path: &str,
        api_key: &str,
        timeout: Duration,
        payload: &Value,
    ) -> Result<Value, UpstreamError> {
        let response = self
            .http
            .post(format!("{OPENAI_BASE_URL}{path}"))
            .header("Authorization", format!("Bearer {api_key}"))
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|err| UpstreamError(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = summarize_error_body(&body);
            warn!("OpenAI API error on {path}: status={status}, detail={detail}");
            return Err(UpstreamError(format!(
                "request to {path} failed with status {status}: {detail}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| UpstreamError(err.to_string()))
    }

    pub async fn build_prompt(&self, user_text: &str) -> Result<String, UpstreamError> {
        let payload = json!({
            "model": self.completion_model,
            "messages": [
                { "role": "system", "content": COMPLETION_SYSTEM_PROMPT },
                { "role": "user", "content": fill_prompt_template(user_text) }
            ],
            "max_tokens": self.completion_max_tokens,
            "temperature": self.completion_temperature,
        });

        debug!(
            model = %self.completion_model,
            "Requesting prompt refinement for '{}'",
            truncate_for_log(user_text, 200)
        );
        let response = self
            .post_json(
                "/chat/completions",
                &self.completion_api_key,
                COMPLETION_TIMEOUT,
                &payload,
            )
            .await?;

        extract_completion_text(&response)
            .ok_or_else(|| UpstreamError("completion response had no content".to_string()))
    }

    pub async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, UpstreamError> {
        let payload = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": self.image_size,
            "response_format": "b64_json",
        });

        debug!(
            model = %self.image_model,
            "Requesting image for prompt '{}'",
            truncate_for_log(prompt, 200)
        );
        let response = self
            .post_json(
                "/images/generations",
                &self.image_api_key,
                IMAGE_TIMEOUT,
                &payload,
            )
            .await?;

        extract_image_bytes(&response)
            .ok_or_else(|| UpstreamError("image response had no image data".to_string()))
    }
}
