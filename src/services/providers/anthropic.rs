//! Anthropic Messages API backend
//!
//! Sends the prompt as a single user turn and returns the concatenated text
//! blocks of the reply. Status codes are classified here; the body is never
//! interpreted beyond extracting text.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::services::providers::{BackendError, ModelBackend};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const MAX_ERROR_BODY: usize = 300;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
        }
    }

    fn map_reqwest_error(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_connect() {
            BackendError::Transient {
                code: None,
                message: format!("connection failed: {}", e),
            }
        } else {
            BackendError::Permanent(e.to_string())
        }
    }

    fn extract_text(response: MessagesResponse) -> String {
        response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

fn truncate_error(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[async_trait::async_trait]
impl ModelBackend for AnthropicBackend {
    async fn complete(
        &self,
        prompt: &str,
        model_id: &str,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let request = MessagesRequest {
            model: model_id,
            max_tokens: MAX_TOKENS,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(Self::map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %truncate_error(&body),
                provider = self.name(),
                "Model API request failed"
            );
            return Err(BackendError::from_status(
                status.as_u16(),
                truncate_error(&body),
            ));
        }

        let body = response.text().await.map_err(Self::map_reqwest_error)?;
        let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|e| {
            BackendError::Permanent(format!("Failed to parse model API response: {}", e))
        })?;

        let text = Self::extract_text(parsed);
        tracing::debug!(
            model = %model_id,
            chars = text.len(),
            provider = self.name(),
            "Model response received"
        );

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
