use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use relay_core::config::LlmConfig;
use relay_tool_runtime::{LlmError, Message, ModelEndpoint, ModelResponse, ToolDescriptor};

use super::translate::{messages_to_claude, parse_response, tool_descriptor_to_claude};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude (Anthropic) model endpoint over the non-streaming Messages API.
///
/// Every call sends the whole conversation plus the tool catalog and waits
/// for the complete response. The token ceiling is fixed per endpoint.
pub struct ClaudeEndpoint {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeEndpoint {
    pub fn new(api_key: String, model: String, base_url: String, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
        }
    }

    /// Build from config. Fails with `NotConfigured` when no API key is set.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .anthropic_api_key
            .clone()
            .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
        Ok(Self::new(
            api_key,
            config.anthropic_model.clone(),
            config.anthropic_base_url.clone(),
            config.max_tokens,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn request_body(&self, messages: &[Message], tools: &[ToolDescriptor]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages_to_claude(messages),
            "max_tokens": self.max_tokens,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_descriptor_to_claude).collect());
        }
        body
    }
}

#[async_trait]
impl ModelEndpoint for ClaudeEndpoint {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<ModelResponse, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.request_body(messages, tools);

        debug!(
            model = %self.model,
            url = %url,
            messages = messages.len(),
            tools = tools.len(),
            "Claude request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();

        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();

            if status == 401 {
                return Err(LlmError::AuthError);
            }
            if status == 429 {
                let retry_after = serde_json::from_str::<Value>(&body_text)
                    .ok()
                    .and_then(|v| v["error"]["retry_after_secs"].as_u64())
                    .unwrap_or(30);
                return Err(LlmError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }
            return Err(LlmError::ApiError {
                status,
                message: body_text,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parse_response(&body)
    }

    fn provider_name(&self) -> &str {
        "claude"
    }
}
