//! HTTP client with retries.

use std::time::Duration;

use contta_shared::config::AiConfig;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::AiError;
use crate::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ResponseFormat, strip_code_fences,
};

/// Connection settings of an [`AiGateway`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Base URL without the `/v1/...` suffix.
    pub base_url: String,
    /// Bearer key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// First backoff delay, doubled on each retry.
    pub initial_backoff: Duration,
}

impl From<&AiConfig> for GatewaySettings {
    fn from(config: &AiConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

impl GatewaySettings {
    /// Delay before retry number `attempt` (0-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(1_u32 << attempt.min(16))
    }
}

/// OpenAI-compatible chat completion client.
#[derive(Debug, Clone)]
pub struct AiGateway {
    http: Client,
    settings: GatewaySettings,
}

impl AiGateway {
    /// Builds a gateway client.
    pub fn new(settings: GatewaySettings) -> Result<Self, AiError> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AiError::Config(e.to_string()))?;
        Ok(Self { http, settings })
    }

    /// Builds a gateway client from the `ai` config section.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        Self::new(GatewaySettings::from(config))
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url)
    }

    async fn send_once(&self, messages: &[ChatMessage], json: bool) -> Result<String, AiError> {
        let request = ChatCompletionRequest {
            model: &self.settings.model,
            messages,
            response_format: json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::InvalidResponse("empty completion".to_string()))
    }

    async fn send(&self, messages: &[ChatMessage], json: bool) -> Result<String, AiError> {
        let mut attempt = 0;
        loop {
            match self.send_once(messages, json).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    let delay = self.settings.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "AI gateway call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends a chat completion and returns the reply text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiError> {
        self.send(messages, false).await
    }

    /// Sends a chat completion in JSON mode and parses the reply.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        messages: &[ChatMessage],
    ) -> Result<T, AiError> {
        let content = self.send(messages, true).await?;
        let body = strip_code_fences(&content);
        debug!(reply = %body, "AI gateway reply");
        serde_json::from_str(body).map_err(|e| AiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let settings = GatewaySettings::from(&AiConfig::default());
        assert_eq!(settings.backoff(0), Duration::from_millis(500));
        assert_eq!(settings.backoff(1), Duration::from_millis(1000));
        assert_eq!(settings.backoff(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_settings_from_config() {
        let config = AiConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..AiConfig::default()
        };
        let gateway = AiGateway::from_config(&config).unwrap();
        assert_eq!(gateway.endpoint(), "http://localhost:9000/v1/chat/completions");
        assert_eq!(gateway.settings().model, "google/gemini-2.5-flash");
    }
}
