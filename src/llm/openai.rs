//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ChatResponse, CompletionRequest, LlmClient, LlmError, ToolCall};
use crate::config::{Config, ConfigError};

/// Client for any endpoint that speaks the `/chat/completions` protocol.
///
/// Holds one pooled `reqwest::Client`; clone it freely across requests.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    api_key: String,
    completions_url: String,
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ReplyMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

impl OpenAiCompatClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_key,
            completions_url: completions_url(base_url),
        })
    }

    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApiKey` when no credential is configured.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.api_key.clone().ok_or(ConfigError::MissingApiKey)?;
        Self::new(
            api_key,
            &config.inference_base_url,
            Duration::from_secs(config.llm_timeout_secs),
        )
        .map_err(|e| ConfigError::InvalidValue("http client".to_string(), e.to_string()))
    }

    pub fn completions_url(&self) -> &str {
        &self.completions_url
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat_completion(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError> {
        tracing::debug!(
            url = %self.completions_url,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Calling upstream model"
        );

        let resp = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        let text = resp.text().await?;
        let envelope: CompletionEnvelope =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;

        let choice = envelope
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyChoices)?;

        Ok(ChatResponse {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.filter(|calls| !calls.is_empty()),
            finish_reason: choice.finish_reason,
        })
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_joins_without_double_slash() {
        assert_eq!(
            completions_url("https://api.gravixlayer.com/v1/inference/"),
            "https://api.gravixlayer.com/v1/inference/chat/completions"
        );
        assert_eq!(
            completions_url("http://127.0.0.1:9000"),
            "http://127.0.0.1:9000/chat/completions"
        );
    }

    #[test]
    fn from_config_requires_api_key() {
        let config = Config::new(None, "http://localhost".to_string());
        assert!(matches!(
            OpenAiCompatClient::from_config(&config),
            Err(ConfigError::MissingApiKey)
        ));

        let config = Config::new(Some("k".to_string()), "http://localhost".to_string());
        let client = OpenAiCompatClient::from_config(&config).unwrap();
        assert_eq!(client.completions_url(), "http://localhost/chat/completions");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("hi", 5), "hi");
    }
}
