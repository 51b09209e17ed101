//! API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{ChatMessage, ToolChoice};
use crate::search::SearchResult;

/// OpenAI-compatible chat completion request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,

    pub messages: Vec<ChatMessage>,

    /// Caller tools, kept loose; entries without a function name are ignored.
    #[serde(default)]
    pub tools: Option<Vec<Value>>,

    #[serde(default)]
    pub tool_choice: Option<ToolChoice>,

    /// Absent or `null` means the server default.
    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub stream: Option<bool>,
}

/// Chat completion response with a single choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// `chatcmpl-<unix seconds>`
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    /// Always `stop`.
    pub finish_reason: String,
}

/// The assistant message of a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,

    /// URLs cited in `content`; only on the forced-search path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,

    /// Raw results behind `content`; only on the forced-search path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search_results: Option<Vec<SearchResult>>,
}

/// Error response matching OpenAI's format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}
