//! LLM module - chat completion types and the upstream model client.
//!
//! The orchestration loop talks to the model only through [`LlmClient`], so
//! tests can script replies and failures without a network.

mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::tools::ToolDefinition;

pub use openai::OpenAiCompatClient;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,

    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Assistant turn that records the tool calls it requested.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.unwrap_or_default()),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool result keyed to the call that produced it.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,

    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,

    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name and its JSON-encoded arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,

    /// Raw JSON string. Some providers send an object here; it is re-encoded.
    #[serde(default = "empty_arguments", deserialize_with = "deserialize_arguments")]
    pub arguments: String,
}

/// The `tool_choice` directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ToolChoice {
    /// `"auto"`, `"none"`, `"required"`, ...
    Mode(String),
    /// `{"type": "function", "function": {"name": ...}}`
    Function(NamedToolChoice),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedToolChoice {
    #[serde(rename = "type", default = "function_type")]
    pub choice_type: String,

    pub function: ChosenFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChosenFunction {
    pub name: String,

    /// Non-standard: arguments a caller may attach to a forced call.
    /// Accepted as a JSON string or an object, which is re-encoded.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_arguments",
        skip_serializing_if = "Option::is_none"
    )]
    pub arguments: Option<String>,
}

impl ToolChoice {
    pub fn auto() -> Self {
        Self::Mode("auto".to_string())
    }

    /// Force a call to the named function.
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(NamedToolChoice {
            choice_type: function_type(),
            function: ChosenFunction {
                name: name.into(),
                arguments: None,
            },
        })
    }

    /// The function this directive forces, if any.
    pub fn forced_function(&self) -> Option<&ChosenFunction> {
        match self {
            Self::Function(named) if named.choice_type == "function" => Some(&named.function),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::Mode(mode) if mode == "none")
    }
}

/// Request sent to the upstream model.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    pub temperature: f32,
}

/// The assistant reply of the first choice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Tool calls, treating `None` and an empty list alike.
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    #[error("upstream response contained no choices")]
    EmptyChoices,
}

/// A chat-completions capable model provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_completion(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError>;
}

fn function_type() -> String {
    "function".to_string()
}

fn empty_arguments() -> String {
    "{}".to_string()
}

/// Accept a string, `null`, or an array of content parts.
fn deserialize_content<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(parts)) => {
            let text = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(_) => part.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            Some(text)
        }
        Some(other) => Some(other.to_string()),
    })
}

fn deserialize_arguments<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => empty_arguments(),
        other => other.to_string(),
    })
}

fn deserialize_optional_arguments<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Content of the most recent user message, or `""` when there is none.
pub fn latest_user_query(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .and_then(|m| m.content.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_parts_are_flattened() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image_url", "image_url": {"url": "https://x"}},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.content.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn null_content_is_none() {
        let msg: ChatMessage =
            serde_json::from_value(json!({"role": "assistant", "content": null})).unwrap();
        assert_eq!(msg.content, None);

        let msg: ChatMessage = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert_eq!(msg.content, None);
    }

    #[test]
    fn object_arguments_are_reencoded() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "type": "function",
            "function": {"name": "web_search", "arguments": {"query": "rust"}}
        }))
        .unwrap();
        assert_eq!(call.function.arguments, r#"{"query":"rust"}"#);
    }

    #[test]
    fn tool_choice_variants() {
        let auto: ToolChoice = serde_json::from_value(json!("auto")).unwrap();
        assert_eq!(auto, ToolChoice::auto());
        assert!(auto.forced_function().is_none());

        let none: ToolChoice = serde_json::from_value(json!("none")).unwrap();
        assert!(none.is_none());

        let forced: ToolChoice = serde_json::from_value(json!({
            "type": "function",
            "function": {"name": "web_search"}
        }))
        .unwrap();
        assert_eq!(forced.forced_function().map(|f| f.name.as_str()), Some("web_search"));
        assert_eq!(
            serde_json::to_value(&forced).unwrap(),
            json!({"type": "function", "function": {"name": "web_search"}})
        );
    }

    #[test]
    fn forced_choice_accepts_object_arguments() {
        let choice: ToolChoice = serde_json::from_value(json!({
            "type": "function",
            "function": {"name": "web_search", "arguments": {"query": "x"}}
        }))
        .unwrap();
        let forced = choice.forced_function().unwrap();
        assert_eq!(forced.name, "web_search");
        let args: Value = serde_json::from_str(forced.arguments.as_deref().unwrap()).unwrap();
        assert_eq!(args, json!({"query": "x"}));

        let choice: ToolChoice = serde_json::from_value(json!({
            "type": "function",
            "function": {"name": "web_search", "arguments": null}
        }))
        .unwrap();
        assert_eq!(choice, ToolChoice::function("web_search"));
    }

    #[test]
    fn tool_message_serializes_openai_shape() {
        let msg = ChatMessage::tool_result("call_1", "web_search", "{}");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "tool",
                "content": "{}",
                "tool_call_id": "call_1",
                "name": "web_search"
            })
        );
    }

    #[test]
    fn latest_user_query_scans_from_end() {
        let messages = vec![
            ChatMessage::system("sys"),
            ChatMessage::user("first"),
            ChatMessage::assistant_tool_calls(None, vec![]),
            ChatMessage::user("second"),
            ChatMessage::tool_result("c", "web_search", "{}"),
        ];
        assert_eq!(latest_user_query(&messages), "second");
        assert_eq!(latest_user_query(&[ChatMessage::system("only")]), "");
    }
}
