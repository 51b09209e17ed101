//! OpenAI-compatible chat completions endpoint.
//!
//! Receives `POST /v1/chat/completions`, runs the web-search orchestration
//! loop and answers with a single non-streaming completion. The caller
//! always gets a 200 once the body is accepted; upstream failures are
//! absorbed by the loop's degraded fallback.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;

use super::routes::AppState;
use super::types::{
    ChatCompletionRequest, ChatCompletionResponse, Choice, ErrorBody, ErrorResponse,
    ResponseMessage,
};
use crate::agent::{AgentRequest, Completion, DEFAULT_TEMPERATURE};
use crate::config::ConfigError;
use crate::tools::ToolDefinition;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

fn error_response(status: StatusCode, message: String, code: &str) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            message,
            r#type: "error".to_string(),
            code: Some(code.to_string()),
        },
    };
    (status, Json(body)).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Routes
// ─────────────────────────────────────────────────────────────────────────────

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat/completions", post(chat_completions))
}

// ─────────────────────────────────────────────────────────────────────────────
// POST /v1/chat/completions
// ─────────────────────────────────────────────────────────────────────────────

async fn chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    // 1. Parse loosely first so `stream: true` is rejected whatever else is wrong
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", e),
                "invalid_request_error",
            );
        }
    };

    if raw.get("stream").and_then(Value::as_bool) == Some(true) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Streaming is not supported by this proxy; send stream=false".to_string(),
            "unsupported_request",
        );
    }

    let req: ChatCompletionRequest = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", e),
                "invalid_request_error",
            );
        }
    };

    // 2. The agent only exists when an upstream credential was configured
    let Some(agent) = state.agent.as_ref() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ConfigError::MissingApiKey.to_string(),
            "configuration_error",
        );
    };

    let caller_tools: Vec<ToolDefinition> = req
        .tools
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(ToolDefinition::from_value)
        .collect();

    tracing::debug!(
        model = %req.model,
        messages = req.messages.len(),
        caller_tools = caller_tools.len(),
        "Chat completion request"
    );

    // 3. Orchestrate and shape the response
    let completion = agent
        .run(AgentRequest {
            model: req.model.clone(),
            messages: req.messages,
            tools: caller_tools,
            tool_choice: req.tool_choice,
            temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        })
        .await;

    Json(assemble_response(&req.model, completion)).into_response()
}

/// Shape a completion into the OpenAI response format.
pub fn assemble_response(model: &str, completion: Completion) -> ChatCompletionResponse {
    let created = chrono::Utc::now().timestamp();

    let message = match completion {
        Completion::ForcedSearch {
            content,
            sources,
            results,
        } => ResponseMessage {
            role: "assistant".to_string(),
            content,
            sources: Some(sources),
            web_search_results: Some(results),
        },
        other => ResponseMessage {
            role: "assistant".to_string(),
            content: other.content(),
            sources: None,
            web_search_results: None,
        },
    };

    ChatCompletionResponse {
        id: format!("chatcmpl-{}", created),
        object: "chat.completion".to_string(),
        created,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: "stop".to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchOutcome, SearchResult};

    #[test]
    fn model_answer_has_no_auxiliary_fields() {
        let resp = assemble_response("llama3.1:8b", Completion::ModelAnswer("hello".to_string()));

        assert!(resp.id.starts_with("chatcmpl-"));
        assert_eq!(resp.id, format!("chatcmpl-{}", resp.created));
        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.model, "llama3.1:8b");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].finish_reason, "stop");
        assert_eq!(resp.choices[0].message.content, "hello");
        assert!(resp.choices[0].message.sources.is_none());
        assert!(resp.choices[0].message.web_search_results.is_none());
    }

    #[test]
    fn forced_search_carries_sources_and_results() {
        let results = vec![SearchResult {
            title: "Gravix".to_string(),
            url: "https://gravixlayer.com/".to_string(),
            snippet: "Inference platform".to_string(),
        }];
        let resp = assemble_response(
            "m",
            Completion::ForcedSearch {
                content: "answer".to_string(),
                sources: vec!["https://gravixlayer.com/".to_string()],
                results: results.clone(),
            },
        );

        let message = &resp.choices[0].message;
        assert_eq!(message.sources.as_deref(), Some(&["https://gravixlayer.com/".to_string()][..]));
        assert_eq!(message.web_search_results.as_ref(), Some(&results));
    }

    #[test]
    fn degraded_content_is_raw_outcome_json() {
        let resp = assemble_response(
            "m",
            Completion::Degraded(SearchOutcome::empty("q", "duckduckgo_instant_answer")),
        );

        let content: Value = serde_json::from_str(&resp.choices[0].message.content).unwrap();
        assert_eq!(content["query"], "q");
        assert!(content["results"].as_array().unwrap().is_empty());
        assert_eq!(resp.choices[0].finish_reason, "stop");
    }
}
