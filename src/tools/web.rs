//! The built-in `web_search` tool: schema and argument parsing.

use serde_json::{json, Value};
use thiserror::Error;

use super::Tool;

pub const WEB_SEARCH_TOOL: &str = "web_search";

/// Results requested when the caller or model does not say.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound on results per search.
pub const MAX_TOP_K: usize = 10;

/// Search the web and return top results with title, url and snippet.
pub struct WebSearch;

impl Tool for WebSearch {
    fn name(&self) -> &str {
        WEB_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the web and return top results with title, url and snippet."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string."
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of results to return (1-10).",
                    "default": DEFAULT_TOP_K
                }
            },
            "required": ["query"]
        })
    }
}

#[derive(Debug, Error)]
pub enum ArgsError {
    #[error("arguments are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("arguments are not a JSON object")]
    NotAnObject,
}

/// Parsed `web_search` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSearchArgs {
    pub query: String,
    pub top_k: usize,
}

impl Default for WebSearchArgs {
    fn default() -> Self {
        Self {
            query: String::new(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl WebSearchArgs {
    /// Parse a JSON-encoded argument string. Blank input is `{}`.
    pub fn parse(raw: &str) -> Result<Self, ArgsError> {
        let raw = if raw.trim().is_empty() { "{}" } else { raw };
        let value: Value = serde_json::from_str(raw)?;
        let obj = value.as_object().ok_or(ArgsError::NotAnObject)?;

        let query = obj
            .get("query")
            .and_then(Value::as_str)
            .map(|q| q.trim().to_string())
            .unwrap_or_default();
        let top_k = obj
            .get("top_k")
            .and_then(value_as_count)
            .unwrap_or(DEFAULT_TOP_K)
            .clamp(1, MAX_TOP_K);

        Ok(Self { query, top_k })
    }

    /// Parse, substituting defaults (`query = ""`, `top_k = 5`) on any error.
    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, raw = %raw, "Malformed web_search arguments, using defaults");
            Self::default()
        })
    }

    /// Use `fallback` when no query was given.
    pub fn or_query(mut self, fallback: &str) -> Self {
        if self.query.is_empty() {
            self.query = fallback.to_string();
        }
        self
    }
}

fn value_as_count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
