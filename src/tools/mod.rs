//! Tool definitions and the registry of server-executed tools.
//!
//! The server executes exactly one tool itself (`web_search`). Callers may
//! declare their own tools; [`merge_tools`] combines both sets before they are
//! offered to the model.

mod web;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use web::{ArgsError, WebSearch, WebSearchArgs, DEFAULT_TOP_K, MAX_TOP_K, WEB_SEARCH_TOOL};

/// A tool the server knows how to describe to the model.
pub trait Tool: Send + Sync {
    /// Unique name of the tool.
    fn name(&self) -> &str;

    /// Human-readable description for the model.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A function tool as exchanged with OpenAI-compatible endpoints:
/// `{"type": "function", "function": {"name", "description", "parameters"}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Serialize, Deserialize)]
struct WireTool {
    #[serde(rename = "type", default = "function_type")]
    tool_type: String,
    #[serde(default)]
    function: Option<WireFunction>,
}

#[derive(Serialize, Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
}

fn function_type() -> String {
    "function".to_string()
}

impl ToolDefinition {
    /// Read a caller-declared tool. Entries without a function name yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let wire: WireTool = serde_json::from_value(value.clone()).ok()?;
        let function = wire.function?;
        let name = function.name.filter(|n| !n.trim().is_empty())?;
        Some(Self {
            name,
            description: function.description.unwrap_or_default(),
            parameters: function
                .parameters
                .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
        })
    }
}

impl Serialize for ToolDefinition {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireTool {
            tool_type: function_type(),
            function: Some(WireFunction {
                name: Some(self.name.clone()),
                description: Some(self.description.clone()),
                parameters: Some(self.parameters.clone()),
            }),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ToolDefinition {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("tool definition is missing function.name"))
    }
}

/// Merge caller-declared tools with the server's built-ins.
///
/// Caller tools come first in their original order and win on name
/// collisions; built-ins follow in declaration order if their name is unused.
pub fn merge_tools(caller: &[ToolDefinition], builtins: &[ToolDefinition]) -> Vec<ToolDefinition> {
    let mut seen = HashSet::new();
    caller
        .iter()
        .chain(builtins.iter())
        .filter(|tool| !tool.name.is_empty() && seen.insert(tool.name.clone()))
        .cloned()
        .collect()
}

/// Registry of server-provided tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with the built-in `web_search` tool.
    pub fn new() -> Self {
        Self {
            tools: vec![Box::new(WebSearch)],
        }
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Caller tools merged with the built-ins.
    pub fn merged_with(&self, caller: &[ToolDefinition]) -> Vec<ToolDefinition> {
        merge_tools(caller, &self.list_tools())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    fn names(tools: &[ToolDefinition]) -> Vec<&str> {
        tools.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn caller_definition_wins_on_collision() {
        let caller = vec![tool("calc", "caller calc"), tool("web_search", "caller search")];
        let builtins = vec![tool("web_search", "builtin search"), tool("clock", "builtin clock")];

        let merged = merge_tools(&caller, &builtins);

        assert_eq!(names(&merged), vec!["calc", "web_search", "clock"]);
        assert_eq!(merged[1].description, "caller search");
    }

    #[test]
    fn each_name_appears_once() {
        let caller = vec![tool("a", "1"), tool("a", "2"), tool("b", "3")];
        let builtins = vec![tool("b", "4"), tool("c", "5"), tool("c", "6")];

        let merged = merge_tools(&caller, &builtins);

        assert_eq!(names(&merged), vec!["a", "b", "c"]);
        assert_eq!(merged[0].description, "1");
        assert_eq!(merged[1].description, "3");
        assert_eq!(merged[2].description, "5");
    }

    #[test]
    fn empty_caller_yields_builtins() {
        let registry = ToolRegistry::new();
        let merged = registry.merged_with(&[]);
        assert_eq!(names(&merged), vec![WEB_SEARCH_TOOL]);
    }

    #[test]
    fn malformed_caller_tools_are_skipped() {
        let raw = vec![
            json!({"type": "function", "function": {"description": "no name"}}),
            json!({"type": "function"}),
            json!("not a tool"),
            json!({"type": "function", "function": {"name": "lookup"}}),
        ];
        let parsed: Vec<ToolDefinition> = raw.iter().filter_map(ToolDefinition::from_value).collect();
        assert_eq!(names(&parsed), vec!["lookup"]);
        assert_eq!(parsed[0].parameters["type"], "object");
    }

    #[test]
    fn definition_serializes_openai_shape() {
        let value = serde_json::to_value(WebSearch.definition()).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "web_search");
        assert_eq!(value["function"]["parameters"]["required"], json!(["query"]));
    }
}
