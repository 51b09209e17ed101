//! Configuration management for the web search proxy.
//!
//! Configuration can be set via environment variables:
//! - `GRAVIXLAYER_API_KEY` - Preferred. API key for the inference endpoint.
//! - `OPENAI_API_KEY` - Fallback API key, used only when the preferred one is unset.
//! - `INFERENCE_BASE_URL` - Optional. Chat completions base URL. Defaults to the Gravix Layer inference API.
//! - `DEFAULT_MODEL` - Optional. Model used by the chat helper. Defaults to `llama3.1:8b`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8000`.
//! - `FORCED_SEARCH_MODE` - Optional. `synthesize` (default) or `model`.
//! - `LLM_TIMEOUT_SECS` - Optional. Upstream model request timeout. Defaults to `120`.
//! - `SEARCH_TIMEOUT_SECS` - Optional. Per-strategy search timeout. Defaults to `10`.
//! - `DUCKDUCKGO_HTML_URL`, `WIKIPEDIA_API_URL`, `DUCKDUCKGO_API_URL` - Optional search endpoints.
//!
//! A missing API key does not fail configuration loading. It surfaces when the
//! provider client is built (see [`crate::llm::OpenAiCompatClient::from_config`]).

use std::str::FromStr;

use thiserror::Error;

/// Environment variables consulted for the inference credential, in order.
pub const API_KEY_VARS: [&str; 2] = ["GRAVIXLAYER_API_KEY", "OPENAI_API_KEY"];

pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api.gravixlayer.com/v1/inference";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.1:8b";

pub const DEFAULT_DUCKDUCKGO_HTML_URL: &str = "https://html.duckduckgo.com/html/";
pub const DEFAULT_WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_DUCKDUCKGO_API_URL: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing API key. Set GRAVIXLAYER_API_KEY (preferred) or OPENAI_API_KEY.")]
    MissingApiKey,

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// How a request that forces the `web_search` tool is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForcedSearchMode {
    /// Record a synthetic tool call/result in the history and answer with the
    /// snippet synthesizer. Never calls the model.
    #[default]
    Synthesize,
    /// Hand the raw results to the model as system context and let it write
    /// the answer.
    Model,
}

impl FromStr for ForcedSearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "synthesize" | "synthesis" | "history" => Ok(Self::Synthesize),
            "model" | "llm" => Ok(Self::Model),
            other => Err(format!("expected `synthesize` or `model`, got: {}", other)),
        }
    }
}

/// Search adapter configuration.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// DuckDuckGo HTML results page (scraped)
    pub duckduckgo_html_url: String,

    /// MediaWiki API endpoint used for OpenSearch lookups
    pub wikipedia_api_url: String,

    /// DuckDuckGo Instant Answer API
    pub duckduckgo_api_url: String,

    /// Timeout applied to each strategy's HTTP request
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            duckduckgo_html_url: DEFAULT_DUCKDUCKGO_HTML_URL.to_string(),
            wikipedia_api_url: DEFAULT_WIKIPEDIA_API_URL.to_string(),
            duckduckgo_api_url: DEFAULT_DUCKDUCKGO_API_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

/// Proxy configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inference API key (None = not configured)
    pub api_key: Option<String>,

    /// Base URL of the chat completions endpoint
    pub inference_base_url: String,

    /// Model used by the standalone chat helper
    pub default_model: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Forced `web_search` answering strategy
    pub forced_search_mode: ForcedSearchMode,

    /// Upstream model request timeout in seconds
    pub llm_timeout_secs: u64,

    /// Search adapter configuration
    pub search: SearchConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric or enum variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = resolve_api_key(|name| std::env::var(name).ok());

        let inference_base_url = std::env::var("INFERENCE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_INFERENCE_BASE_URL.to_string());

        let default_model =
            std::env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = parse_var("PORT", 8000u16)?;

        let forced_search_mode = std::env::var("FORCED_SEARCH_MODE")
            .ok()
            .map(|v| {
                v.parse::<ForcedSearchMode>()
                    .map_err(|e| ConfigError::InvalidValue("FORCED_SEARCH_MODE".to_string(), e))
            })
            .transpose()?
            .unwrap_or_default();

        let llm_timeout_secs = parse_var("LLM_TIMEOUT_SECS", 120u64)?;

        let defaults = SearchConfig::default();
        let search = SearchConfig {
            duckduckgo_html_url: std::env::var("DUCKDUCKGO_HTML_URL")
                .unwrap_or(defaults.duckduckgo_html_url),
            wikipedia_api_url: std::env::var("WIKIPEDIA_API_URL")
                .unwrap_or(defaults.wikipedia_api_url),
            duckduckgo_api_url: std::env::var("DUCKDUCKGO_API_URL")
                .unwrap_or(defaults.duckduckgo_api_url),
            timeout_secs: parse_var("SEARCH_TIMEOUT_SECS", defaults.timeout_secs)?,
        };

        Ok(Self {
            api_key,
            inference_base_url,
            default_model,
            host,
            port,
            forced_search_mode,
            llm_timeout_secs,
            search,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: Option<String>, inference_base_url: String) -> Self {
        Self {
            api_key,
            inference_base_url,
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            forced_search_mode: ForcedSearchMode::default(),
            llm_timeout_secs: 120,
            search: SearchConfig::default(),
        }
    }
}

/// Resolve the inference credential: the first non-empty variable in
/// [`API_KEY_VARS`] order wins.
pub fn resolve_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn api_key_prefers_gravixlayer() {
        let vars = env(&[("GRAVIXLAYER_API_KEY", "gx"), ("OPENAI_API_KEY", "oa")]);
        assert_eq!(
            resolve_api_key(|k| vars.get(k).cloned()),
            Some("gx".to_string())
        );
    }

    #[test]
    fn api_key_falls_back_to_openai() {
        let vars = env(&[("OPENAI_API_KEY", "oa")]);
        assert_eq!(
            resolve_api_key(|k| vars.get(k).cloned()),
            Some("oa".to_string())
        );
    }

    #[test]
    fn empty_api_key_is_treated_as_missing() {
        let vars = env(&[("GRAVIXLAYER_API_KEY", "  "), ("OPENAI_API_KEY", "oa")]);
        assert_eq!(
            resolve_api_key(|k| vars.get(k).cloned()),
            Some("oa".to_string())
        );

        let none = env(&[]);
        assert_eq!(resolve_api_key(|k| none.get(k).cloned()), None);
    }

    #[test]
    fn forced_search_mode_parses() {
        assert_eq!(
            "synthesize".parse::<ForcedSearchMode>(),
            Ok(ForcedSearchMode::Synthesize)
        );
        assert_eq!(" MODEL ".parse::<ForcedSearchMode>(), Ok(ForcedSearchMode::Model));
        assert!("stream".parse::<ForcedSearchMode>().is_err());
    }

    #[test]
    fn missing_api_key_message_names_both_variables() {
        let msg = ConfigError::MissingApiKey.to_string();
        assert!(msg.contains("GRAVIXLAYER_API_KEY"));
        assert!(msg.contains("OPENAI_API_KEY"));
    }
}
