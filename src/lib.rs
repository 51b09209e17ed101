//! # WebSearch Proxy
//!
//! An OpenAI-compatible chat completions proxy that gives any hosted model a
//! server-executed `web_search` tool.
//!
//! This library provides:
//! - An HTTP API speaking the `/v1/chat/completions` protocol
//! - A bounded tool loop that decides when to search and feeds results back
//! - A fallback chain of web search strategies (DuckDuckGo, Wikipedia)
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Receive a chat request via the API
//! 2. Merge the caller's tools with the built-in `web_search`
//! 3. Call the model, execute any `web_search` calls, feed results back
//! 4. Repeat until the model answers or the round cap is hit
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use websearch_proxy::{agent::Agent, config::Config, llm::OpenAiCompatClient};
//! use websearch_proxy::search::FallbackSearch;
//! use websearch_proxy::tools::ToolRegistry;
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(OpenAiCompatClient::from_config(&config)?);
//! let search = Arc::new(FallbackSearch::from_config(&config.search)?);
//! let agent = Agent::new(llm, search, Arc::new(ToolRegistry::new()));
//! let answer = agent.chat_with_websearch(&config.default_model, "Latest macOS release?", None).await;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod search;
pub mod tools;

pub use config::Config;
