//! Agent module - the web-search orchestration logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Call the model with the caller's messages and the merged tool list
//! 2. If the model requests `web_search`, run it and feed the results back
//! 3. If it answers without tools, retry once with `web_search` forced
//! 4. Stop on a final answer, or synthesize from a direct search at the round cap
//!
//! When the upstream model is unavailable the raw search outcome is returned instead.

mod agent_loop;
mod citations;
mod prompt;
mod synthesis;

pub use agent_loop::{
    Agent, AgentRequest, Completion, LoopProfile, CHAT_HELPER_MAX_ROUNDS, DEFAULT_TEMPERATURE,
    PROXY_MAX_ROUNDS,
};
pub use citations::{extract_citations, strip_sources_section};
pub use prompt::{build_search_context_prompt, DEFAULT_CHAT_SYSTEM_PROMPT};
pub use synthesis::{cited_urls, no_results_message, synthesize};
