//! Prompt templates used by the orchestration loop.

use crate::search::SearchResult;

/// System prompt for the standalone chat helper.
pub const DEFAULT_CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant with web access via the `web_search` tool. \
When answering time-sensitive or factual questions, call `web_search`, \
synthesize results, and cite sources by URL.";

/// System context that hands raw search results to the model.
pub fn build_search_context_prompt(results: &[SearchResult]) -> String {
    let results_json = serde_json::to_string_pretty(results).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are a helpful assistant. Use ONLY the following web search results to answer the user's question. Cite URLs.\n\
         Web search results: {}",
        results_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_context_embeds_results() {
        let prompt = build_search_context_prompt(&[SearchResult {
            title: "Gravix".to_string(),
            url: "https://gravixlayer.com".to_string(),
            snippet: "Inference platform".to_string(),
        }]);
        assert!(prompt.starts_with("You are a helpful assistant. Use ONLY"));
        assert!(prompt.contains("\"url\": \"https://gravixlayer.com\""));
    }

    #[test]
    fn search_context_with_no_results() {
        assert!(build_search_context_prompt(&[]).ends_with("Web search results: []"));
    }
}
