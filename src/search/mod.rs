//! Search provider adapter.
//!
//! [`FallbackSearch`] tries each [`SearchStrategy`] in order until one yields
//! results. It never fails: transport and parse errors are folded into
//! [`SearchOutcome::error`].

mod duckduckgo;
mod wikipedia;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SearchConfig;
use crate::tools::MAX_TOP_K;

pub use duckduckgo::{DuckDuckGoHtml, DuckDuckGoInstantAnswer};
pub use wikipedia::WikipediaOpenSearch;

/// A single search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Result of one search invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchOutcome {
    pub query: String,
    /// Strategy that produced `results` (or the last one attempted).
    pub provider: String,
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn empty(query: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            provider: provider.into(),
            results: Vec::new(),
            error: None,
        }
    }

    /// JSON payload handed to the model as a tool result.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"results\":[]}".to_string())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Anything the orchestration loop can search with.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> SearchOutcome;
}

/// One concrete way of producing results.
#[async_trait]
pub trait SearchStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, SearchError>;
}

/// Ordered chain of strategies.
pub struct FallbackSearch {
    strategies: Vec<Box<dyn SearchStrategy>>,
}

impl FallbackSearch {
    pub fn new(strategies: Vec<Box<dyn SearchStrategy>>) -> Self {
        Self { strategies }
    }

    /// HTML scrape, then Wikipedia OpenSearch, then the Instant Answer API.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self::new(vec![
            Box::new(DuckDuckGoHtml::new(client.clone(), &config.duckduckgo_html_url)),
            Box::new(WikipediaOpenSearch::new(client.clone(), &config.wikipedia_api_url)),
            Box::new(DuckDuckGoInstantAnswer::new(client, &config.duckduckgo_api_url)),
        ]))
    }
}

#[async_trait]
impl SearchBackend for FallbackSearch {
    async fn search(&self, query: &str, top_k: usize) -> SearchOutcome {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        let mut failures = Vec::new();
        let mut provider = "none";

        for strategy in &self.strategies {
            provider = strategy.name();
            match strategy.search(query, top_k).await {
                Ok(raw) => {
                    let results = dedup_results(raw, top_k);
                    tracing::debug!(provider, query, count = results.len(), "Search strategy finished");
                    if !results.is_empty() {
                        return SearchOutcome {
                            query: query.to_string(),
                            provider: provider.to_string(),
                            results,
                            error: None,
                        };
                    }
                }
                Err(e) => {
                    tracing::warn!(provider, query, error = %e, "Search strategy failed");
                    failures.push(format!("{}: {}", provider, e));
                }
            }
        }

        let mut outcome = SearchOutcome::empty(query, provider);
        if !failures.is_empty() {
            outcome.error = Some(failures.join("; "));
        }
        outcome
    }
}

/// Drop results without a URL or with a snippet already seen (case- and
/// whitespace-insensitive), then cap at `top_k`.
pub fn dedup_results(results: Vec<SearchResult>, top_k: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty())
        .filter(|r| {
            let norm = normalize_snippet(&r.snippet);
            norm.is_empty() || seen.insert(norm)
        })
        .take(top_k)
        .collect()
}

pub(crate) fn normalize_snippet(snippet: &str) -> String {
    collapse_whitespace(snippet).to_lowercase()
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn hit(url: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: "t".to_string(),
            url: url.to_string(),
            snippet: snippet.to_string(),
        }
    }

    enum Script {
        Results(Vec<SearchResult>),
        Fail(&'static str),
    }

    struct Scripted {
        name: &'static str,
        script: Script,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SearchStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Results(r) => Ok(r.clone()),
                Script::Fail(msg) => Err(SearchError::Parse(msg.to_string())),
            }
        }
    }

    fn scripted(name: &'static str, script: Script) -> (Box<dyn SearchStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                name,
                script,
                calls: calls.clone(),
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn first_non_empty_strategy_wins() {
        let (a, a_calls) = scripted("a", Script::Fail("boom"));
        let (b, b_calls) = scripted("b", Script::Results(vec![]));
        let (c, c_calls) = scripted("c", Script::Results(vec![hit("https://c.dev", "from c")]));
        let (d, d_calls) = scripted("d", Script::Results(vec![hit("https://d.dev", "from d")]));

        let outcome = FallbackSearch::new(vec![a, b, c, d]).search("q", 5).await;

        assert_eq!(outcome.provider, "c");
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.error, None);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 1);
        assert_eq!(d_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_failures_are_reported() {
        let (a, _) = scripted("a", Script::Fail("down"));
        let (b, _) = scripted("b", Script::Fail("bad json"));

        let outcome = FallbackSearch::new(vec![a, b]).search("q", 5).await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.provider, "b");
        assert_eq!(
            outcome.error.as_deref(),
            Some("a: unexpected response: down; b: unexpected response: bad json")
        );
    }

    #[tokio::test]
    async fn empty_results_without_failures_have_no_error() {
        let (a, _) = scripted("a", Script::Results(vec![]));
        let outcome = FallbackSearch::new(vec![a]).search("q", 5).await;
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.error, None);
    }

    #[tokio::test]
    async fn results_are_capped_at_top_k() {
        let many = (0..8)
            .map(|i| hit(&format!("https://x.dev/{i}"), &format!("snippet {i}")))
            .collect();
        let (a, _) = scripted("a", Script::Results(many));
        let outcome = FallbackSearch::new(vec![a]).search("q", 3).await;
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[2].url, "https://x.dev/2");
    }

    #[test]
    fn dedup_drops_repeated_snippets_and_empty_urls() {
        let results = vec![
            hit("https://a.dev", "Rust is fast"),
            hit("https://b.dev", "  rust   IS fast "),
            hit("", "no url"),
            hit("https://c.dev", "Different"),
        ];
        let out = dedup_results(results, 10);
        let urls: Vec<_> = out.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.dev", "https://c.dev"]);
    }

    #[test]
    fn outcome_json_omits_absent_error() {
        let json = SearchOutcome::empty("q", "p").to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"], serde_json::json!([]));
        assert!(value.get("error").is_none());
    }
}
