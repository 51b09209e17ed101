//! Wikipedia OpenSearch lookups, used as a broad fallback.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::Value;

use super::{SearchError, SearchResult, SearchStrategy};

pub struct WikipediaOpenSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl WikipediaOpenSearch {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl SearchStrategy for WikipediaOpenSearch {
    fn name(&self) -> &'static str {
        "wikipedia_opensearch"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, SearchError> {
        let limit = top_k.to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, "websearch-proxy/1.0")
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", limit.as_str()),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let text = resp.text().await?;
        let data: Value =
            serde_json::from_str(&text).map_err(|e| SearchError::Parse(e.to_string()))?;
        let mut results = parse_opensearch(&data)?;
        results.truncate(top_k);
        Ok(results)
    }
}

/// OpenSearch responses are `[query, [titles], [descriptions], [urls]]`.
pub fn parse_opensearch(data: &Value) -> Result<Vec<SearchResult>, SearchError> {
    let parts = data
        .as_array()
        .ok_or_else(|| SearchError::Parse("opensearch response is not an array".to_string()))?;

    let titles = column(parts, 1);
    let descriptions = column(parts, 2);
    let urls = column(parts, 3);

    Ok(titles
        .iter()
        .zip(descriptions.iter())
        .zip(urls.iter())
        .filter(|(_, url)| !url.is_empty())
        .map(|((title, description), url)| SearchResult {
            title: (if title.is_empty() { "Wikipedia" } else { *title }).to_string(),
            url: url.to_string(),
            snippet: description.to_string(),
        })
        .collect())
}

fn column(parts: &[Value], idx: usize) -> Vec<&str> {
    parts
        .get(idx)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|v| v.as_str().unwrap_or_default()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_parallel_columns() {
        let data = json!([
            "rust",
            ["Rust", "", "Rust Belt"],
            ["A language", "untitled", ""],
            [
                "https://en.wikipedia.org/wiki/Rust",
                "https://en.wikipedia.org/wiki/Untitled",
                "https://en.wikipedia.org/wiki/Rust_Belt"
            ]
        ]);

        let results = parse_opensearch(&data).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Rust");
        assert_eq!(results[1].title, "Wikipedia");
        assert_eq!(results[2].snippet, "");
    }

    #[test]
    fn entries_without_url_are_skipped() {
        let data = json!(["q", ["A", "B"], ["a", "b"], ["", "https://en.wikipedia.org/wiki/B"]]);
        let results = parse_opensearch(&data).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "B");
    }

    #[test]
    fn short_payload_is_empty_and_non_array_is_error() {
        assert!(parse_opensearch(&json!(["q"])).unwrap().is_empty());
        assert!(parse_opensearch(&json!({"error": "x"})).is_err());
    }
}
