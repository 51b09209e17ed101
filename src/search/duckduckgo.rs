//! DuckDuckGo strategies: HTML results page scraping and the Instant Answer API.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::USER_AGENT;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use super::{collapse_whitespace, normalize_snippet, truncate_chars, SearchError, SearchResult, SearchStrategy};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";
const API_USER_AGENT: &str = "websearch-proxy/1.0";

/// Leading bare domain such as `www.rust-lang.org` left over from the result's URL line.
static LEADING_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w.-]+\.[a-z]{2,})\s*").expect("valid regex"));

/// Scrapes `html.duckduckgo.com`. No API key needed.
pub struct DuckDuckGoHtml {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoHtml {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl SearchStrategy for DuckDuckGoHtml {
    fn name(&self) -> &'static str {
        "duckduckgo_html_scrape"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, SearchError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .form(&[("q", query)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let html = resp.text().await?;
        parse_results_page(&html, top_k)
    }
}

/// Extract title/url/snippet triples from a DuckDuckGo HTML results page.
pub fn parse_results_page(html: &str, top_k: usize) -> Result<Vec<SearchResult>, SearchError> {
    let doc = Html::parse_document(html);
    let anchor_sel =
        Selector::parse(".result__a").map_err(|e| SearchError::Parse(e.to_string()))?;

    let mut results = Vec::new();
    let mut seen_snippets = HashSet::new();

    for anchor in doc.select(&anchor_sel).take(50.max(top_k * 2)) {
        let title = element_text(&anchor);
        let raw_href = anchor.value().attr("href").unwrap_or_default().trim();
        let Some(url) = resolve_href(raw_href) else {
            continue;
        };

        let snippet = match result_body(&anchor) {
            Some(body) => clean_snippet(&element_text(&body), &title, &[raw_href, url.as_str()]),
            None => String::new(),
        };

        let norm = normalize_snippet(&snippet);
        if !norm.is_empty() && seen_snippets.insert(norm) {
            results.push(SearchResult {
                title,
                url,
                snippet,
            });
        }
        if results.len() >= top_k {
            break;
        }
    }

    Ok(results)
}

/// Nearest ancestor `div.result__body`.
fn result_body<'a>(anchor: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    anchor.ancestors().filter_map(ElementRef::wrap).find(|el| {
        el.value().name() == "div" && el.value().classes().any(|c| c == "result__body")
    })
}

fn element_text(el: &ElementRef) -> String {
    let pieces: Vec<&str> = el.text().map(str::trim).filter(|s| !s.is_empty()).collect();
    collapse_whitespace(&pieces.join(" "))
}

/// Strip the repeated title and URL, then any leading domain fragment.
fn clean_snippet(body_text: &str, title: &str, links: &[&str]) -> String {
    let mut snippet = collapse_whitespace(body_text);
    if !title.is_empty() {
        snippet = snippet.replace(title, "");
    }
    for link in links.iter().filter(|l| !l.is_empty()) {
        snippet = snippet.replace(link, "");
    }
    let snippet = LEADING_DOMAIN.replace(snippet.trim(), "");
    collapse_whitespace(&snippet)
}

/// Turn a result href into an absolute target URL.
///
/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn resolve_href(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };

    let url = Url::parse(&absolute).ok()?;
    let is_redirect = url
        .host_str()
        .is_some_and(|h| h == "duckduckgo.com" || h.ends_with(".duckduckgo.com"))
        && url.path().starts_with("/l/");
    if is_redirect {
        return url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty());
    }
    Some(url.to_string())
}

/// DuckDuckGo Instant Answer API: abstract plus related topics.
pub struct DuckDuckGoInstantAnswer {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoInstantAnswer {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl SearchStrategy for DuckDuckGoInstantAnswer {
    fn name(&self) -> &'static str {
        "duckduckgo_instant_answer"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, SearchError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, API_USER_AGENT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_redirect", "1"),
                ("no_html", "1"),
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
        let mut results = parse_instant_answer(&data);
        results.truncate(top_k);
        Ok(results)
    }
}

/// Flatten an Instant Answer payload into results.
pub fn parse_instant_answer(data: &Value) -> Vec<SearchResult> {
    let mut results = Vec::new();

    let abstract_text = data["AbstractText"].as_str().unwrap_or_default();
    let abstract_url = data["AbstractURL"].as_str().unwrap_or_default();
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        let source = data["AbstractSource"].as_str().filter(|s| !s.is_empty());
        results.push(SearchResult {
            title: source.unwrap_or("Result").to_string(),
            url: abstract_url.to_string(),
            snippet: abstract_text.to_string(),
        });
    }

    let related = data["RelatedTopics"].as_array().map(Vec::as_slice).unwrap_or_default();
    for item in related {
        if let Some(result) = topic_result(item) {
            results.push(result);
        } else if let Some(topics) = item["Topics"].as_array() {
            results.extend(topics.iter().filter_map(topic_result));
        }
    }

    results
}

fn topic_result(item: &Value) -> Option<SearchResult> {
    let url = item.get("FirstURL")?.as_str()?;
    let text = item.get("Text")?.as_str()?;
    Some(SearchResult {
        title: truncate_chars(text, 200),
        url: url.to_string(),
        snippet: truncate_chars(text, 500),
    })
}
