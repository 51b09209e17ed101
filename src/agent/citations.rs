//! Best-effort citation extraction from free-form model text.
//!
//! Three pattern classes are applied in order: markdown citations
//! `[n](url)`, parenthesized URLs `(https://...)`, then bare URLs. Results
//! keep first-seen order without duplicates. This is a heuristic and can
//! both over- and under-extract.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_CITATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]\(([^)]+)\)").expect("valid regex"));

static PARENTHESIZED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((https?://[^)]+)\)").expect("valid regex"));

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(https?://[\w.\-]+(?:/[\w./\-?=&%]*)?)").expect("valid regex")
});

const SOURCES_MARKER: &str = "Sources:";

/// URLs cited in `text`, in first-seen order.
pub fn extract_citations(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    [&*MARKDOWN_CITATION, &*PARENTHESIZED_URL, &*BARE_URL]
        .iter()
        .flat_map(|re| re.captures_iter(text).filter_map(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Text before a literal `Sources:` marker, trimmed; unchanged when absent.
pub fn strip_sources_section(text: &str) -> String {
    match text.split_once(SOURCES_MARKER) {
        Some((answer, _)) => answer.trim().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_apply_in_order_with_dedup() {
        let text = "See https://bare.dev/x and (https://paren.dev/y). \
                    Sources: [1](https://md.dev/z), [2](https://bare.dev/x)";
        assert_eq!(
            extract_citations(text),
            vec![
                "https://md.dev/z",
                "https://bare.dev/x",
                "https://paren.dev/y",
            ]
        );
    }

    #[test]
    fn synthesized_answer_citations_are_result_urls() {
        let text = "Based on web search results for 'q', here is a synthesized answer:\n\n\
                    Alpha. [https://a.dev/page] Beta. [https://b.dev]\n\n\
                    Sources: [1](https://a.dev/page), [2](https://b.dev)";
        assert_eq!(extract_citations(text), vec!["https://a.dev/page", "https://b.dev"]);
    }

    #[test]
    fn no_urls_yields_empty() {
        assert!(extract_citations("nothing to cite here").is_empty());
    }

    #[test]
    fn strips_at_sources_marker() {
        assert_eq!(
            strip_sources_section("Answer text.\n\nSources: [1](https://a.dev)"),
            "Answer text."
        );
        assert_eq!(strip_sources_section("  no marker  "), "  no marker  ");
    }
}
