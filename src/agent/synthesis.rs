//! Turn a search outcome into a cited answer without calling a model.

use std::collections::HashSet;

use crate::search::SearchOutcome;

/// The fixed reply used when a search produced nothing usable.
pub fn no_results_message(query: &str) -> String {
    format!(
        "I couldn't find results for: {}. Try refining the query or using more specific terms.",
        query
    )
}

/// Join every result that has both a snippet and a URL into one paragraph,
/// followed by a `Sources:` line of `[index](url)` citations.
///
/// Citation indexes are 1-based positions in `outcome.results`.
pub fn synthesize(query: &str, outcome: &SearchOutcome) -> String {
    let mut snippets = Vec::new();
    let mut citations = Vec::new();

    for (idx, snippet, url) in citable(outcome) {
        snippets.push(format!("{} [{}]", snippet, url));
        citations.push(format!("[{}]({})", idx + 1, url));
    }

    if snippets.is_empty() {
        return no_results_message(query);
    }

    format!(
        "Based on web search results for '{}', here is a synthesized answer:\n\n{}\n\nSources: {}",
        query,
        snippets.join(" "),
        citations.join(", ")
    )
}

/// URLs [`synthesize`] cites, in result order without duplicates.
pub fn cited_urls(outcome: &SearchOutcome) -> Vec<String> {
    let mut seen = HashSet::new();
    citable(outcome)
        .map(|(_, _, url)| url.to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Results with both a snippet and a URL, with their index in `outcome.results`.
fn citable(outcome: &SearchOutcome) -> impl Iterator<Item = (usize, &str, &str)> {
    outcome
        .results
        .iter()
        .enumerate()
        .map(|(idx, r)| (idx, r.snippet.trim(), r.url.trim()))
        .filter(|(_, snippet, url)| !snippet.is_empty() && !url.is_empty())
}
