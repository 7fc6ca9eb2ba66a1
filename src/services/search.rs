//! Text search via the MediaWiki search API.

use serde::Deserialize;
use tracing::{debug, instrument};

use super::fetch_json;
use crate::error::UpstreamError;

const PROVIDER: &str = "Search";

/// Results read aloud per query.
const MAX_SPOKEN_RESULTS: usize = 2;

pub const NO_RESULTS_MESSAGE: &str =
    "I couldn't find any information about that. Would you like to try a different search?";

#[derive(Debug, Default, Deserialize)]
struct MediaWikiResponse {
    #[serde(default)]
    query: Option<QueryBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryBlock {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHit {
    #[serde(default)]
    snippet: String,
}

/// Client for the search provider.
#[derive(Clone)]
pub struct SearchService {
    client: reqwest::Client,
    base_url: String,
}

impl SearchService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Search for `query` and return a spoken summary of the top results.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<String, UpstreamError> {
        let request = self.client.get(&self.base_url).query(&[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", query),
            ("format", "json"),
            ("utf8", ""),
        ]);

        let response: MediaWikiResponse = fetch_json(PROVIDER, request).await?;
        let snippets: Vec<&str> = response
            .query
            .as_ref()
            .map(|q| q.search.iter().map(|hit| hit.snippet.as_str()).collect())
            .unwrap_or_default();

        debug!(hits = snippets.len(), "Search results received");
        Ok(format_search_results(&snippets))
    }
}

/// Turn result snippets into one spoken paragraph.
///
/// Only the first two snippets are used. Markup is stripped after the
/// sentence is assembled.
pub fn format_search_results(snippets: &[&str]) -> String {
    if snippets.is_empty() {
        return NO_RESULTS_MESSAGE.to_string();
    }

    let mut spoken = String::from("Here's what I found: ");
    for (i, snippet) in snippets.iter().take(MAX_SPOKEN_RESULTS).enumerate() {
        if i == 0 {
            spoken.push_str(&format!("{snippet}. "));
        } else {
            spoken.push_str(&format!("I also found that {snippet}. "));
        }
    }

    strip_markup(&spoken)
}

/// Remove HTML tags and decode the entities MediaWiki puts in snippets.
///
/// An unterminated `<` is kept as literal text.
pub fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        let (before, tail) = rest.split_at(open);
        out.push_str(before);
        match tail.find('>') {
            Some(close) => rest = &tail[close + 1..],
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    decode_entities(&out)
}

fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, &str); 6] = [
        ("&quot;", "\""),
        ("&#039;", "'"),
        ("&#39;", "'"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        // Last, so "&amp;lt;" decodes to "&lt;" and not "<"
        ("&amp;", "&"),
    ];

    ENTITIES
        .iter()
        .fold(text.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_results_message() {
        assert_eq!(format_search_results(&[]), NO_RESULTS_MESSAGE);
    }

    #[test]
    fn test_single_result() {
        assert_eq!(
            format_search_results(&["Rust is a language"]),
            "Here's what I found: Rust is a language. "
        );
    }

    #[test]
    fn test_only_first_two_results_are_spoken() {
        let spoken = format_search_results(&["first", "second", "third"]);
        assert_eq!(
            spoken,
            "Here's what I found: first. I also found that second. "
        );
        assert!(!spoken.contains("third"));
    }

    #[test]
    fn test_searchmatch_spans_removed() {
        let spoken = format_search_results(&[
            r#"<span class="searchmatch">Rust</span> is a multi-paradigm language"#,
        ]);
        assert_eq!(
            spoken,
            "Here's what I found: Rust is a multi-paradigm language. "
        );
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        assert_eq!(
            strip_markup("the &quot;borrow checker&quot; &amp; friends"),
            "the \"borrow checker\" & friends"
        );
        assert_eq!(strip_markup("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_strip_markup_keeps_unterminated_angle() {
        assert_eq!(strip_markup("a < b"), "a < b");
        assert_eq!(strip_markup("<b>bold</b> and 1 < 2"), "bold and 1 < 2");
    }
}
