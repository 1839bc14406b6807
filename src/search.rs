//! FAQ keyword search
//!
//! Scores a fixed, in-memory FAQ set by term overlap. No I/O happens per
//! query; the document set is loaded once at startup.
//!
//! # Scoring
//!
//! For every query term (lowercased, split on single spaces):
//!
//! | where the term occurs              | points |
//! |------------------------------------|--------|
//! | anywhere in the title              | +3     |
//! | as a whole space-separated title word | +2  |
//! | anywhere in the body               | +1     |
//! | as a whole space-separated body word  | +1  |

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// FAQ set compiled into the binary
pub const BUILTIN_FAQS: &str = include_str!("../data/faqs.json");

/// Message returned alongside an empty result list
pub const NO_MATCHES_MESSAGE: &str = "No matches found for your search query";

/// Most results returned for one query
pub const MAX_RESULTS: usize = 3;

/// Characters of body text quoted per match in the summary
pub const SNIPPET_CHARS: usize = 60;

const SUMMARY_PREFIX: &str = "Based on your search, here are the key findings: ";
const SUMMARY_JOINER: &str = " Additionally, ";

/// Rejected search requests. `Display` is the wire message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    /// Body was not JSON
    #[error("Invalid request body")]
    InvalidBody,

    /// `query` missing, not a string, or blank
    #[error("Query parameter is required and cannot be empty")]
    EmptyQuery,
}

/// One searchable FAQ entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqDocument {
    /// Stable identifier, reported in `sources`
    pub id: String,
    /// Question / heading
    pub title: String,
    /// Answer text
    pub body: String,
}

/// Response body of a successful search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchOutcome {
    /// At least one document scored above zero
    Matches {
        /// Best documents, highest score first
        results: Vec<FaqDocument>,
        /// Generated digest of the matches
        summary: String,
        /// Ids of `results`, same order
        sources: Vec<String>,
    },
    /// Nothing scored above zero
    NoMatches {
        /// Always empty
        results: Vec<FaqDocument>,
        /// [`NO_MATCHES_MESSAGE`]
        message: String,
    },
}

impl SearchOutcome {
    /// Documents in the outcome
    pub fn results(&self) -> &[FaqDocument] {
        match self {
            SearchOutcome::Matches { results, .. } | SearchOutcome::NoMatches { results, .. } => {
                results
            }
        }
    }
}

/// Split a query into lowercase terms
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(' ')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score `document` against pre-lowercased `terms`
pub fn score_document(document: &FaqDocument, terms: &[String]) -> u32 {
    let title = document.title.to_lowercase();
    let body = document.body.to_lowercase();
    let title_words: Vec<&str> = title.split(' ').collect();
    let body_words: Vec<&str> = body.split(' ').collect();

    terms.iter().fold(0, |mut score, term| {
        if title.contains(term.as_str()) {
            score += 3;
            if title_words.contains(&term.as_str()) {
                score += 2;
            }
        }
        if body.contains(term.as_str()) {
            score += 1;
            if body_words.contains(&term.as_str()) {
                score += 1;
            }
        }
        score
    })
}

fn snippet(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// In-memory FAQ index
#[derive(Debug, Clone)]
pub struct SearchIndex {
    documents: Vec<FaqDocument>,
}

impl SearchIndex {
    /// Index an explicit document list
    pub fn new(documents: Vec<FaqDocument>) -> Self {
        Self { documents }
    }

    /// Parse a JSON array of documents
    pub fn from_json(json: &str) -> Result<Self> {
        let documents: Vec<FaqDocument> = serde_json::from_str(json)?;
        Ok(Self::new(documents))
    }

    /// Load a JSON array of documents from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let index = Self::from_json(&json)?;
        info!("Loaded {} FAQ documents from {}", index.len(), path.display());
        Ok(index)
    }

    /// The FAQ set compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_FAQS)
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Indexed documents in their original order
    pub fn documents(&self) -> &[FaqDocument] {
        &self.documents
    }

    /// Run `query` against the index
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> std::result::Result<SearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let terms = query_terms(query);

        let mut scored: Vec<(&FaqDocument, u32)> = self
            .documents
            .iter()
            .map(|doc| (doc, score_document(doc, &terms)))
            .filter(|(_, score)| *score > 0)
            .collect();
        // Stable: equal scores keep document order.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(MAX_RESULTS);

        debug!("{} documents matched {:?}", scored.len(), terms);

        if scored.is_empty() {
            return Ok(SearchOutcome::NoMatches {
                results: Vec::new(),
                message: NO_MATCHES_MESSAGE.to_string(),
            });
        }

        let summary = format!(
            "{}{}",
            SUMMARY_PREFIX,
            scored
                .iter()
                .map(|(doc, _)| snippet(&doc.body))
                .collect::<Vec<_>>()
                .join(SUMMARY_JOINER)
        );
        let sources = scored.iter().map(|(doc, _)| doc.id.clone()).collect();
        let results = scored.into_iter().map(|(doc, _)| doc.clone()).collect();

        Ok(SearchOutcome::Matches {
            results,
            summary,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(id: &str, title: &str, body: &str) -> FaqDocument {
        FaqDocument {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("Trust  Badges "), vec!["trust", "badges"]);
        assert!(query_terms("   ").is_empty());
    }

    #[test]
    fn test_score_title_whole_word() {
        let d = doc("1", "Why Trust Badges Matter", "Nothing here");
        assert_eq!(score_document(&d, &query_terms("trust badges")), 10);
    }

    #[test]
    fn test_score_substring_only() {
        // "trust" inside "trustworthy": contained but not a whole word.
        let d = doc("1", "Trustworthy shops", "Be trustworthy");
        assert_eq!(score_document(&d, &query_terms("trust")), 3 + 1);
    }

    #[test]
    fn test_score_body_whole_word() {
        let d = doc("1", "Other", "build trust with buyers");
        assert_eq!(score_document(&d, &query_terms("trust")), 2);
    }

    #[test]
    fn test_title_match_outranks_body_match() {
        let index = SearchIndex::new(vec![
            doc("body", "Shipping", "We earn trust every day"),
            doc("title", "Why Trust Badges Matter", "Badges on checkout"),
        ]);

        let outcome = index.search("trust badges").unwrap();
        let ids: Vec<_> = outcome.results().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["title", "body"]);
    }

    #[test]
    fn test_no_matches_message() {
        let index = SearchIndex::builtin().unwrap();
        let outcome = index.search("zzzqqq").unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::NoMatches {
                results: vec![],
                message: NO_MATCHES_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_blank_query_rejected() {
        let index = SearchIndex::builtin().unwrap();
        assert_eq!(index.search(""), Err(SearchError::EmptyQuery));
        assert_eq!(index.search("  \t "), Err(SearchError::EmptyQuery));
    }

    #[test]
    fn test_results_capped_and_ties_stable() {
        let index = SearchIndex::new(
            (0..5)
                .map(|i| doc(&format!("d{i}"), "Same title", "shared body"))
                .collect(),
        );

        match index.search("shared").unwrap() {
            SearchOutcome::Matches { results, sources, .. } => {
                assert_eq!(results.len(), MAX_RESULTS);
                assert_eq!(sources, vec!["d0", "d1", "d2"]);
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn test_summary_truncates_snippets() {
        let long_body = "x".repeat(80);
        let index = SearchIndex::new(vec![
            doc("a", "Alpha topic", &long_body),
            doc("b", "Alpha short", "short body"),
        ]);

        match index.search("alpha").unwrap() {
            SearchOutcome::Matches { summary, sources, .. } => {
                assert_eq!(
                    summary,
                    format!(
                        "Based on your search, here are the key findings: {}... Additionally, short body",
                        "x".repeat(60)
                    )
                );
                assert_eq!(sources, vec!["a", "b"]);
            }
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn test_snippet_exactly_sixty_chars_has_no_ellipsis() {
        assert_eq!(snippet(&"y".repeat(60)), "y".repeat(60));
    }

    #[test]
    fn test_builtin_faqs_load() {
        let index = SearchIndex::builtin().unwrap();
        assert!(!index.is_empty());
        assert!(index
            .documents()
            .iter()
            .any(|d| d.title == "Why Trust Badges Matter"));
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = SearchOutcome::NoMatches {
            results: vec![],
            message: NO_MATCHES_MESSAGE.to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"results": [], "message": NO_MATCHES_MESSAGE})
        );
    }
}
