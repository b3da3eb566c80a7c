//! Search result data structures.

use serde::{Deserialize, Serialize};

/// Title shown when the provider omits one.
pub const NO_TITLE: &str = "No title";

/// Snippet shown when the provider omits one.
pub const NO_SNIPPET: &str = "No description available";

/// One entry returned by the search provider.
///
/// Only `link` carries identity. `title` and `snippet` are display-only and
/// come from an untrusted source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateResult {
    /// Result title
    pub title: String,

    /// Full URL of the posting
    pub link: String,

    /// Short description from the search engine
    pub snippet: String,
}

/// Results for one query, in display order.
pub type ResultBatch = Vec<CandidateResult>;

impl CandidateResult {
    /// Build a result, substituting placeholders for missing display fields.
    pub fn new(link: impl Into<String>, title: Option<String>, snippet: Option<String>) -> Self {
        Self {
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| NO_TITLE.to_string()),
            link: link.into(),
            snippet: snippet
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NO_SNIPPET.to_string()),
        }
    }
}
