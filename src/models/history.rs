//! The set of links already sent in earlier runs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Append-only set of previously delivered links.
///
/// There is deliberately no `remove`: once a link has been recorded it stays
/// recorded for every later run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    links: HashSet<String>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a link has already been sent.
    pub fn contains(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// Record a link. Returns `true` if it was not present before.
    pub fn insert(&mut self, link: impl Into<String>) -> bool {
        self.links.insert(link.into())
    }

    /// Number of recorded links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Links in lexical order.
    ///
    /// Used for serialization so that equal sets always produce equal bytes.
    pub fn sorted(&self) -> Vec<&str> {
        let mut links: Vec<&str> = self.links.iter().map(String::as_str).collect();
        links.sort_unstable();
        links
    }

    /// Encode as a pretty-printed JSON array of strings.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.sorted())
    }
}

impl<S: Into<String>> FromIterator<S> for History {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut history = History::new();
        assert!(history.insert("http://a.com"));
        assert!(!history.insert("http://a.com"));
        assert_eq!(history.len(), 1);
        assert!(history.contains("http://a.com"));
    }

    #[test]
    fn test_json_is_sorted_array() {
        let history: History = ["http://b.com", "http://a.com"].into_iter().collect();
        let bytes = history.to_json_bytes().unwrap();
        let decoded: Vec<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, vec!["http://a.com", "http://b.com"]);
    }

    #[test]
    fn test_deserialize_from_plain_array() {
        let history: History = serde_json::from_str(r#"["x", "y", "x"]"#).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.contains("y"));
    }
}
