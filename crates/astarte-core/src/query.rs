//! Convenience builder for HTTP query parameters.
//!
//! Keys are owned so that parameters handed back by the server, such as the query string of
//! a continuation link, can be carried over verbatim.

use std::fmt::Display;
use url::Url;

/// Builder for assembling query parameter pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Create a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Collect the query pairs of `url`, in order.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        Self {
            pairs: url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        }
    }

    /// Replace every occurrence of `key` with a single pair.
    pub fn set<T>(&mut self, key: &str, value: T)
    where
        T: Display,
    {
        self.pairs.retain(|(existing, _)| existing != key);
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Return the first value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Borrow the collected pairs.
    #[must_use]
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}
