//! URL builder
//!
//! Joins a base URL with percent-encoded path segments and renders query
//! parameters in sorted order with standard form encoding. Per-URL encoding
//! exceptions undo specific escapes a provider needs literally, such as
//! `%3D` → `=` inside base64 cursors.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use url::{form_urlencoded, Url};

/// Mutable URL under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    url: Url,
    query: BTreeMap<String, Vec<String>>,
    encoding_exceptions: Vec<(String, String)>,
}

impl UrlBuilder {
    /// Parse a URL; any query it already carries is kept
    pub fn new(raw: &str) -> Result<Self> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!("'{raw}' cannot be used as a base URL")));
        }

        let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, v) in url.query_pairs() {
            query.entry(k.into_owned()).or_default().push(v.into_owned());
        }
        url.set_query(None);

        Ok(Self {
            url,
            query,
            encoding_exceptions: Vec::new(),
        })
    }

    /// Append path segments, percent-encoding each one, `/` included.
    /// Empty segments are skipped; `.` and `..` are rejected.
    pub fn add_path<S: AsRef<str>>(mut self, segments: &[S]) -> Result<Self> {
        if let Some(dots) = segments
            .iter()
            .map(AsRef::as_ref)
            .find(|s| matches!(*s, "." | ".."))
        {
            return Err(Error::config(format!("invalid path segment '{dots}'")));
        }

        let raw = self.url.to_string();
        let mut path = self
            .url
            .path_segments_mut()
            .map_err(|()| Error::config(format!("'{raw}' cannot be used as a base URL")))?;
        path.pop_if_empty();
        path.extend(segments.iter().map(AsRef::as_ref).filter(|s| !s.is_empty()));
        drop(path);
        Ok(self)
    }

    /// Set a query parameter, replacing existing values
    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), vec![value.into()]);
        self
    }

    /// Set a repeated query parameter, replacing existing values
    #[must_use]
    pub fn with_query_param_list<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Set a query parameter only when the value is present
    #[must_use]
    pub fn with_optional_query_param(self, key: impl Into<String>, value: Option<String>) -> Self {
        match value {
            Some(v) => self.with_query_param(key, v),
            None => self,
        }
    }

    /// After encoding, replace `encoded` with `literal` in the query string
    #[must_use]
    pub fn with_encoding_exception(
        mut self,
        encoded: impl Into<String>,
        literal: impl Into<String>,
    ) -> Self {
        self.encoding_exceptions.push((encoded.into(), literal.into()));
        self
    }

    /// First value of a query parameter
    pub fn get_first_query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key)?.first().map(String::as_str)
    }

    /// Path component
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Encoded query string (without `?`)
    pub fn query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.query {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        let mut encoded = serializer.finish();
        for (from, to) in &self.encoding_exceptions {
            encoded = encoded.replace(from.as_str(), to);
        }
        encoded
    }
}

impl std::fmt::Display for UrlBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let query = self.query_string();
        if query.is_empty() {
            write!(f, "{}", self.url)
        } else {
            write!(f, "{}?{query}", self.url)
        }
    }
}
