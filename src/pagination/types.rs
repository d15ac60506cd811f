//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies, and the
//! JSON path helpers shared with record extraction.

use crate::error::{Error, Result};
use crate::types::value_to_string;
use serde_json::Value;

/// What a paginator sees of one page
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// URL the page was fetched from
    pub request_url: &'a str,
    /// Body of the request, for APIs that paginate in the body
    pub request_body: Option<&'a Value>,
    /// Response body
    pub body: &'a Value,
    /// Records found on the page, before any client-side filtering
    pub records_count: usize,
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Token for the next page; empty when there is none
    fn next_page(&self, page: &PageContext<'_>) -> Result<String>;
}

/// Stop conditions for pagination
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StopCondition {
    /// Stop when page is empty (no records)
    #[default]
    EmptyPage,

    /// Stop when a field has a specific value
    Field {
        /// Path to the field
        path: String,
        /// Value that means "last page"
        value: Value,
    },
}

impl StopCondition {
    /// Create a field-based stop condition
    pub fn field(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Whether this page is the last one
    pub fn should_stop(&self, body: &Value, records_count: usize) -> bool {
        match self {
            Self::EmptyPage => records_count == 0,
            Self::Field { path, value } => extract_path(body, path) == Some(value),
        }
    }
}

// ============================================================================
// JSON Paths
// ============================================================================

/// Resolve a dot path such as `$.metadata.paging.next_page` or `items.0.id`.
/// An empty path or `$` is the root.
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve a path to a scalar rendered as a string; null and empty are `None`
pub fn extract_string(value: &Value, path: &str) -> Option<String> {
    extract_path(value, path)
        .and_then(value_to_string)
        .filter(|s| !s.is_empty())
}

/// Collect the records addressed by a path.
///
/// Paths with wildcards or filters go through JSONPath; plain dot paths must
/// address an array (a single object counts as one record). `None` when the
/// path is absent or null.
pub fn extract_records(value: &Value, path: &str) -> Result<Option<Vec<Value>>> {
    if path.contains('*') || path.contains('[') {
        use jsonpath_rust::JsonPath;

        let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
            message: format!("Invalid JSONPath: {e}"),
        })?;

        return Ok(match jp.find(value) {
            Value::Array(arr) => Some(arr),
            Value::Null => None,
            other => Some(vec![other]),
        });
    }

    match extract_path(value, path) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(obj @ Value::Object(_)) => Ok(Some(vec![obj.clone()])),
        Some(other) => Err(Error::unmarshal(format!(
            "expected records at '{path}', found {other}"
        ))),
    }
}
