//! Read response parsing
//!
//! A [`ReadParser`] turns one page of a provider response into a
//! [`ReadResult`]: locate the records, work out the next page token, project
//! each record to the requested fields and optionally drop records outside
//! the time window.

use super::types::{extract_path, extract_records, PageContext, Paginator};
use crate::connector::{ReadParams, ReadResult, ReadResultRow};
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::types::value_to_string;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// ============================================================================
// Record Location
// ============================================================================

/// Where the records of a page live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLocator {
    /// Required path; absence is a decoding error
    Path(String),
    /// Optional path; absence is an empty page
    OptionalPath(String),
    /// The body itself is the record array
    Root,
}

impl RecordLocator {
    /// Required records path
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Optional records path
    pub fn optional(path: impl Into<String>) -> Self {
        Self::OptionalPath(path.into())
    }

    /// Extract the records of one page
    pub fn locate(&self, body: &Value) -> Result<Vec<Value>> {
        match self {
            Self::Root => match body {
                Value::Array(items) => Ok(items.clone()),
                Value::Null => Ok(Vec::new()),
                other => Err(Error::unmarshal(format!(
                    "expected an array of records, found {}",
                    kind_of(other)
                ))),
            },
            Self::Path(path) => extract_records(body, path)?
                .ok_or_else(|| Error::unmarshal(format!("records not found at '{path}'"))),
            Self::OptionalPath(path) => Ok(extract_records(body, path)?.unwrap_or_default()),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Record Transformation
// ============================================================================

/// Projects raw records to the caller's fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordTransformer {
    /// Nested object moved up to the top level (Jira's `fields`)
    pub flatten: Option<String>,
    /// Path of the record id
    pub id_field: Option<String>,
}

impl RecordTransformer {
    /// Transformer that only projects
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the object under `key` into the record's top level
    #[must_use]
    pub fn flatten(mut self, key: impl Into<String>) -> Self {
        self.flatten = Some(key.into());
        self
    }

    /// Read the record id from `path`
    #[must_use]
    pub fn id_field(mut self, path: impl Into<String>) -> Self {
        self.id_field = Some(path.into());
        self
    }

    /// Turn one raw record into a row
    pub fn transform(&self, record: Value, fields: &BTreeSet<String>) -> Result<ReadResultRow> {
        let Value::Object(mut raw) = record else {
            return Err(Error::unmarshal(format!(
                "expected a record object, found {}",
                kind_of(&record)
            )));
        };

        if let Some(key) = &self.flatten {
            if let Some(Value::Object(nested)) = raw.remove(key) {
                for (k, v) in nested {
                    raw.entry(k).or_insert(v);
                }
            }
        }

        let id = self
            .id_field
            .as_deref()
            .and_then(|path| extract_path_in(&raw, path))
            .and_then(value_to_string);

        Ok(ReadResultRow {
            fields: project(&raw, fields),
            raw,
            id,
        })
    }
}

fn extract_path_in<'a>(record: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match record.get(path) {
        Some(value) => Some(value),
        None => {
            let (head, rest) = path.split_once('.')?;
            extract_path(record.get(head)?, rest)
        }
    }
}

/// Pick the requested fields out of a record. Dotted names reach into
/// nested objects; fields the record lacks are left out.
pub fn project(raw: &Map<String, Value>, fields: &BTreeSet<String>) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|f| extract_path_in(raw, f).map(|v| (f.clone(), v.clone())))
        .collect()
}

// ============================================================================
// Time Filtering
// ============================================================================

/// Order in which the provider returns records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrder {
    /// Newest first; the first record older than `since` ends the read
    Descending,
    /// No guarantee; every record is checked
    #[default]
    Unordered,
}

/// Client-side `[since, until)` filter for providers without server filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFilter {
    /// Path of the modification timestamp in the raw record
    pub field: String,
    /// Order of records in the response
    pub order: RecordOrder,
}

/// Outcome of filtering one page
#[derive(Debug, Default)]
pub struct Filtered {
    pub rows: Vec<ReadResultRow>,
    /// A record preceded `since`, so no later page can match
    pub exhausted: bool,
}

impl TimeFilter {
    /// Filter on `field` with no ordering assumption
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: RecordOrder::Unordered,
        }
    }

    /// Assume newest-first ordering
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.order = RecordOrder::Descending;
        self
    }

    /// Keep rows inside the window. Rows without a readable timestamp are kept.
    pub fn apply(&self, rows: Vec<ReadResultRow>, params: &ReadParams) -> Filtered {
        let Some(since) = params.since else {
            return Filtered {
                rows,
                exhausted: false,
            };
        };
        let until = params.effective_until();

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(at) = extract_path_in(&row.raw, &self.field).and_then(parse_timestamp) else {
                kept.push(row);
                continue;
            };
            if at < since {
                if self.order == RecordOrder::Descending {
                    return Filtered {
                        rows: kept,
                        exhausted: true,
                    };
                }
                continue;
            }
            if until.is_some_and(|u| at >= u) {
                continue;
            }
            kept.push(row);
        }

        Filtered {
            rows: kept,
            exhausted: false,
        }
    }
}

/// Parse an RFC 3339 string or epoch seconds
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        _ => None,
    }
}

// ============================================================================
// Read Parser
// ============================================================================

/// Parses one Read page
pub struct ReadParser {
    pub records: RecordLocator,
    pub paginator: Box<dyn Paginator>,
    pub transformer: RecordTransformer,
    pub time_filter: Option<TimeFilter>,
}

impl std::fmt::Debug for ReadParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadParser")
            .field("records", &self.records)
            .field("transformer", &self.transformer)
            .field("time_filter", &self.time_filter)
            .finish_non_exhaustive()
    }
}

impl ReadParser {
    /// Parser with a plain transformer and no time filter
    pub fn new(records: RecordLocator, paginator: impl Paginator + 'static) -> Self {
        Self {
            records,
            paginator: Box::new(paginator),
            transformer: RecordTransformer::default(),
            time_filter: None,
        }
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: RecordTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    #[must_use]
    pub fn with_time_filter(mut self, filter: TimeFilter) -> Self {
        self.time_filter = Some(filter);
        self
    }

    /// Build the page result for `response` to `request`
    pub fn parse(
        &self,
        params: &ReadParams,
        request: &Request,
        response: &Response,
    ) -> Result<ReadResult> {
        let body = response.body_or_null();
        let records = self.records.locate(body)?;
        let records_count = records.len();

        let mut next_page = if records_count == 0 {
            String::new()
        } else {
            self.paginator.next_page(&PageContext {
                request_url: &request.url,
                request_body: request.body.as_ref(),
                body,
                records_count,
            })?
        };

        let mut rows = records
            .into_iter()
            .map(|r| self.transformer.transform(r, &params.fields))
            .collect::<Result<Vec<_>>>()?;

        if let Some(filter) = &self.time_filter {
            let filtered = filter.apply(rows, params);
            if filtered.exhausted {
                next_page.clear();
            }
            rows = filtered.rows;
        }

        Ok(ReadResult::new(rows, next_page))
    }
}
