//! Verb parameter and result types

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// ============================================================================
// Read
// ============================================================================

/// Parameters of a Read call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    /// Object to list (e.g. `issues`, `people`)
    pub object_name: String,
    /// Fields to project into each row
    #[serde(default)]
    pub fields: BTreeSet<String>,
    /// Lower bound (inclusive) of the modification window
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Upper bound (exclusive); ignored without `since`
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Token returned by the previous page; empty for the first page
    #[serde(default)]
    pub next_page: String,
    /// Requested page size
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl ReadParams {
    /// Read an object with the given fields
    pub fn new<I, S>(object_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            object_name: object_name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the lower time bound
    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Set the upper time bound
    #[must_use]
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    /// Continue from a page token
    #[must_use]
    pub fn next_page(mut self, token: impl Into<String>) -> Self {
        self.next_page = token.into();
        self
    }

    /// Set the page size
    #[must_use]
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Page size, falling back to a provider default
    pub fn page_size_or(&self, default: usize) -> usize {
        self.page_size.filter(|s| *s > 0).unwrap_or(default)
    }

    /// Upper bound, only honored together with a lower bound
    pub fn effective_until(&self) -> Option<DateTime<Utc>> {
        self.since.and(self.until)
    }

    /// Check the object name and, unless waived, the field set
    pub fn validate(&self, require_fields: bool) -> Result<()> {
        if self.object_name.is_empty() {
            return Err(Error::MissingObjects);
        }
        if require_fields && self.fields.is_empty() {
            return Err(Error::MissingFields);
        }
        Ok(())
    }
}

/// One record of a Read page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadResultRow {
    /// `raw` projected through the requested fields
    pub fields: Map<String, Value>,
    /// The provider's record
    pub raw: Map<String, Value>,
    /// Record id when the provider exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One page of a Read
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    /// Number of rows in `data`
    pub rows: usize,
    /// Rows in provider order
    pub data: Vec<ReadResultRow>,
    /// Token for the next page; empty when done
    pub next_page: String,
    /// True exactly when `next_page` is empty
    pub done: bool,
}

impl ReadResult {
    /// Build a page, deriving `rows` and `done`
    pub fn new(data: Vec<ReadResultRow>, next_page: String) -> Self {
        Self {
            rows: data.len(),
            done: next_page.is_empty(),
            data,
            next_page,
        }
    }
}

// ============================================================================
// Write
// ============================================================================

/// Parameters of a Write call; no record id means create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParams {
    pub object_name: String,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub record_data: Value,
}

impl WriteParams {
    /// Create a record
    pub fn create(object_name: impl Into<String>, record_data: Value) -> Self {
        Self {
            object_name: object_name.into(),
            record_id: None,
            record_data,
        }
    }

    /// Update a record
    pub fn update(
        object_name: impl Into<String>,
        record_id: impl Into<String>,
        record_data: Value,
    ) -> Self {
        Self {
            object_name: object_name.into(),
            record_id: Some(record_id.into()),
            record_data,
        }
    }

    /// Record id when updating
    pub fn update_id(&self) -> Option<&str> {
        self.record_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Check the object name and record data
    pub fn validate(&self) -> Result<()> {
        if self.object_name.is_empty() {
            return Err(Error::MissingObjects);
        }
        let empty = match &self.record_data {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if empty {
            return Err(Error::MissingRecordData);
        }
        Ok(())
    }
}

/// Outcome of a Write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub success: bool,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

impl WriteResult {
    /// Successful write without a payload
    pub fn empty_success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }
}

// ============================================================================
// Delete
// ============================================================================

/// Parameters of a Delete call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteParams {
    pub object_name: String,
    pub record_id: String,
}

impl DeleteParams {
    /// Delete one record
    pub fn new(object_name: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            record_id: record_id.into(),
        }
    }

    /// Check the object name and record id
    pub fn validate(&self) -> Result<()> {
        if self.object_name.is_empty() {
            return Err(Error::MissingObjects);
        }
        if self.record_id.is_empty() {
            return Err(Error::MissingRecordId);
        }
        Ok(())
    }
}

/// Outcome of a Delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
}

// ============================================================================
// Webhooks
// ============================================================================

/// An inbound webhook delivery
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// Headers as received
    pub headers: Vec<(String, String)>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl WebhookRequest {
    /// Create from headers and body
    pub fn new(headers: Vec<(String, String)>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }
}

/// Verification parameters for an inbound webhook
#[derive(Debug, Clone, Default)]
pub struct VerifyParams {
    /// Secret shared at subscription time
    pub secret: String,
}
