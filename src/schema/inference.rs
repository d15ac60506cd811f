//! Metadata inference from sampled records

use super::types::{display_name, FieldMetadata, ObjectMetadata, ValueType};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static DATETIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // 2024-01-15T10:30:00Z, 2024-01-15T10:30:00.123+00:00, 2024-01-15 10:30:00
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").expect("valid datetime regex")
});

static DATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Field metadata inferrer
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Detect date-time strings
    detect_datetime: bool,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    /// Create a new inferrer with default settings
    pub fn new() -> Self {
        Self {
            detect_datetime: true,
        }
    }

    /// Enable/disable datetime detection
    #[must_use]
    pub fn with_datetime_detection(mut self, enabled: bool) -> Self {
        self.detect_datetime = enabled;
        self
    }

    /// Infer object metadata from sampled records.
    ///
    /// Every key seen in any record becomes a field. A field observed with
    /// different types takes the more general type.
    pub fn infer_object(&self, object: &str, records: &[Map<String, Value>]) -> ObjectMetadata {
        let mut metadata = ObjectMetadata::new(display_name(object));

        for record in records {
            for (key, value) in record {
                let observed = self.infer_type(value);
                metadata
                    .fields
                    .entry(key.clone())
                    .and_modify(|f| f.value_type = f.value_type.merge_with(observed))
                    .or_insert_with(|| {
                        FieldMetadata::new(display_name(key), observed)
                            .provider_type(json_type_name(value))
                    });
            }
        }

        metadata
    }

    /// Value type of one JSON value
    pub fn infer_type(&self, value: &Value) -> ValueType {
        match value {
            Value::Null | Value::Object(_) | Value::Array(_) => ValueType::Other,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Int,
            Value::Number(_) => ValueType::Float,
            Value::String(s) if self.detect_datetime && is_datetime(s) => ValueType::DateTime,
            Value::String(_) => ValueType::String,
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Infer object metadata with default settings (convenience function)
pub fn infer_metadata(object: &str, records: &[Map<String, Value>]) -> ObjectMetadata {
    SchemaInferrer::new().infer_object(object, records)
}

fn is_datetime(s: &str) -> bool {
    DATETIME_REGEX.is_match(s) || DATE_REGEX.is_match(s)
}
