//! Schema types

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized field value type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueType {
    #[default]
    String,
    Int,
    Float,
    Boolean,
    DateTime,
    SingleSelect,
    MultiSelect,
    Other,
}

impl ValueType {
    /// Merge two observations of the same field, returning the more general type
    pub fn merge_with(self, other: ValueType) -> ValueType {
        match (self, other) {
            (a, b) if a == b => a,
            (ValueType::Other, x) | (x, ValueType::Other) => x,
            (ValueType::Int, ValueType::Float) | (ValueType::Float, ValueType::Int) => {
                ValueType::Float
            }
            // Incompatible types - fall back to string
            _ => ValueType::String,
        }
    }

    /// Whether values come from an enumerated list
    pub fn is_select(self) -> bool {
        matches!(self, ValueType::SingleSelect | ValueType::MultiSelect)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::DateTime => write!(f, "datetime"),
            ValueType::SingleSelect => write!(f, "singleSelect"),
            ValueType::MultiSelect => write!(f, "multiSelect"),
            ValueType::Other => write!(f, "other"),
        }
    }
}

/// One allowed value of a select field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub value: String,
    pub display_value: String,
}

impl FieldValue {
    pub fn new(value: impl Into<String>, display_value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            display_value: display_value.into(),
        }
    }
}

/// Metadata of one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub display_name: String,
    pub value_type: ValueType,
    /// Type name as the provider reports it
    #[serde(default)]
    pub provider_type: String,
    #[serde(default)]
    pub read_only: bool,
    /// Tenant-defined field
    #[serde(default)]
    pub is_custom: bool,
    /// Allowed values of select fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<FieldValue>>,
}

impl FieldMetadata {
    /// Field of the given type
    pub fn new(display_name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            display_name: display_name.into(),
            value_type,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = provider_type.into();
        self
    }

    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    #[must_use]
    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: Vec<FieldValue>) -> Self {
        self.values = Some(values);
        self
    }
}

/// Metadata of one object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub display_name: String,
    pub fields: BTreeMap<String, FieldMetadata>,
}

impl ObjectMetadata {
    /// Object without fields
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add or replace a field
    pub fn add_field(&mut self, name: impl Into<String>, field: FieldMetadata) {
        self.fields.insert(name.into(), field);
    }

    /// Field names in order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

/// Outcome of `list_object_metadata`: per-object results and per-object errors
#[derive(Debug, Default)]
pub struct ListObjectMetadataResult {
    pub result: BTreeMap<String, ObjectMetadata>,
    pub errors: BTreeMap<String, Error>,
}

impl ListObjectMetadataResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record metadata for an object
    pub fn insert(&mut self, object: impl Into<String>, metadata: ObjectMetadata) {
        self.result.insert(object.into(), metadata);
    }

    /// Record a failure for an object
    pub fn fail(&mut self, object: impl Into<String>, error: Error) {
        self.errors.insert(object.into(), error);
    }
}

/// Capitalize the first letter of each word: `first_name` → `First Name`
pub fn display_name(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
