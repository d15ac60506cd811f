//! Bundled schema documents
//!
//! Each provider with a static schema ships a JSON document derived from its
//! OpenAPI description:
//!
//! ```json
//! {
//!   "accounts": {
//!     "displayName": "Accounts",
//!     "fields": {
//!       "state": {"type": "string", "enum": ["active", "closed"]},
//!       "created_at": {"type": "string", "format": "date-time", "readOnly": true}
//!     }
//!   }
//! }
//! ```
//!
//! Enumerated values turn a string field into a single-select, and an array
//! of enumerated strings into a multi-select.

use super::types::{display_name, FieldMetadata, FieldValue, ObjectMetadata, ValueType};
use crate::error::{Error, Result, ResultExt};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaObject {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, SchemaField>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaField {
    #[serde(rename = "type", default)]
    json_type: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(rename = "enum", default)]
    enum_values: Option<Vec<String>>,
    #[serde(default)]
    items: Option<Box<SchemaField>>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    read_only: bool,
}

impl SchemaField {
    fn value_type(&self) -> ValueType {
        match self.json_type.as_deref() {
            Some("string") if self.enum_values.is_some() => ValueType::SingleSelect,
            Some("string") if matches!(self.format.as_deref(), Some("date-time" | "date")) => {
                ValueType::DateTime
            }
            Some("string") => ValueType::String,
            Some("integer") => ValueType::Int,
            Some("number") => ValueType::Float,
            Some("boolean") => ValueType::Boolean,
            Some("array") if self.items.as_ref().is_some_and(|i| i.enum_values.is_some()) => {
                ValueType::MultiSelect
            }
            _ => ValueType::Other,
        }
    }

    fn allowed_values(&self) -> Option<Vec<FieldValue>> {
        let values = self
            .enum_values
            .as_ref()
            .or_else(|| self.items.as_ref().and_then(|i| i.enum_values.as_ref()))?;
        Some(
            values
                .iter()
                .map(|v| FieldValue::new(v, display_name(v)))
                .collect(),
        )
    }

    fn into_metadata(self, name: &str) -> FieldMetadata {
        let mut field = FieldMetadata::new(
            self.display_name.clone().unwrap_or_else(|| display_name(name)),
            self.value_type(),
        )
        .provider_type(self.json_type.clone().unwrap_or_default());
        if self.read_only {
            field = field.read_only();
        }
        if let Some(values) = self.allowed_values() {
            field = field.with_values(values);
        }
        field
    }
}

/// Object metadata loaded from a bundled document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticSchemas {
    objects: BTreeMap<String, ObjectMetadata>,
}

impl StaticSchemas {
    /// Parse a schema document
    pub fn from_json(document: &str) -> Result<Self> {
        let raw: BTreeMap<String, SchemaObject> =
            serde_json::from_str(document).context("Failed to parse schema document")?;

        let objects = raw
            .into_iter()
            .map(|(name, object)| {
                let mut metadata = ObjectMetadata::new(
                    object.display_name.unwrap_or_else(|| display_name(&name)),
                );
                for (field_name, field) in object.fields {
                    let field = field.into_metadata(&field_name);
                    metadata.add_field(field_name, field);
                }
                (name, metadata)
            })
            .collect();

        Ok(Self { objects })
    }

    /// Metadata of one object
    pub fn get(&self, object: &str) -> Option<&ObjectMetadata> {
        self.objects.get(object)
    }

    /// Metadata of one object, or `ObjectNotSupported`
    pub fn lookup(&self, object: &str) -> Result<ObjectMetadata> {
        self.get(object)
            .cloned()
            .ok_or_else(|| Error::object_not_supported(object))
    }

    /// Object names in order
    pub fn objects(&self) -> Vec<&str> {
        self.objects.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
