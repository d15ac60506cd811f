//! Custom field types

use crate::error::Result;
use crate::handlers::{ObjectSet, ProviderContext};
use crate::http::{Request, Response};
use crate::interpreter::ErrorHandler;
use crate::schema::{FieldMetadata, FieldValue, ValueType};
use crate::types::value_to_string;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A tenant-defined field as the provider describes it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFieldDefinition {
    /// Provider id, as it appears in records
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Top-level record key the value is collapsed into
    pub key: String,
    pub value_type: ValueType,
    pub provider_type: String,
    /// Objects the field applies to; empty means every object
    pub objects: Vec<String>,
    /// Allowed values of select fields
    pub options: Vec<FieldValue>,
}

impl CustomFieldDefinition {
    /// Whether the field applies to `object`
    pub fn applies_to(&self, object: &str) -> bool {
        self.objects.is_empty() || self.objects.iter().any(|o| o == object)
    }

    /// Field metadata entry for this definition
    pub fn to_field_metadata(&self) -> FieldMetadata {
        let mut field = FieldMetadata::new(&self.name, self.value_type)
            .provider_type(&self.provider_type)
            .custom();
        if !self.options.is_empty() {
            field = field.with_values(self.options.clone());
        }
        field
    }

    /// Display value of an option id, for select fields stored by id
    pub fn option_label(&self, value: &Value) -> Option<&str> {
        let raw = value_to_string(value)?;
        self.options
            .iter()
            .find(|o| o.value == raw)
            .map(|o| o.display_value.as_str())
    }
}

/// Definitions fetched for one call, keyed by provider id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFieldRegistry {
    by_id: BTreeMap<String, CustomFieldDefinition>,
}

impl CustomFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: CustomFieldDefinition) {
        self.by_id.insert(definition.id.clone(), definition);
    }

    pub fn get(&self, id: &str) -> Option<&CustomFieldDefinition> {
        self.by_id.get(id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &CustomFieldDefinition> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<CustomFieldDefinition> for CustomFieldRegistry {
    fn from_iter<I: IntoIterator<Item = CustomFieldDefinition>>(iter: I) -> Self {
        let mut registry = Self::new();
        for definition in iter {
            registry.insert(definition);
        }
        registry
    }
}

// ============================================================================
// Record Layouts
// ============================================================================

/// How custom values are laid out inside a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLayout {
    /// `{"custom_fields": [{"<id_key>": 12, "<value_key>": "x"}]}`
    IdValueArray {
        array_key: &'static str,
        id_key: &'static str,
        value_key: &'static str,
    },
    /// `{"custom_fields": {"Name": "x"}}`
    NamedObject { object_key: &'static str },
    /// `{"customfield_10010": "x"}` at the top level
    PrefixedKeys { prefix: &'static str },
}

impl RecordLayout {
    /// Whether collapsing needs the definitions
    pub fn needs_registry(&self) -> bool {
        !matches!(self, Self::NamedObject { .. })
    }

    /// Whether the record carries custom values
    pub fn has_custom_section(&self, record: &Map<String, Value>) -> bool {
        match self {
            Self::IdValueArray { array_key, .. } => {
                matches!(record.get(*array_key), Some(Value::Array(items)) if !items.is_empty())
            }
            Self::NamedObject { object_key } => {
                matches!(record.get(*object_key), Some(Value::Object(_)))
            }
            Self::PrefixedKeys { prefix } => record.keys().any(|k| k.starts_with(prefix)),
        }
    }

    /// Move custom values to the top level under their definition keys.
    ///
    /// Values whose definition is gone are dropped; select values stored by
    /// option id are replaced by the option label.
    pub fn collapse(&self, record: &mut Map<String, Value>, registry: &CustomFieldRegistry) {
        match self {
            Self::IdValueArray {
                array_key,
                id_key,
                value_key,
            } => {
                let Some(Value::Array(entries)) = record.remove(*array_key) else {
                    return;
                };
                for entry in entries {
                    let Some(id) = entry.get(*id_key).and_then(value_to_string) else {
                        continue;
                    };
                    let Some(definition) = registry.get(&id) else {
                        continue;
                    };
                    let value = entry.get(*value_key).cloned().unwrap_or(Value::Null);
                    record.insert(definition.key.clone(), resolve_option(definition, value));
                }
            }
            Self::NamedObject { object_key } => {
                let Some(Value::Object(values)) = record.remove(*object_key) else {
                    return;
                };
                for (name, value) in values {
                    record.entry(name).or_insert(value);
                }
            }
            Self::PrefixedKeys { prefix } => {
                let ids: Vec<String> = record
                    .keys()
                    .filter(|k| k.starts_with(prefix) && registry.get(k).is_some())
                    .cloned()
                    .collect();
                for id in ids {
                    if let (Some(value), Some(definition)) = (record.remove(&id), registry.get(&id)) {
                        record.insert(definition.key.clone(), value);
                    }
                }
            }
        }
    }
}

fn resolve_option(definition: &CustomFieldDefinition, value: Value) -> Value {
    match &value {
        Value::Array(items) if definition.value_type == ValueType::MultiSelect => Value::Array(
            items
                .iter()
                .map(|v| {
                    definition
                        .option_label(v)
                        .map_or_else(|| v.clone(), |l| Value::String(l.to_string()))
                })
                .collect(),
        ),
        Value::Number(_) if definition.value_type == ValueType::SingleSelect => definition
            .option_label(&value)
            .map_or(value.clone(), |l| Value::String(l.to_string())),
        _ => value,
    }
}

// ============================================================================
// Sources
// ============================================================================

/// One page of custom field definitions
#[derive(Debug, Clone, Default)]
pub struct DefinitionPage {
    pub definitions: Vec<CustomFieldDefinition>,
    /// Token for the next page; empty when done
    pub next_page: String,
}

/// Builds the definitions request for an object and page token
pub type BuildDefinitionsRequest = fn(&ProviderContext, &str, &str) -> Result<Request>;

/// Parses one page of definitions for an object
pub type ParseDefinitions = fn(&ProviderContext, &str, &Response) -> Result<DefinitionPage>;

/// Where a provider's custom field definitions come from
#[derive(Clone)]
pub struct CustomFieldSource {
    pub objects: ObjectSet,
    pub build_request: BuildDefinitionsRequest,
    pub parse_page: ParseDefinitions,
    pub layout: RecordLayout,
    pub error_handler: Option<ErrorHandler>,
}

impl CustomFieldSource {
    pub fn new(
        objects: ObjectSet,
        build_request: BuildDefinitionsRequest,
        parse_page: ParseDefinitions,
        layout: RecordLayout,
    ) -> Self {
        Self {
            objects,
            build_request,
            parse_page,
            layout,
            error_handler: None,
        }
    }

    /// Whether `object` has custom fields
    pub fn supports(&self, object: &str) -> bool {
        self.objects.contains(object)
    }
}

impl std::fmt::Debug for CustomFieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomFieldSource")
            .field("objects", &self.objects)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// `custom_field_` + snake_case of a field name: `Favorite Fruit` → `custom_field_favorite_fruit`
pub fn custom_field_key(name: &str) -> String {
    let snake = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_");
    format!("custom_field_{snake}")
}
