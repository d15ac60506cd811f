//! Custom field module
//!
//! Providers with tenant-defined fields expose their definitions on a
//! separate endpoint. Definitions are fetched per call (never cached) and
//! used to append custom fields to object metadata and to collapse custom
//! values into the top level of read records.

mod enhancer;
mod types;

pub use enhancer::{enhance_metadata, enhance_rows, fetch_registry, needs_enrichment};
pub use types::{
    custom_field_key, BuildDefinitionsRequest, CustomFieldDefinition, CustomFieldRegistry,
    CustomFieldSource, DefinitionPage, ParseDefinitions, RecordLayout,
};

#[cfg(test)]
mod tests;
