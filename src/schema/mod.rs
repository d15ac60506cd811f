//! Object metadata module
//!
//! Answers `list_object_metadata` from one of two sources, optionally
//! composed:
//!
//! - **Static**: a bundled per-provider schema document
//! - **Sampling**: one sampled record per object, field types inferred
//!   from its values

mod inference;
mod static_schema;
mod types;

pub use inference::{infer_metadata, SchemaInferrer};
pub use static_schema::StaticSchemas;
pub use types::{
    display_name, FieldMetadata, FieldValue, ListObjectMetadataResult, ObjectMetadata, ValueType,
};
