//! Provider catalog
//!
//! A process-wide, immutable mapping from provider name to its auth kind,
//! base URL template, capability matrix and modules. Entries are YAML
//! documents; the built-in ones are embedded at compile time.

mod registry;
mod types;

pub use registry::*;
pub use types::*;
