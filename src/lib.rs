//! # Unified Connectors
//!
//! A Rust-native runtime that exposes third-party SaaS REST APIs through one
//! set of verbs: Read, Write, Delete, ListObjectMetadata, Subscribe and
//! webhook verification.
//!
//! ## Features
//!
//! - **Provider Catalog**: YAML provider entries with auth kind, base URL templates and modules
//! - **Multiple Auth Types**: OAuth2 tokens, API keys, Basic, client credentials, Atlassian Connect JWT
//! - **Smart Pagination**: Cursor, offset, page number, next URL, client-side time windows
//! - **Error Interpretation**: Status-derived kinds with provider messages from JSON or HTML bodies
//! - **Custom Fields**: Tenant-defined fields in metadata and collapsed into read records
//! - **Webhooks**: Concurrent subscription with rollback, HMAC-SHA1 delivery verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use unified_connectors::{new_connector, Catalog, Connector, ConnectorParams, Credentials, ReadParams};
//!
//! #[tokio::main]
//! async fn main() -> unified_connectors::Result<()> {
//!     let catalog = Catalog::builtin()?;
//!     let params = ConnectorParams::new()
//!         .with_credentials(Credentials::Oauth2Token { access_token: "...".into() });
//!     let connector = new_connector(&catalog, "salesloft", params)?;
//!
//!     let page = connector.read(ReadParams::new("people", ["id", "email_address"])).await?;
//!     println!("{} rows, done={}", page.rows, page.done);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Connector Interface                        │
//! │  read()  write()  delete()  list_object_metadata()  subscribe()  │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌───────────┬───────────┬──────┴──────┬─────────────┬─────────────┐
//! │  Catalog  │  Resolver │  Handlers   │   Schema    │  Webhooks   │
//! ├───────────┼───────────┼─────────────┼─────────────┼─────────────┤
//! │ Providers │ Metadata  │ Build       │ Static      │ Subscribe   │
//! │ Modules   │ Base URLs │ Execute     │ Sampling    │ Rollback    │
//! │ Auth kind │ Auth      │ Parse       │ Custom flds │ Verify      │
//! └───────────┴───────────┴─────────────┴─────────────┴─────────────┘
//!                                │
//! ┌──────────┬────────────┬──────┴───────┬──────────────────────────┐
//! │   Auth   │    HTTP    │  Pagination  │    Error Interpreter     │
//! └──────────┴────────────┴──────────────┴──────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and canonical error kinds
pub mod error;

/// Common types
pub mod types;

/// `{{key}}` template rendering
pub mod template;

/// Provider catalog
pub mod catalog;

/// Provider resolution against caller parameters
pub mod resolver;

/// Authentication implementations
pub mod auth;

/// HTTP client with auth and rate limiting
pub mod http;

/// Provider error interpretation
pub mod interpreter;

/// URL construction with per-provider encoding exceptions
pub mod urlbuilder;

/// Per-verb handler sets
pub mod handlers;

/// Pagination strategies and read parsing
pub mod pagination;

/// Object metadata
pub mod schema;

/// Custom field definitions and enrichment
pub mod customfields;

/// Webhook subscriptions and verification
pub mod subscription;

/// Connector verbs and pipeline
pub mod connector;

/// Provider handler sets
pub mod providers;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

pub use catalog::{Catalog, ProviderEntry};
pub use connector::{
    new_connector, new_connector_with_config, Connector, DeleteParams, DeleteResult, ReadParams,
    ReadResult, ReadResultRow, RestConnector, VerifyParams, WebhookRequest, WriteParams,
    WriteResult,
};
pub use resolver::{ConnectorParams, Credentials};
pub use schema::{FieldMetadata, ListObjectMetadataResult, ObjectMetadata, ValueType};
pub use subscription::{SubscribeParams, SubscriptionResult, SubscriptionStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
