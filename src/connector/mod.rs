//! Connector module
//!
//! The caller-facing [`Connector`] verbs, their parameter and result types,
//! and the generic pipeline that drives a provider's handlers.

mod factory;
mod pipeline;
mod responses;
mod types;

pub use factory::{new_connector, new_connector_with_config};
pub use pipeline::{Connector, RestConnector};
pub use responses::{delete_result, write_result};
pub use types::{
    DeleteParams, DeleteResult, ReadParams, ReadResult, ReadResultRow, VerifyParams,
    WebhookRequest, WriteParams, WriteResult,
};
