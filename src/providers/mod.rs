//! Provider handler sets
//!
//! Each module contributes one [`HandlerRegistry`] for a catalog provider.
//! Providers present only in the catalog (Salesforce, for instance) get an
//! empty registry: they resolve, and every verb reports
//! `OperationNotSupportedForObject`.

pub mod atlassian;
pub mod aws;
pub mod constantcontact;
pub mod copper;
pub mod keap;
pub mod recurly;
pub mod salesloft;

use crate::handlers::{HandlerRegistry, ProviderContext};
use crate::interpreter::ErrorHandler;
use tracing::debug;

/// Handler registry for a resolved provider
pub fn registry_for(ctx: &ProviderContext) -> HandlerRegistry {
    match ctx.provider.as_str() {
        "atlassian" | "atlassian-connect" => atlassian::registry(),
        "aws" => aws::registry(),
        "constantcontact" => constantcontact::registry(),
        "copper" => copper::registry(),
        "keap" => keap::registry(),
        "recurly" => recurly::registry(),
        "salesloft" => salesloft::registry(),
        other => {
            debug!("No handlers registered for {}", other);
            HandlerRegistry::new(ErrorHandler::default())
        }
    }
}

#[cfg(test)]
mod tests;
