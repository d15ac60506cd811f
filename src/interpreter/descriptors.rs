//! Reusable error descriptors
//!
//! Provider modules define their own descriptors for bespoke bodies; the
//! common shapes live here.

use super::switch::{ErrorDescriptor, FormatSwitch, FormatTemplate};
use crate::error::Error;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Join non-empty messages with a delimiter
pub fn join_messages<I, S>(messages: I, delimiter: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    messages
        .into_iter()
        .filter(|m| !m.as_ref().trim().is_empty())
        .map(|m| m.as_ref().trim().to_string())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Render structured field errors as `field:reason` pairs
pub fn field_errors<'a, I>(errors: I) -> Vec<String>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    errors
        .into_iter()
        .map(|(field, reason)| format!("{field}:{reason}"))
        .collect()
}

/// `{"message": "..."}`
#[derive(Debug, Deserialize)]
pub struct MessageError {
    pub message: String,
}

impl ErrorDescriptor for MessageError {
    fn combine(&self, base: Error) -> Error {
        base.with_message(self.message.clone())
    }
}

/// `{"error": "...", "error_description": "..."}` as used by OAuth2 servers
#[derive(Debug, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ErrorDescriptor for OAuthError {
    fn combine(&self, base: Error) -> Error {
        let mut parts = vec![self.error.as_str()];
        if let Some(desc) = &self.error_description {
            parts.push(desc);
        }
        base.with_message(join_messages(parts, ": "))
    }
}

/// `{"errors": {"field": "reason"}}`
#[derive(Debug, Deserialize)]
pub struct FieldErrorMap {
    pub errors: BTreeMap<String, String>,
}

impl ErrorDescriptor for FieldErrorMap {
    fn combine(&self, base: Error) -> Error {
        base.with_message(field_errors(&self.errors).join(", "))
    }
}

/// Switch used when a provider registers nothing more specific
pub fn default_switch() -> FormatSwitch {
    FormatSwitch::new(vec![
        FormatTemplate::new::<OAuthError>(&["error", "error_description"]),
        FormatTemplate::new::<MessageError>(&["message"]),
    ])
}
