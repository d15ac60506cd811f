//! Format switch and the per-provider error handler

use super::html;
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A provider error body that knows how to overlay its message on a base error
pub trait ErrorDescriptor: Send + Sync {
    /// Combine with the status-derived base error
    fn combine(&self, base: Error) -> Error;
}

/// Parses a JSON body into a boxed descriptor
pub type DescriptorParser = fn(&Value) -> Option<Box<dyn ErrorDescriptor>>;

fn parse_descriptor<D>(body: &Value) -> Option<Box<dyn ErrorDescriptor>>
where
    D: ErrorDescriptor + DeserializeOwned + 'static,
{
    serde_json::from_value::<D>(body.clone())
        .ok()
        .map(|d| Box::new(d) as Box<dyn ErrorDescriptor>)
}

/// One entry of a format switch: required root keys and a descriptor type
#[derive(Clone, Copy)]
pub struct FormatTemplate {
    must_keys: &'static [&'static str],
    parse: DescriptorParser,
}

impl FormatTemplate {
    /// Template matching bodies that contain every key in `must_keys`
    pub fn new<D>(must_keys: &'static [&'static str]) -> Self
    where
        D: ErrorDescriptor + DeserializeOwned + 'static,
    {
        Self {
            must_keys,
            parse: parse_descriptor::<D>,
        }
    }

    /// Whether every required key is present at the root
    fn matches(&self, root: &serde_json::Map<String, Value>) -> bool {
        self.must_keys.iter().all(|k| root.contains_key(*k))
    }
}

impl std::fmt::Debug for FormatTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatTemplate")
            .field("must_keys", &self.must_keys)
            .finish_non_exhaustive()
    }
}

/// Ordered list of templates; the first whose keys all appear wins
#[derive(Debug, Clone, Default)]
pub struct FormatSwitch {
    templates: Vec<FormatTemplate>,
}

impl FormatSwitch {
    /// Create a switch from ordered templates
    pub fn new(templates: Vec<FormatTemplate>) -> Self {
        Self { templates }
    }

    /// Templates in match order
    pub fn templates(&self) -> &[FormatTemplate] {
        &self.templates
    }

    /// Pick and parse the matching descriptor.
    ///
    /// For an array body the keys of its first element are checked and the
    /// whole array is handed to the descriptor.
    pub fn parse(&self, body: &Value) -> Option<Box<dyn ErrorDescriptor>> {
        let root = match body {
            Value::Object(map) => map,
            Value::Array(items) => items.first()?.as_object()?,
            _ => return None,
        };

        self.templates
            .iter()
            .find(|t| t.matches(root))
            .and_then(|t| (t.parse)(body))
    }
}

/// Maps a non-2xx response to a typed error
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    switch: Arc<FormatSwitch>,
    html_fallback: bool,
}

impl ErrorHandler {
    /// Handler with a JSON format switch
    pub fn new(switch: FormatSwitch) -> Self {
        Self {
            switch: Arc::new(switch),
            html_fallback: false,
        }
    }

    /// Also extract messages from HTML error pages
    #[must_use]
    pub fn with_html_fallback(mut self) -> Self {
        self.html_fallback = true;
        self
    }

    /// Interpret an error response.
    ///
    /// The base error comes from the status code and carries the raw body as
    /// its message; a matching descriptor or the HTML fallback overlays a
    /// cleaner message.
    pub fn interpret(&self, status: u16, content_type: Option<&str>, body: &[u8]) -> Error {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        let base = Error::from_status(status, base_message(status, text));

        let media = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if media != "text/html" {
            if let Ok(json) = serde_json::from_str::<Value>(text) {
                return match self.switch.parse(&json) {
                    Some(descriptor) => descriptor.combine(base),
                    None => {
                        debug!(status, "No error format matched response body");
                        base
                    }
                };
            }
        }

        if self.html_fallback && (media == "text/html" || text.starts_with('<')) {
            if let Some(message) = html::extract_message(text) {
                return base.with_message(message);
            }
        }

        base
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(super::descriptors::default_switch())
    }
}

fn base_message(status: u16, text: &str) -> String {
    if !text.is_empty() {
        return text.to_string();
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), ToString::to_string)
}
