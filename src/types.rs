//! Common types used throughout the connector runtime
//!
//! Shared type aliases, the HTTP method enum and time rendering formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
            Method::POST => reqwest::Method::POST,
            Method::PUT => reqwest::Method::PUT,
            Method::PATCH => reqwest::Method::PATCH,
            Method::DELETE => reqwest::Method::DELETE,
        }
    }
}

// ============================================================================
// Time Format
// ============================================================================

/// Wire format for timestamps sent in incremental-read filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// RFC 3339 in UTC, second precision (`2024-01-02T03:04:05Z`)
    #[default]
    Rfc3339,
    /// Unix timestamp (seconds)
    Unix,
    /// Unix timestamp (milliseconds)
    UnixMs,
}

impl TimeFormat {
    /// Render a timestamp in this format
    pub fn render(self, time: DateTime<Utc>) -> String {
        match self {
            TimeFormat::Rfc3339 => time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            TimeFormat::Unix => time.timestamp().to_string(),
            TimeFormat::UnixMs => time.timestamp_millis().to_string(),
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Render a scalar JSON value as a plain string (strings unquoted)
pub fn value_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_method_conversion() {
        let get: reqwest::Method = Method::GET.into();
        assert_eq!(reqwest::Method::GET, get);
        let patch: reqwest::Method = Method::PATCH.into();
        assert_eq!(reqwest::Method::PATCH, patch);
        assert_eq!(Method::DELETE.to_string(), "DELETE");
    }

    #[test]
    fn test_time_format_render() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(TimeFormat::Rfc3339.render(t), "2024-03-01T12:30:00Z");
        assert_eq!(TimeFormat::Unix.render(t), "1709296200");
        assert_eq!(TimeFormat::UnixMs.render(t), "1709296200000");
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(value_to_string(&json!(2082340)), Some("2082340".to_string()));
        assert_eq!(value_to_string(&json!(null)), None);
    }
}
