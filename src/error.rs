//! Error types for the connector runtime
//!
//! Every public API returns `Result<T, Error>`. Each error maps to one
//! canonical [`ErrorKind`] so callers can match programmatically with
//! [`Error::is`], while the display text carries the provider's message.

use crate::subscription::SubscriptionResult;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// Canonical Kinds
// ============================================================================

/// Canonical error kind shared by every provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    Server,
    EmptyResponse,
    ObjectNotSupported,
    MissingObjects,
    MissingFields,
    MissingRecordId,
    MissingRecordData,
    OperationNotSupportedForObject,
    ResolvingCustomFields,
    RequestFailed,
    MissingMetadata,
    MissingSignature,
    InvalidSignature,
    FailedToUnmarshalBody,
    InvalidSubscriptionEvent,
    Transport,
    Config,
}

impl ErrorKind {
    /// Map an HTTP status code to the base kind used before a provider
    /// descriptor overlays its own message.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::BadRequest,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::BadRequest => "bad request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate limited",
            Self::Server => "server error",
            Self::EmptyResponse => "empty response",
            Self::ObjectNotSupported => "object not supported",
            Self::MissingObjects => "missing objects",
            Self::MissingFields => "missing fields",
            Self::MissingRecordId => "missing record id",
            Self::MissingRecordData => "missing record data",
            Self::OperationNotSupportedForObject => "operation not supported for object",
            Self::ResolvingCustomFields => "error resolving custom fields",
            Self::RequestFailed => "request failed",
            Self::MissingMetadata => "missing metadata",
            Self::MissingSignature => "missing signature",
            Self::InvalidSignature => "invalid signature",
            Self::FailedToUnmarshalBody => "failed to unmarshal body",
            Self::InvalidSubscriptionEvent => "invalid subscription event",
            Self::Transport => "transport error",
            Self::Config => "configuration error",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Error
// ============================================================================

/// The main error type for the connector runtime
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Provider Responses
    // ============================================================================
    #[error("{kind} (HTTP {status}): {message}")]
    Api {
        kind: ErrorKind,
        status: u16,
        message: String,
    },

    #[error("empty response")]
    EmptyResponse,

    // ============================================================================
    // Local Validation
    // ============================================================================
    #[error("missing objects")]
    MissingObjects,

    #[error("missing fields")]
    MissingFields,

    #[error("missing record id")]
    MissingRecordId,

    #[error("missing record data")]
    MissingRecordData,

    #[error("object '{object}' is not supported")]
    ObjectNotSupported { object: String },

    #[error("operation '{operation}' is not supported for object '{object}'")]
    OperationNotSupported { operation: String, object: String },

    #[error("missing metadata: {}", .keys.join(", "))]
    MissingMetadata { keys: Vec<String> },

    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("missing credentials for auth kind '{auth_kind}'")]
    MissingCredentials { auth_kind: String },

    // ============================================================================
    // Configuration
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("JWT generation failed: {message}")]
    JwtGeneration { message: String },

    // ============================================================================
    // Transport and Decoding
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to unmarshal body: {message}")]
    Unmarshal { message: String },

    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    // ============================================================================
    // Custom Fields
    // ============================================================================
    #[error("error resolving custom fields: {message}")]
    ResolvingCustomFields { message: String },

    // ============================================================================
    // Webhooks
    // ============================================================================
    #[error("missing webhook signature header '{header}'")]
    MissingSignature { header: String },

    #[error("invalid webhook signature: {message}")]
    InvalidSignature { message: String },

    #[error("unsupported subscription event '{event}' for object '{object}'")]
    InvalidSubscriptionEvent { object: String, event: String },

    #[error("subscription {}: {source}", .result.status)]
    SubscriptionFailed {
        result: Box<SubscriptionResult>,
        #[source]
        source: Box<Error>,
    },

    #[error("failed to delete subscription {id} ({object}/{event}): {source}")]
    DeleteSubscription {
        object: String,
        event: String,
        id: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Generic
    // ============================================================================
    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider error from a kind, status and message
    pub fn api(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            kind,
            status,
            message: message.into(),
        }
    }

    /// Create a provider error whose kind is derived from the HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::api(ErrorKind::from_status(status), status, message)
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn unmarshal(message: impl Into<String>) -> Self {
        Self::Unmarshal {
            message: message.into(),
        }
    }

    /// Create a missing-metadata error for a single key
    pub fn missing_metadata(key: impl Into<String>) -> Self {
        Self::MissingMetadata {
            keys: vec![key.into()],
        }
    }

    /// Create an object-not-supported error
    pub fn object_not_supported(object: impl Into<String>) -> Self {
        Self::ObjectNotSupported {
            object: object.into(),
        }
    }

    /// Create an operation-not-supported error
    pub fn operation_not_supported(
        operation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::OperationNotSupported {
            operation: operation.into(),
            object: object.into(),
        }
    }

    /// Create a custom-field resolution error
    pub fn custom_fields(message: impl Into<String>) -> Self {
        Self::ResolvingCustomFields {
            message: message.into(),
        }
    }

    /// Replace the human message of a provider error, keeping its kind and status.
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        match self {
            Self::Api { kind, status, .. } => Self::Api {
                kind,
                status,
                message: message.into(),
            },
            other => other,
        }
    }

    /// Canonical kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { kind, .. } => *kind,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::MissingObjects => ErrorKind::MissingObjects,
            Self::MissingFields => ErrorKind::MissingFields,
            Self::MissingRecordId => ErrorKind::MissingRecordId,
            Self::MissingRecordData => ErrorKind::MissingRecordData,
            Self::ObjectNotSupported { .. } => ErrorKind::ObjectNotSupported,
            Self::OperationNotSupported { .. } => ErrorKind::OperationNotSupportedForObject,
            Self::MissingMetadata { .. } => ErrorKind::MissingMetadata,
            Self::UnknownProvider { .. } | Self::MissingCredentials { .. } => {
                ErrorKind::BadRequest
            }
            Self::Config { .. } | Self::YamlParse(_) | Self::JwtGeneration { .. } => {
                ErrorKind::Config
            }
            Self::Auth { .. } => ErrorKind::Unauthorized,
            Self::Http(_) => ErrorKind::Transport,
            Self::InvalidUrl(_) => ErrorKind::BadRequest,
            Self::JsonParse(_) | Self::Unmarshal { .. } | Self::JsonPath { .. } => {
                ErrorKind::FailedToUnmarshalBody
            }
            Self::ResolvingCustomFields { .. } => ErrorKind::ResolvingCustomFields,
            Self::MissingSignature { .. } => ErrorKind::MissingSignature,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::InvalidSubscriptionEvent { .. } => ErrorKind::InvalidSubscriptionEvent,
            Self::SubscriptionFailed { source, .. }
            | Self::DeleteSubscription { source, .. }
            | Self::Context { source, .. } => source.kind(),
            Self::Other(_) => ErrorKind::RequestFailed,
        }
    }

    /// Check whether this error is of the given canonical kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// HTTP status of a provider error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Context { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Subscription state attached to a failed subscribe call
    pub fn subscription_result(&self) -> Option<&SubscriptionResult> {
        match self {
            Self::SubscriptionFailed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Check if a caller could reasonably retry this error.
    /// The runtime itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimited | ErrorKind::Server | ErrorKind::Transport
        )
    }
}

/// Result type alias for the connector runtime
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error, keeping its kind
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: message.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Context {
            message: f(),
            source: Box::new(e.into()),
        })
    }
}
