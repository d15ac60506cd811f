//! Handler registry
//!
//! Each verb a provider supports is a [`HandlerSet`]: a request builder, a
//! response parser and the error handler used to interpret failures. A
//! provider contributes one [`HandlerRegistry`] holding its verb handlers,
//! its schema source, its custom-field source and its webhook support.

use crate::connector::{
    DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams, WriteResult,
};
use crate::customfields::CustomFieldSource;
use crate::error::Result;
use crate::http::{Request, Response};
use crate::interpreter::ErrorHandler;
use crate::resolver::{AuthMetadata, ResolvedProvider};
use crate::subscription::SubscriptionSpec;
use crate::urlbuilder::UrlBuilder;
use url::Url;

// ============================================================================
// Provider Context
// ============================================================================

/// Resolved provider state handed to every handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderContext {
    /// Provider name
    pub provider: String,
    /// Selected module id
    pub module_id: String,
    /// Provider base URL
    pub base_url: String,
    /// Module URL (base plus module path)
    pub module_url: String,
    /// Caller metadata
    pub metadata: AuthMetadata,
}

impl ProviderContext {
    /// Build from a resolved provider
    pub fn from_resolved(resolved: &ResolvedProvider) -> Self {
        Self {
            provider: resolved.entry.name.clone(),
            module_id: resolved.module_id.clone(),
            base_url: resolved.base_url.clone(),
            module_url: resolved.module_url.clone(),
            metadata: resolved.metadata.clone(),
        }
    }

    /// Module URL joined with path segments
    pub fn url<S: AsRef<str>>(&self, segments: &[S]) -> Result<UrlBuilder> {
        UrlBuilder::new(&self.module_url)?.add_path(segments)
    }

    /// Provider base URL joined with path segments
    pub fn base<S: AsRef<str>>(&self, segments: &[S]) -> Result<UrlBuilder> {
        UrlBuilder::new(&self.base_url)?.add_path(segments)
    }

    /// Point the context at another origin, keeping the module path
    pub fn rebase(&mut self, base_url: &str) {
        let module_path = Url::parse(&self.module_url)
            .map(|u| u.path().trim_end_matches('/').to_string())
            .unwrap_or_default();
        let base_url = base_url.trim_end_matches('/');
        self.base_url = base_url.to_string();
        self.module_url = format!("{base_url}{module_path}");
    }
}

// ============================================================================
// Handler Sets
// ============================================================================

/// Objects a handler accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectSet {
    /// Any object name
    All,
    /// Only these names
    Only(&'static [&'static str]),
}

impl ObjectSet {
    /// Whether `object` is accepted
    pub fn contains(&self, object: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(&object),
        }
    }
}

/// Builds the request for one verb call
pub type BuildRequest<P> = fn(&ProviderContext, &P) -> Result<Request>;

/// Parses the response of one verb call
pub type ParseResponse<P, R> = fn(&ProviderContext, &P, &Request, &Response) -> Result<R>;

/// Request builder, response parser and error handler for one verb
pub struct HandlerSet<P, R> {
    pub build_request: BuildRequest<P>,
    pub parse_response: ParseResponse<P, R>,
    /// Overrides the registry's error handler for this verb
    pub error_handler: Option<ErrorHandler>,
    pub objects: ObjectSet,
}

impl<P, R> HandlerSet<P, R> {
    /// Handler accepting every object
    pub fn new(build_request: BuildRequest<P>, parse_response: ParseResponse<P, R>) -> Self {
        Self {
            build_request,
            parse_response,
            error_handler: None,
            objects: ObjectSet::All,
        }
    }

    /// Restrict to the given objects
    #[must_use]
    pub fn only(mut self, objects: &'static [&'static str]) -> Self {
        self.objects = ObjectSet::Only(objects);
        self
    }

    /// Interpret this verb's errors with a dedicated handler
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Whether the handler accepts `object`
    pub fn supports(&self, object: &str) -> bool {
        self.objects.contains(object)
    }
}

impl<P, R> Clone for HandlerSet<P, R> {
    fn clone(&self) -> Self {
        Self {
            build_request: self.build_request,
            parse_response: self.parse_response,
            error_handler: self.error_handler.clone(),
            objects: self.objects,
        }
    }
}

impl<P, R> std::fmt::Debug for HandlerSet<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerSet")
            .field("objects", &self.objects)
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Where object metadata comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchemaSource {
    /// No metadata support
    #[default]
    None,
    /// Bundled schema document only
    Static(&'static str),
    /// Sample one record per object
    Sampling,
    /// Bundled schema first, sampling on a miss
    Composite(&'static str),
}

impl SchemaSource {
    /// Bundled schema document, if any
    pub fn document(&self) -> Option<&'static str> {
        match self {
            Self::Static(doc) | Self::Composite(doc) => Some(doc),
            Self::None | Self::Sampling => None,
        }
    }
}

/// All handlers of one provider
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    /// Error handler for verbs without their own
    pub error_handler: ErrorHandler,
    pub read: Option<HandlerSet<ReadParams, ReadResult>>,
    pub write: Option<HandlerSet<WriteParams, WriteResult>>,
    pub delete: Option<HandlerSet<DeleteParams, DeleteResult>>,
    pub custom_fields: Option<CustomFieldSource>,
    pub schema: SchemaSource,
    pub subscriptions: Option<SubscriptionSpec>,
    /// Read demands a non-empty field set
    pub read_requires_fields: bool,
}

impl HandlerRegistry {
    /// Empty registry using `error_handler` for every verb
    pub fn new(error_handler: ErrorHandler) -> Self {
        Self {
            error_handler,
            read_requires_fields: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn read(mut self, handler: HandlerSet<ReadParams, ReadResult>) -> Self {
        self.read = Some(handler);
        self
    }

    #[must_use]
    pub fn write(mut self, handler: HandlerSet<WriteParams, WriteResult>) -> Self {
        self.write = Some(handler);
        self
    }

    #[must_use]
    pub fn delete(mut self, handler: HandlerSet<DeleteParams, DeleteResult>) -> Self {
        self.delete = Some(handler);
        self
    }

    #[must_use]
    pub fn custom_fields(mut self, source: CustomFieldSource) -> Self {
        self.custom_fields = Some(source);
        self
    }

    #[must_use]
    pub fn schema(mut self, source: SchemaSource) -> Self {
        self.schema = source;
        self
    }

    #[must_use]
    pub fn subscriptions(mut self, spec: SubscriptionSpec) -> Self {
        self.subscriptions = Some(spec);
        self
    }

    /// Allow Read without fields
    #[must_use]
    pub fn read_without_fields(mut self) -> Self {
        self.read_requires_fields = false;
        self
    }

    /// Error handler for a verb handler
    pub fn error_handler_for<'a, P, R>(&'a self, handler: &'a HandlerSet<P, R>) -> &'a ErrorHandler {
        handler.error_handler.as_ref().unwrap_or(&self.error_handler)
    }
}
