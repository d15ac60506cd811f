//! Verb pipeline
//!
//! Every verb runs the same steps:
//!
//! ```text
//! validate(params)
//!   → handler = registry[verb] (supports object?)
//!   → request = handler.build_request(ctx, params)
//!   → response = http.execute_with(request, handler.error_handler)
//!   → handler.parse_response(ctx, params, request, response)
//! ```
//!
//! Read additionally collapses custom fields, and metadata is answered from
//! the provider's schema source plus its custom fields.

use super::types::{
    DeleteParams, DeleteResult, ReadParams, ReadResult, VerifyParams, WebhookRequest,
    WriteParams, WriteResult,
};
use crate::catalog::ProviderEntry;
use crate::customfields::{
    enhance_metadata, enhance_rows, fetch_registry, needs_enrichment, CustomFieldRegistry,
};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, HandlerSet, ProviderContext, SchemaSource};
use crate::http::{HttpClient, HttpClientConfig};
use crate::resolver::ResolvedProvider;
use crate::schema::{infer_metadata, ListObjectMetadataResult, ObjectMetadata, StaticSchemas};
use crate::subscription::{self, SubscribeParams, SubscriptionResult, SubscriptionSpec};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Connector Trait
// ============================================================================

/// Caller-facing verbs of a provider connector
#[async_trait]
pub trait Connector: Send + Sync {
    /// Provider name
    fn provider(&self) -> &str;

    /// Read one page of records
    async fn read(&self, params: ReadParams) -> Result<ReadResult>;

    /// Create a record, or update it when a record id is given
    async fn write(&self, params: WriteParams) -> Result<WriteResult>;

    /// Delete a record
    async fn delete(&self, params: DeleteParams) -> Result<DeleteResult>;

    /// Describe objects; per-object failures land in `errors`
    async fn list_object_metadata(&self, objects: &[String]) -> Result<ListObjectMetadataResult>;

    /// Register webhooks for the requested events
    async fn subscribe(&self, params: SubscribeParams) -> Result<SubscriptionResult>;

    /// Remove the webhooks of a previous subscribe
    async fn delete_subscription(&self, result: &SubscriptionResult) -> Result<()>;

    /// Check the signature of an inbound delivery
    async fn verify_webhook_message(
        &self,
        request: &WebhookRequest,
        params: &VerifyParams,
    ) -> Result<bool>;
}

// ============================================================================
// REST Connector
// ============================================================================

/// Connector driven by a provider's handler registry
pub struct RestConnector {
    entry: Arc<ProviderEntry>,
    context: ProviderContext,
    client: HttpClient,
    handlers: HandlerRegistry,
    static_schemas: Option<StaticSchemas>,
}

impl RestConnector {
    /// Build a connector for a resolved provider
    pub fn new(
        resolved: ResolvedProvider,
        handlers: HandlerRegistry,
        config: HttpClientConfig,
    ) -> Result<Self> {
        let context = ProviderContext::from_resolved(&resolved);
        let mut config = config;
        config.base_url = Some(context.module_url.clone());

        let client = match resolved.transport {
            Some(transport) => HttpClient::with_transport(transport, config, resolved.auth),
            None => HttpClient::with_auth(config, resolved.auth)?,
        }
        .with_error_handler(handlers.error_handler.clone());

        let static_schemas = handlers
            .schema
            .document()
            .map(StaticSchemas::from_json)
            .transpose()?;

        Ok(Self {
            entry: resolved.entry,
            context,
            client,
            handlers,
            static_schemas,
        })
    }

    /// Send every request to another origin, keeping module paths
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.context.rebase(base_url);
        self.client.set_base_url(self.context.module_url.clone());
        self
    }

    /// Catalog entry
    pub fn entry(&self) -> &ProviderEntry {
        &self.entry
    }

    /// Resolved provider context
    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    /// Handler registry
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// HTTP client
    pub fn http_client(&self) -> &HttpClient {
        &self.client
    }

    fn handler<'a, P, R>(
        slot: &'a Option<HandlerSet<P, R>>,
        operation: &str,
        object: &str,
    ) -> Result<&'a HandlerSet<P, R>> {
        slot.as_ref()
            .filter(|h| h.supports(object))
            .ok_or_else(|| Error::operation_not_supported(operation, object))
    }

    fn subscriptions(&self, objects: &str) -> Result<&SubscriptionSpec> {
        self.handlers
            .subscriptions
            .as_ref()
            .ok_or_else(|| Error::operation_not_supported("subscribe", objects))
    }

    async fn run_read(&self, params: &ReadParams, enrich: bool) -> Result<ReadResult> {
        let handler = Self::handler(&self.handlers.read, "read", &params.object_name)?;
        let request = (handler.build_request)(&self.context, params)?;
        let response = self
            .client
            .execute_with(&request, self.handlers.error_handler_for(handler))
            .await?;
        let mut result = (handler.parse_response)(&self.context, params, &request, &response)?;

        if !enrich {
            return Ok(result);
        }
        if let Some(source) = &self.handlers.custom_fields {
            if source.supports(&params.object_name) && needs_enrichment(&result.data, source) {
                let registry = if source.layout.needs_registry() {
                    fetch_registry(
                        &self.client,
                        &self.context,
                        source,
                        &params.object_name,
                        &self.handlers.error_handler,
                    )
                    .await?
                } else {
                    CustomFieldRegistry::new()
                };
                enhance_rows(&mut result.data, source, &registry, &params.fields);
            }
        }

        debug!(
            "Read {} {} rows from {}, done={}",
            result.rows, params.object_name, self.context.provider, result.done
        );
        Ok(result)
    }

    async fn sample(&self, object: &str) -> Result<ObjectMetadata> {
        let params = ReadParams {
            object_name: object.to_string(),
            page_size: Some(1),
            ..Default::default()
        };
        let result = self.run_read(&params, false).await.map_err(|e| {
            if e.is(crate::error::ErrorKind::OperationNotSupportedForObject) {
                Error::object_not_supported(object)
            } else {
                e
            }
        })?;
        let records: Vec<_> = result.data.into_iter().map(|r| r.raw).collect();
        Ok(infer_metadata(object, &records))
    }

    async fn object_metadata(&self, object: &str) -> Result<ObjectMetadata> {
        let schemas = self.static_schemas.as_ref();
        let mut metadata = match self.handlers.schema {
            SchemaSource::None => {
                return Err(Error::operation_not_supported("listObjectMetadata", object))
            }
            SchemaSource::Static(_) => schemas
                .map(|s| s.lookup(object))
                .unwrap_or_else(|| Err(Error::object_not_supported(object)))?,
            SchemaSource::Sampling => self.sample(object).await?,
            SchemaSource::Composite(_) => match schemas.and_then(|s| s.get(object)) {
                Some(found) => found.clone(),
                None => self.sample(object).await?,
            },
        };

        if let Some(source) = &self.handlers.custom_fields {
            if source.supports(object) {
                let registry = fetch_registry(
                    &self.client,
                    &self.context,
                    source,
                    object,
                    &self.handlers.error_handler,
                )
                .await?;
                enhance_metadata(&mut metadata, &registry);
            }
        }

        Ok(metadata)
    }
}

impl std::fmt::Debug for RestConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConnector")
            .field("provider", &self.context.provider)
            .field("module", &self.context.module_id)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for RestConnector {
    fn provider(&self) -> &str {
        &self.context.provider
    }

    async fn read(&self, params: ReadParams) -> Result<ReadResult> {
        params.validate(self.handlers.read_requires_fields)?;
        self.run_read(&params, true).await
    }

    async fn write(&self, params: WriteParams) -> Result<WriteResult> {
        params.validate()?;
        let handler = Self::handler(&self.handlers.write, "write", &params.object_name)?;
        let request = (handler.build_request)(&self.context, &params)?;
        let response = self
            .client
            .execute_with(&request, self.handlers.error_handler_for(handler))
            .await?;
        (handler.parse_response)(&self.context, &params, &request, &response)
    }

    async fn delete(&self, params: DeleteParams) -> Result<DeleteResult> {
        params.validate()?;
        let handler = Self::handler(&self.handlers.delete, "delete", &params.object_name)?;
        let request = (handler.build_request)(&self.context, &params)?;
        let response = self
            .client
            .execute_with(&request, self.handlers.error_handler_for(handler))
            .await?;
        (handler.parse_response)(&self.context, &params, &request, &response)
    }

    async fn list_object_metadata(&self, objects: &[String]) -> Result<ListObjectMetadataResult> {
        if objects.is_empty() {
            return Err(Error::MissingObjects);
        }

        let outcomes = join_all(objects.iter().map(|object| self.object_metadata(object))).await;

        let mut result = ListObjectMetadataResult::new();
        for (object, outcome) in objects.iter().zip(outcomes) {
            match outcome {
                Ok(metadata) => result.insert(object.clone(), metadata),
                Err(e) => {
                    debug!("No metadata for {}/{}: {}", self.context.provider, object, e);
                    result.fail(object.clone(), e);
                }
            }
        }
        Ok(result)
    }

    async fn subscribe(&self, params: SubscribeParams) -> Result<SubscriptionResult> {
        let objects = params
            .subscription_events
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(",");
        let spec = self.subscriptions(&objects)?;
        subscription::subscribe(
            &self.client,
            &self.context,
            spec,
            &self.handlers.error_handler,
            &params,
        )
        .await
    }

    async fn delete_subscription(&self, result: &SubscriptionResult) -> Result<()> {
        let objects = result
            .object_events
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(",");
        let spec = self.subscriptions(&objects)?;
        subscription::delete_subscription(
            &self.client,
            &self.context,
            spec,
            &self.handlers.error_handler,
            result,
        )
        .await
    }

    async fn verify_webhook_message(
        &self,
        request: &WebhookRequest,
        params: &VerifyParams,
    ) -> Result<bool> {
        let spec = self.subscriptions("webhook")?;
        subscription::verify_signature(
            &request.headers,
            spec.signature_header,
            &request.body,
            &params.secret,
        )
    }
}
