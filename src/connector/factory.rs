//! Connector construction

use super::pipeline::RestConnector;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::handlers::ProviderContext;
use crate::http::HttpClientConfig;
use crate::providers;
use crate::resolver::{resolve, ConnectorParams};
use tracing::info;

/// Build a connector for a catalog provider
pub fn new_connector(
    catalog: &Catalog,
    provider: &str,
    params: ConnectorParams,
) -> Result<RestConnector> {
    new_connector_with_config(catalog, provider, params, HttpClientConfig::default())
}

/// Build a connector with explicit HTTP settings (timeout, rate limit, headers)
pub fn new_connector_with_config(
    catalog: &Catalog,
    provider: &str,
    params: ConnectorParams,
    config: HttpClientConfig,
) -> Result<RestConnector> {
    let resolved = resolve(catalog, provider, params)?;
    let handlers = providers::registry_for(&ProviderContext::from_resolved(&resolved));

    info!(
        provider = %resolved.entry.name,
        module = %resolved.module_id,
        "Created connector"
    );
    RestConnector::new(resolved, handlers, config)
}
