//! Custom field enrichment of metadata and read results

use super::types::{CustomFieldRegistry, CustomFieldSource};
use crate::connector::ReadResultRow;
use crate::error::{Error, Result};
use crate::handlers::ProviderContext;
use crate::http::HttpClient;
use crate::interpreter::ErrorHandler;
use crate::pagination::project;
use crate::schema::ObjectMetadata;
use std::collections::BTreeSet;
use tracing::debug;

/// Fetch every definition that applies to `object`, following pages to the end
pub async fn fetch_registry(
    client: &HttpClient,
    ctx: &ProviderContext,
    source: &CustomFieldSource,
    object: &str,
    errors: &ErrorHandler,
) -> Result<CustomFieldRegistry> {
    let errors = source.error_handler.as_ref().unwrap_or(errors);
    let mut registry = CustomFieldRegistry::new();
    let mut token = String::new();

    loop {
        let request = (source.build_request)(ctx, object, &token).map_err(|e| resolving(object, e))?;
        let response = client
            .execute_with(&request, errors)
            .await
            .map_err(|e| resolving(object, e))?;
        let page = (source.parse_page)(ctx, object, &response).map_err(|e| resolving(object, e))?;

        let fetched = page.definitions.len();
        page.definitions
            .into_iter()
            .filter(|d| d.applies_to(object))
            .for_each(|d| registry.insert(d));

        if fetched == 0 || page.next_page.is_empty() || page.next_page == token {
            break;
        }
        token = page.next_page;
    }

    debug!(
        "Resolved {} custom fields for {}/{}",
        registry.len(),
        ctx.provider,
        object
    );
    Ok(registry)
}

fn resolving(object: &str, error: Error) -> Error {
    Error::custom_fields(format!("custom fields of '{object}': {error}"))
}

/// Append custom fields to an object's metadata
pub fn enhance_metadata(metadata: &mut ObjectMetadata, registry: &CustomFieldRegistry) {
    for definition in registry.definitions() {
        metadata.add_field(definition.key.clone(), definition.to_field_metadata());
    }
}

/// Collapse custom values into each row and re-project the requested fields
pub fn enhance_rows(
    rows: &mut [ReadResultRow],
    source: &CustomFieldSource,
    registry: &CustomFieldRegistry,
    fields: &BTreeSet<String>,
) {
    for row in rows.iter_mut() {
        if !source.layout.has_custom_section(&row.raw) {
            continue;
        }
        source.layout.collapse(&mut row.raw, registry);
        row.fields = project(&row.raw, fields);
    }
}

/// Whether any row needs enrichment
pub fn needs_enrichment(rows: &[ReadResultRow], source: &CustomFieldSource) -> bool {
    rows.iter().any(|r| source.layout.has_custom_section(&r.raw))
}
