//! Atlassian Jira
//!
//! Issues are read through the enhanced JQL search (`POST search/jql`) with a
//! relative-minutes window on `updated`, paginated by `nextPageToken` until
//! `isLast`. Issue fields are flattened next to the issue id. The same
//! handlers serve OAuth2 (`api.atlassian.com/ex/jira/{cloudId}`) and
//! Atlassian Connect (`{workspace}.atlassian.net`) installations.

use crate::connector::{
    delete_result, write_result, DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams,
    WriteResult,
};
use crate::customfields::{
    custom_field_key, CustomFieldDefinition, CustomFieldSource, DefinitionPage, RecordLayout,
};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, HandlerSet, ObjectSet, ProviderContext, SchemaSource};
use crate::http::{HttpClient, Request, Response};
use crate::interpreter::descriptors::{field_errors, join_messages, FieldErrorMap};
use crate::interpreter::{
    default_switch, ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate,
};
use crate::pagination::{
    jql_window, CursorPaginator, ReadParser, RecordLocator, RecordTransformer, StopCondition,
    TimeWindow,
};
use crate::resolver::keys;
use crate::schema::ValueType;
use crate::urlbuilder::UrlBuilder;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

const OBJECTS: &[&str] = &["issues"];

/// Largest page the search endpoint returns
pub const MAX_RESULTS: usize = 200;

/// Handlers for Jira
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(error_handler())
        .read(HandlerSet::new(build_read, parse_read).only(OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(OBJECTS))
        .custom_fields(CustomFieldSource::new(
            ObjectSet::Only(OBJECTS),
            build_fields,
            parse_fields,
            RecordLayout::PrefixedKeys {
                prefix: "customfield_",
            },
        ))
        .schema(SchemaSource::Sampling)
}

// ============================================================================
// Errors
// ============================================================================

/// `{"errorMessages": ["..."], "errors": {"field": "reason"}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraError {
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

impl ErrorDescriptor for JiraError {
    fn combine(&self, base: Error) -> Error {
        let mut messages = self.error_messages.clone();
        messages.extend(field_errors(&self.errors));
        base.with_message(join_messages(messages, "; "))
    }
}

fn error_handler() -> ErrorHandler {
    let mut templates = vec![
        FormatTemplate::new::<JiraError>(&["errorMessages"]),
        FormatTemplate::new::<FieldErrorMap>(&["errors"]),
    ];
    templates.extend(default_switch().templates().iter().copied());
    ErrorHandler::new(FormatSwitch::new(templates)).with_html_fallback()
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    let url = ctx.url(&["search", "jql"])?;

    let mut body = json!({
        "jql": jql_window(&TimeWindow::from_params(params), Utc::now()),
        "maxResults": params.page_size_or(MAX_RESULTS).min(MAX_RESULTS),
        "fields": ["*all"],
    });
    if !params.next_page.is_empty() {
        body["nextPageToken"] = Value::String(params.next_page.clone());
    }

    Ok(Request::post(url.to_string(), body))
}

fn parse_read(
    _ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    ReadParser::new(
        RecordLocator::path("issues"),
        CursorPaginator::new("nextPageToken").with_stop_condition(StopCondition::field("isLast", true)),
    )
    .with_transformer(RecordTransformer::new().flatten("fields").id_field("id"))
    .parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    Ok(match params.update_id() {
        Some(id) => Request::put(ctx.url(&["issue", id])?.to_string(), params.record_data.clone()),
        None => Request::post(ctx.url(&["issue"])?.to_string(), params.record_data.clone()),
    })
}

fn parse_write(
    _ctx: &ProviderContext,
    params: &WriteParams,
    _request: &Request,
    response: &Response,
) -> Result<WriteResult> {
    write_result(response, "", "id", params.update_id())
}

fn build_delete(ctx: &ProviderContext, params: &DeleteParams) -> Result<Request> {
    Ok(Request::delete(
        ctx.url(&["issue", params.record_id.as_str()])?.to_string(),
    ))
}

fn parse_delete(
    _ctx: &ProviderContext,
    _params: &DeleteParams,
    _request: &Request,
    response: &Response,
) -> Result<DeleteResult> {
    delete_result(response)
}

// ============================================================================
// Custom Fields
// ============================================================================

#[derive(Debug, Deserialize)]
struct JiraField {
    id: String,
    name: String,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    schema: Option<JiraFieldSchema>,
}

#[derive(Debug, Deserialize)]
struct JiraFieldSchema {
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    items: Option<String>,
}

fn value_type(schema: Option<&JiraFieldSchema>) -> ValueType {
    let Some(schema) = schema else {
        return ValueType::Other;
    };
    match (schema.field_type.as_str(), schema.items.as_deref()) {
        ("string", _) => ValueType::String,
        ("number", _) => ValueType::Float,
        ("date" | "datetime", _) => ValueType::DateTime,
        ("option", _) => ValueType::SingleSelect,
        ("array", Some("option")) => ValueType::MultiSelect,
        _ => ValueType::Other,
    }
}

fn build_fields(ctx: &ProviderContext, _object: &str, _page: &str) -> Result<Request> {
    Ok(Request::get(ctx.url(&["field"])?.to_string()))
}

fn parse_fields(_ctx: &ProviderContext, _object: &str, response: &Response) -> Result<DefinitionPage> {
    let fields: Vec<JiraField> = serde_json::from_value(response.require_body()?.clone())?;
    let definitions = fields
        .into_iter()
        .filter(|f| f.custom)
        .map(|f| CustomFieldDefinition {
            value_type: value_type(f.schema.as_ref()),
            provider_type: f.schema.as_ref().map(|s| s.field_type.clone()).unwrap_or_default(),
            key: custom_field_key(&f.name),
            id: f.id,
            name: f.name,
            ..Default::default()
        })
        .collect();

    Ok(DefinitionPage {
        definitions,
        next_page: String::new(),
    })
}

// ============================================================================
// Post-authentication
// ============================================================================

#[derive(Debug, Deserialize)]
struct AccessibleResource {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
}

/// Look up the cloud id of a workspace among the sites an OAuth2 token can
/// reach. `base_url` is the provider base (`https://api.atlassian.com`).
pub async fn fetch_cloud_id(client: &HttpClient, base_url: &str, workspace: &str) -> Result<String> {
    let url = UrlBuilder::new(base_url)?.add_path(&["oauth", "token", "accessible-resources"])?;
    let body = client.get(&url.to_string()).await?.ok_or(Error::EmptyResponse)?;
    let resources: Vec<AccessibleResource> = serde_json::from_value(body)?;

    let site = format!("https://{workspace}.atlassian.net");
    let found = resources
        .into_iter()
        .find(|r| r.url.trim_end_matches('/') == site || r.name == workspace)
        .ok_or_else(|| Error::Context {
            message: format!("workspace '{workspace}' is not accessible with this token"),
            source: Box::new(Error::missing_metadata(keys::CLOUD_ID)),
        })?;

    debug!("Resolved cloud id for {}", workspace);
    Ok(found.id)
}
