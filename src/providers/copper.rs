//! Copper CRM
//!
//! Records are listed through `POST {object}/search` with a page number in
//! the body. Every request names the acting user in `X-PW-UserEmail`.
//! Custom values arrive as `{custom_field_definition_id, value}` pairs and
//! are collapsed into `custom_field_<name>` keys.

use crate::connector::{
    delete_result, write_result, DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams,
    WriteResult,
};
use crate::customfields::{
    custom_field_key, CustomFieldDefinition, CustomFieldSource, DefinitionPage, RecordLayout,
};
use crate::error::Result;
use crate::handlers::{HandlerRegistry, HandlerSet, ObjectSet, ProviderContext, SchemaSource};
use crate::http::{Request, Response};
use crate::interpreter::ErrorHandler;
use crate::pagination::{
    numeric_token, PageNumberPaginator, PageSource, ReadParser, RecordLocator, RecordTransformer,
    TimeWindow,
};
use crate::resolver::keys;
use crate::schema::{FieldValue, ValueType};
use crate::types::value_to_string;
use serde::Deserialize;
use serde_json::{json, Value};

const OBJECTS: &[&str] = &[
    "people",
    "companies",
    "leads",
    "opportunities",
    "projects",
    "tasks",
];

/// Largest search page
pub const PAGE_SIZE: usize = 200;

/// Handlers for Copper
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(ErrorHandler::default())
        .read(HandlerSet::new(build_read, parse_read).only(OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(OBJECTS))
        .custom_fields(CustomFieldSource::new(
            ObjectSet::Only(OBJECTS),
            build_definitions,
            parse_definitions,
            RecordLayout::IdValueArray {
                array_key: "custom_fields",
                id_key: "custom_field_definition_id",
                value_key: "value",
            },
        ))
        .schema(SchemaSource::Sampling)
}

/// Attach the headers every Copper call needs
fn with_headers(ctx: &ProviderContext, request: Request) -> Result<Request> {
    let email = ctx.metadata.require(keys::USER_EMAIL)?;
    Ok(request
        .header("X-PW-UserEmail", email)
        .header("X-PW-Application", "developer_api"))
}

/// Copper's singular resource name, as used by `available_on`
fn resource_of(object: &str) -> Option<&'static str> {
    match object {
        "people" => Some("person"),
        "companies" => Some("company"),
        "leads" => Some("lead"),
        "opportunities" => Some("opportunity"),
        "projects" => Some("project"),
        "tasks" => Some("task"),
        _ => None,
    }
}

fn object_of(resource: &str) -> Option<&'static str> {
    OBJECTS
        .iter()
        .copied()
        .find(|object| resource_of(object) == Some(resource))
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    let url = ctx.url(&[params.object_name.as_str(), "search"])?;
    let page_number = numeric_token(&params.next_page, 1)?;
    let window = TimeWindow::from_params(params);

    let mut body = json!({
        "page_size": params.page_size_or(PAGE_SIZE).min(PAGE_SIZE),
        "page_number": page_number,
        "sort_by": "date_modified",
        "sort_direction": "asc",
    });
    if let Some(since) = window.since {
        body["minimum_modified_date"] = json!(since.timestamp());
    }
    if let Some(until) = window.until {
        body["maximum_modified_date"] = json!(until.timestamp());
    }

    with_headers(ctx, Request::post(url.to_string(), body))
}

fn parse_read(
    _ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    let paginator = PageNumberPaginator::new(PageSource::RequestBody("page_number".into()), 1)
        .with_page_size(params.page_size_or(PAGE_SIZE).min(PAGE_SIZE));

    ReadParser::new(RecordLocator::Root, paginator)
        .with_transformer(RecordTransformer::new().id_field("id"))
        .parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    let request = match params.update_id() {
        Some(id) => Request::put(
            ctx.url(&[params.object_name.as_str(), id])?.to_string(),
            params.record_data.clone(),
        ),
        None => Request::post(
            ctx.url(&[params.object_name.as_str()])?.to_string(),
            params.record_data.clone(),
        ),
    };
    with_headers(ctx, request)
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
    let url = ctx.url(&[params.object_name.as_str(), params.record_id.as_str()])?;
    with_headers(ctx, Request::delete(url.to_string()))
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
struct Definition {
    id: Value,
    name: String,
    data_type: String,
    #[serde(default)]
    available_on: Vec<String>,
    #[serde(default)]
    options: Vec<DefinitionOption>,
}

#[derive(Debug, Deserialize)]
struct DefinitionOption {
    id: Value,
    name: String,
}

fn value_type(data_type: &str) -> ValueType {
    match data_type {
        "Dropdown" => ValueType::SingleSelect,
        "MultiSelect" => ValueType::MultiSelect,
        "Checkbox" => ValueType::Boolean,
        "Date" => ValueType::DateTime,
        "Float" | "Currency" | "Percentage" => ValueType::Float,
        _ => ValueType::String,
    }
}

fn build_definitions(ctx: &ProviderContext, _object: &str, _page: &str) -> Result<Request> {
    with_headers(
        ctx,
        Request::get(ctx.url(&["custom_field_definitions"])?.to_string()),
    )
}

fn parse_definitions(
    _ctx: &ProviderContext,
    _object: &str,
    response: &Response,
) -> Result<DefinitionPage> {
    let definitions: Vec<Definition> = serde_json::from_value(response.require_body()?.clone())?;

    let definitions = definitions
        .into_iter()
        .filter_map(|d| {
            let id = value_to_string(&d.id)?;
            let options = d
                .options
                .iter()
                .filter_map(|o| Some(FieldValue::new(value_to_string(&o.id)?, &o.name)))
                .collect();
            Some(CustomFieldDefinition {
                id,
                key: custom_field_key(&d.name),
                value_type: value_type(&d.data_type),
                provider_type: d.data_type,
                objects: d
                    .available_on
                    .iter()
                    .filter_map(|r| object_of(r).map(ToString::to_string))
                    .collect(),
                options,
                name: d.name,
            })
        })
        .collect();

    Ok(DefinitionPage {
        definitions,
        next_page: String::new(),
    })
}
