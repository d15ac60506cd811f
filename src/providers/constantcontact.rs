//! Constant Contact V3
//!
//! Lists paginate with a `_links.next.href` path that is relative to the API
//! origin. The full URL becomes the next page token and is requested as-is.

use crate::connector::{
    delete_result, write_result, DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams,
    WriteResult,
};
use crate::customfields::{
    custom_field_key, CustomFieldDefinition, CustomFieldSource, DefinitionPage, RecordLayout,
};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, HandlerSet, ObjectSet, ProviderContext, SchemaSource};
use crate::http::{Request, Response};
use crate::interpreter::descriptors::join_messages;
use crate::interpreter::{
    default_switch, ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate,
};
use crate::pagination::{
    extract_string, NextUrlPaginator, ReadParser, RecordLocator, RecordTransformer, TimeWindow,
};
use crate::schema::ValueType;
use crate::types::TimeFormat;
use crate::urlbuilder::UrlBuilder;
use serde::Deserialize;

/// Page size used when the caller gives none
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Static description of a Constant Contact object
struct ObjectInfo {
    name: &'static str,
    path: &'static str,
    records_key: &'static str,
    id_field: &'static str,
    /// Accepts `updated_after`/`updated_before`
    incremental: bool,
}

const OBJECT_INFO: &[ObjectInfo] = &[
    ObjectInfo {
        name: "contacts",
        path: "contacts",
        records_key: "contacts",
        id_field: "contact_id",
        incremental: true,
    },
    ObjectInfo {
        name: "lists",
        path: "contact_lists",
        records_key: "lists",
        id_field: "list_id",
        incremental: false,
    },
    ObjectInfo {
        name: "segments",
        path: "segments",
        records_key: "segments",
        id_field: "segment_id",
        incremental: false,
    },
    ObjectInfo {
        name: "email_campaigns",
        path: "emails",
        records_key: "campaigns",
        id_field: "campaign_id",
        incremental: false,
    },
    ObjectInfo {
        name: "contact_tags",
        path: "contact_tags",
        records_key: "tags",
        id_field: "tag_id",
        incremental: false,
    },
    ObjectInfo {
        name: "contact_custom_fields",
        path: "contact_custom_fields",
        records_key: "custom_fields",
        id_field: "custom_field_id",
        incremental: false,
    },
];

const READ_OBJECTS: &[&str] = &[
    "contacts",
    "lists",
    "segments",
    "email_campaigns",
    "contact_tags",
    "contact_custom_fields",
];

const WRITE_OBJECTS: &[&str] = &["contacts", "lists", "contact_tags", "contact_custom_fields"];

const CUSTOM_FIELD_OBJECTS: &[&str] = &["contacts"];

/// Handlers for Constant Contact
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(error_handler())
        .read(HandlerSet::new(build_read, parse_read).only(READ_OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(WRITE_OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(WRITE_OBJECTS))
        .custom_fields(CustomFieldSource::new(
            ObjectSet::Only(CUSTOM_FIELD_OBJECTS),
            build_definitions,
            parse_definitions,
            RecordLayout::IdValueArray {
                array_key: "custom_fields",
                id_key: "custom_field_id",
                value_key: "value",
            },
        ))
        .schema(SchemaSource::Sampling)
}

fn info(object: &str) -> Result<&'static ObjectInfo> {
    OBJECT_INFO
        .iter()
        .find(|i| i.name == object)
        .ok_or_else(|| Error::object_not_supported(object))
}

/// A next page token is a full URL; cursors keep their `=` padding
fn next_page_url(token: &str) -> Result<String> {
    Ok(UrlBuilder::new(token)?
        .with_encoding_exception("%3D", "=")
        .to_string())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_key: String,
    #[serde(default)]
    error_message: String,
}

/// `[{"error_key": "...", "error_message": "..."}]`
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct ApiErrors(Vec<ApiError>);

impl ErrorDescriptor for ApiErrors {
    fn combine(&self, base: Error) -> Error {
        let messages = self.0.iter().map(|e| {
            if e.error_message.is_empty() {
                e.error_key.as_str()
            } else {
                e.error_message.as_str()
            }
        });
        base.with_message(join_messages(messages, "; "))
    }
}

fn error_handler() -> ErrorHandler {
    let mut templates = vec![FormatTemplate::new::<ApiErrors>(&["error_key", "error_message"])];
    templates.extend(default_switch().templates().iter().copied());
    ErrorHandler::new(FormatSwitch::new(templates))
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    if !params.next_page.is_empty() {
        return Ok(Request::get(next_page_url(&params.next_page)?));
    }

    let object = info(&params.object_name)?;
    let mut url = ctx
        .url(&[object.path])?
        .with_query_param("limit", params.page_size_or(DEFAULT_PAGE_SIZE).to_string());

    if CUSTOM_FIELD_OBJECTS.contains(&object.name) {
        url = url.with_query_param("include", "custom_fields");
    }
    if object.incremental {
        let window = TimeWindow::from_params(params);
        url = url
            .with_optional_query_param("updated_after", window.since_as(TimeFormat::Rfc3339))
            .with_optional_query_param("updated_before", window.until_as(TimeFormat::Rfc3339));
    }

    Ok(Request::get(url.to_string()))
}

fn parse_read(
    ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    let object = info(&params.object_name)?;
    ReadParser::new(
        RecordLocator::optional(object.records_key),
        NextUrlPaginator::new("_links.next.href").with_base_url(ctx.base_url.clone()),
    )
    .with_transformer(RecordTransformer::new().id_field(object.id_field))
    .parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    let object = info(&params.object_name)?;
    Ok(match params.update_id() {
        Some(id) => Request::put(
            ctx.url(&[object.path, id])?.to_string(),
            params.record_data.clone(),
        ),
        None => Request::post(ctx.url(&[object.path])?.to_string(), params.record_data.clone()),
    })
}

fn parse_write(
    _ctx: &ProviderContext,
    params: &WriteParams,
    _request: &Request,
    response: &Response,
) -> Result<WriteResult> {
    let object = info(&params.object_name)?;
    write_result(response, "", object.id_field, params.update_id())
}

fn build_delete(ctx: &ProviderContext, params: &DeleteParams) -> Result<Request> {
    let object = info(&params.object_name)?;
    Ok(Request::delete(
        ctx.url(&[object.path, params.record_id.as_str()])?.to_string(),
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
struct DefinitionList {
    #[serde(default)]
    custom_fields: Vec<Definition>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    custom_field_id: String,
    #[serde(default)]
    label: String,
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
}

fn value_type(field_type: &str) -> ValueType {
    match field_type {
        "date" => ValueType::DateTime,
        "number" | "currency" => ValueType::Float,
        "boolean" => ValueType::Boolean,
        "single_select" => ValueType::SingleSelect,
        "multi_select" => ValueType::MultiSelect,
        _ => ValueType::String,
    }
}

fn build_definitions(ctx: &ProviderContext, _object: &str, page: &str) -> Result<Request> {
    if !page.is_empty() {
        return Ok(Request::get(next_page_url(page)?));
    }
    let url = ctx
        .url(&["contact_custom_fields"])?
        .with_query_param("limit", "100");
    Ok(Request::get(url.to_string()))
}

fn parse_definitions(
    ctx: &ProviderContext,
    _object: &str,
    response: &Response,
) -> Result<DefinitionPage> {
    let body = response.require_body()?;
    let list: DefinitionList = serde_json::from_value(body.clone())?;

    let definitions = list
        .custom_fields
        .into_iter()
        .map(|d| CustomFieldDefinition {
            key: custom_field_key(&d.name),
            name: if d.label.is_empty() { d.name } else { d.label },
            value_type: value_type(&d.field_type),
            provider_type: d.field_type,
            id: d.custom_field_id,
            ..Default::default()
        })
        .collect();

    let next_page = extract_string(body, "_links.next.href")
        .map(|href| format!("{}{}", ctx.base_url.trim_end_matches('/'), href))
        .unwrap_or_default();

    Ok(DefinitionPage {
        definitions,
        next_page,
    })
}
