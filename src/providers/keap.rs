//! Keap (Infusionsoft)
//!
//! Two API generations share one provider. Version 1 pages by offset and
//! filters on `since`/`until`; version 2 pages by token, has no time filter
//! and is read newest-first, so incremental reads are cut client-side on
//! `update_time`.

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
use crate::interpreter::{
    default_switch, ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate,
};
use crate::pagination::{
    numeric_token, CursorPaginator, OffsetPaginator, ReadParser, RecordLocator,
    RecordTransformer, TimeFilter, TimeWindow,
};
use crate::schema::{FieldValue, ValueType};
use crate::types::{value_to_string, TimeFormat};
use serde::Deserialize;
use serde_json::Value;

const OBJECTS: &[&str] = &[
    "contacts",
    "companies",
    "notes",
    "tags",
    "opportunities",
    "tasks",
    "products",
];

const CUSTOM_FIELD_OBJECTS: &[&str] = &["contacts", "companies"];

/// v1 objects accepting `since`/`until`
const V1_INCREMENTAL: &[&str] = &["contacts", "notes", "tasks", "opportunities"];

/// v2 objects carrying `update_time`
const V2_TIMESTAMPED: &[&str] = &["contacts", "companies", "notes", "tasks"];

/// Page size used when the caller gives none
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Handlers for Keap
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(error_handler())
        .read(HandlerSet::new(build_read, parse_read).only(OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(OBJECTS))
        .custom_fields(CustomFieldSource::new(
            ObjectSet::Only(CUSTOM_FIELD_OBJECTS),
            build_model,
            parse_model,
            RecordLayout::IdValueArray {
                array_key: "custom_fields",
                id_key: "id",
                value_key: "content",
            },
        ))
        .schema(SchemaSource::Static(include_str!("../../schemas/keap.json")))
}

fn is_v1(ctx: &ProviderContext) -> bool {
    ctx.module_id == "v1"
}

// ============================================================================
// Errors
// ============================================================================

/// `{"fault": {"faultstring": "...", "detail": {"errorcode": "..."}}}`
#[derive(Debug, Deserialize)]
struct FaultError {
    fault: Fault,
}

#[derive(Debug, Deserialize)]
struct Fault {
    faultstring: String,
    #[serde(default)]
    detail: Option<FaultDetail>,
}

#[derive(Debug, Deserialize)]
struct FaultDetail {
    #[serde(default)]
    errorcode: Option<String>,
}

impl ErrorDescriptor for FaultError {
    fn combine(&self, base: Error) -> Error {
        match self.fault.detail.as_ref().and_then(|d| d.errorcode.as_deref()) {
            Some(code) => base.with_message(format!("{} ({code})", self.fault.faultstring)),
            None => base.with_message(self.fault.faultstring.clone()),
        }
    }
}

fn error_handler() -> ErrorHandler {
    let mut templates = vec![FormatTemplate::new::<FaultError>(&["fault"])];
    templates.extend(default_switch().templates().iter().copied());
    ErrorHandler::new(FormatSwitch::new(templates)).with_html_fallback()
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    let size = params.page_size_or(DEFAULT_PAGE_SIZE).to_string();
    let mut url = ctx.url(&[params.object_name.as_str()])?;

    if is_v1(ctx) {
        url = url
            .with_query_param("limit", size)
            .with_query_param("offset", numeric_token(&params.next_page, 0)?.to_string());
        if V1_INCREMENTAL.contains(&params.object_name.as_str()) {
            let window = TimeWindow::from_params(params);
            url = url
                .with_optional_query_param("since", window.since_as(TimeFormat::Rfc3339))
                .with_optional_query_param("until", window.until_as(TimeFormat::Rfc3339));
        }
    } else {
        url = url.with_query_param("page_size", size);
        if !params.next_page.is_empty() {
            url = url.with_query_param("page_token", params.next_page.clone());
        }
        if V2_TIMESTAMPED.contains(&params.object_name.as_str()) {
            url = url.with_query_param("order_by", "update_time desc");
        }
    }

    Ok(Request::get(url.to_string()))
}

fn parse_read(
    ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    let records = RecordLocator::optional(params.object_name.clone());
    let transformer = RecordTransformer::new().id_field("id");

    if is_v1(ctx) {
        let limit = params.page_size_or(DEFAULT_PAGE_SIZE);
        return ReadParser::new(records, OffsetPaginator::new("offset", limit).with_total_path("count"))
            .with_transformer(transformer)
            .parse(params, request, response);
    }

    let mut parser =
        ReadParser::new(records, CursorPaginator::new("next_page_token")).with_transformer(transformer);
    if V2_TIMESTAMPED.contains(&params.object_name.as_str()) {
        parser = parser.with_time_filter(TimeFilter::new("update_time").descending());
    }
    parser.parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

/// v1 replaces tasks wholesale; everything else is patched
fn update_request(ctx: &ProviderContext, object: &str, url: String, body: Value) -> Request {
    if is_v1(ctx) && object == "tasks" {
        Request::put(url, body)
    } else {
        Request::patch(url, body)
    }
}

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    let object = params.object_name.as_str();
    Ok(match params.update_id() {
        Some(id) => update_request(
            ctx,
            object,
            ctx.url(&[object, id])?.to_string(),
            params.record_data.clone(),
        ),
        None => Request::post(ctx.url(&[object])?.to_string(), params.record_data.clone()),
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
        ctx.url(&[params.object_name.as_str(), params.record_id.as_str()])?
            .to_string(),
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

/// `GET {object}/model`
#[derive(Debug, Deserialize)]
struct Model {
    #[serde(default)]
    custom_fields: Vec<ModelField>,
}

#[derive(Debug, Deserialize)]
struct ModelField {
    id: Value,
    label: String,
    field_type: String,
    #[serde(default)]
    options: Vec<ModelOption>,
}

#[derive(Debug, Deserialize)]
struct ModelOption {
    id: Value,
    label: String,
}

fn value_type(field_type: &str) -> ValueType {
    match field_type.to_ascii_uppercase().as_str() {
        "DROPDOWN" | "RADIO" => ValueType::SingleSelect,
        "LISTBOX" => ValueType::MultiSelect,
        "YESNO" => ValueType::Boolean,
        "WHOLENUMBER" => ValueType::Int,
        "DECIMALNUMBER" | "CURRENCY" | "PERCENT" => ValueType::Float,
        "DATE" | "DATETIME" => ValueType::DateTime,
        _ => ValueType::String,
    }
}

fn build_model(ctx: &ProviderContext, object: &str, _page: &str) -> Result<Request> {
    Ok(Request::get(ctx.url(&[object, "model"])?.to_string()))
}

fn parse_model(_ctx: &ProviderContext, object: &str, response: &Response) -> Result<DefinitionPage> {
    let model: Model = serde_json::from_value(response.require_body()?.clone())?;

    let definitions = model
        .custom_fields
        .into_iter()
        .filter_map(|f| {
            Some(CustomFieldDefinition {
                id: value_to_string(&f.id)?,
                key: custom_field_key(&f.label),
                value_type: value_type(&f.field_type),
                provider_type: f.field_type,
                objects: vec![object.to_string()],
                options: f
                    .options
                    .iter()
                    .filter_map(|o| Some(FieldValue::new(value_to_string(&o.id)?, &o.label)))
                    .collect(),
                name: f.label,
            })
        })
        .collect();

    Ok(DefinitionPage {
        definitions,
        next_page: String::new(),
    })
}
