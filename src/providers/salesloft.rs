//! Salesloft v2
//!
//! Lists page by number and report the next page in
//! `metadata.paging.next_page`. Custom values sit under `custom_fields`
//! keyed by field name. Webhook subscriptions are one per event type and
//! sign deliveries with the subscription's callback token.

use crate::connector::{
    delete_result, write_result, DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams,
    WriteResult,
};
use crate::customfields::{CustomFieldDefinition, CustomFieldSource, DefinitionPage, RecordLayout};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, HandlerSet, ObjectSet, ProviderContext, SchemaSource};
use crate::http::{Request, Response};
use crate::interpreter::descriptors::join_messages;
use crate::interpreter::{
    default_switch, ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate,
};
use crate::pagination::{
    extract_string, numeric_token, PageNumberPaginator, PageSource, ReadParser, RecordLocator,
    RecordTransformer, TimeWindow,
};
use crate::schema::ValueType;
use crate::subscription::{
    EventMapping, EventTarget, SubscribeParams, SubscriptionSpec, WebhookRegistration,
};
use crate::types::{value_to_string, TimeFormat};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Largest page Salesloft returns
pub const MAX_PER_PAGE: usize = 100;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "X-Salesloft-Signature";

const READ_OBJECTS: &[&str] = &[
    "people",
    "accounts",
    "cadences",
    "cadence_memberships",
    "calls",
    "notes",
    "steps",
    "tasks",
    "users",
];

const WRITE_OBJECTS: &[&str] = &["people", "accounts", "cadences", "notes", "tasks"];

const DELETE_OBJECTS: &[&str] = &["people", "accounts", "notes", "tasks"];

const CUSTOM_FIELD_OBJECTS: &[&str] = &["people", "accounts"];

const EVENTS: &[EventMapping] = &[
    ("accounts", "create", &["account_created"]),
    ("accounts", "update", &["account_updated"]),
    ("accounts", "delete", &["account_deleted"]),
    ("cadences", "create", &["cadence_created"]),
    ("cadences", "update", &["cadence_updated"]),
    ("cadences", "delete", &["cadence_deleted"]),
    ("calls", "create", &["call_created"]),
    ("calls", "update", &["call_updated"]),
    ("notes", "create", &["note_created"]),
    ("notes", "update", &["note_updated"]),
    ("notes", "delete", &["note_deleted"]),
    ("people", "create", &["person_created"]),
    ("people", "update", &["person_updated"]),
    ("people", "delete", &["person_deleted"]),
    ("steps", "create", &["step_created"]),
    ("steps", "update", &["step_updated"]),
    ("steps", "delete", &["step_deleted"]),
    ("tasks", "create", &["task_created"]),
    ("tasks", "update", &["task_completed", "task_updated"]),
    ("tasks", "delete", &["task_deleted"]),
    ("users", "update", &["user_updated"]),
];

/// Handlers for Salesloft
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(error_handler())
        .read(HandlerSet::new(build_read, parse_read).only(READ_OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(WRITE_OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(DELETE_OBJECTS))
        .custom_fields(CustomFieldSource::new(
            ObjectSet::Only(CUSTOM_FIELD_OBJECTS),
            build_definitions,
            parse_definitions,
            RecordLayout::NamedObject {
                object_key: "custom_fields",
            },
        ))
        .schema(SchemaSource::Sampling)
        .subscriptions(SubscriptionSpec {
            events: EVENTS,
            build_create,
            parse_create,
            build_delete: build_unsubscribe,
            signature_header: SIGNATURE_HEADER,
            max_concurrency: 4,
        })
}

// ============================================================================
// Errors
// ============================================================================

/// `{"status": 422, "error": "Unprocessable Entity", "errors": {"field": ["reason"]}}`
#[derive(Debug, Deserialize)]
struct SalesloftError {
    error: String,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

impl ErrorDescriptor for SalesloftError {
    fn combine(&self, base: Error) -> Error {
        let mut parts = vec![self.error.clone()];
        for (field, reasons) in &self.errors {
            parts.push(format!("{field}:{}", reasons.join(", ")));
        }
        base.with_message(join_messages(parts, "; "))
    }
}

fn error_handler() -> ErrorHandler {
    let mut templates = vec![FormatTemplate::new::<SalesloftError>(&["error", "errors"])];
    templates.extend(default_switch().templates().iter().copied());
    templates.push(FormatTemplate::new::<SalesloftError>(&["error"]));
    ErrorHandler::new(FormatSwitch::new(templates))
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    let window = TimeWindow::from_params(params);
    let page = numeric_token(&params.next_page, 1)?;

    let url = ctx
        .url(&[params.object_name.as_str()])?
        .with_query_param("per_page", params.page_size_or(MAX_PER_PAGE).min(MAX_PER_PAGE).to_string())
        .with_query_param("page", page.to_string())
        .with_query_param("sort_by", "updated_at")
        .with_query_param("sort_direction", "ASC")
        .with_optional_query_param("updated_at[gte]", window.since_as(TimeFormat::Rfc3339))
        .with_optional_query_param("updated_at[lt]", window.until_as(TimeFormat::Rfc3339));

    Ok(Request::get(url.to_string()))
}

fn parse_read(
    _ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    ReadParser::new(
        RecordLocator::path("data"),
        PageNumberPaginator::new(
            PageSource::ResponseField("metadata.paging.next_page".into()),
            1,
        ),
    )
    .with_transformer(RecordTransformer::new().id_field("id"))
    .parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    let object = params.object_name.as_str();
    Ok(match params.update_id() {
        Some(id) => Request::put(ctx.url(&[object, id])?.to_string(), params.record_data.clone()),
        None => Request::post(ctx.url(&[object])?.to_string(), params.record_data.clone()),
    })
}

fn parse_write(
    _ctx: &ProviderContext,
    params: &WriteParams,
    _request: &Request,
    response: &Response,
) -> Result<WriteResult> {
    write_result(response, "data", "id", params.update_id())
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

#[derive(Debug, Deserialize)]
struct Definition {
    id: Value,
    name: String,
    #[serde(default)]
    field_type: String,
    #[serde(default)]
    value_type: String,
}

fn field_type_of(object: &str) -> &'static str {
    match object {
        "accounts" => "company",
        _ => "person",
    }
}

fn build_definitions(ctx: &ProviderContext, object: &str, page: &str) -> Result<Request> {
    let url = ctx
        .url(&["custom_fields"])?
        .with_query_param("field_type", field_type_of(object))
        .with_query_param("per_page", MAX_PER_PAGE.to_string())
        .with_query_param("page", if page.is_empty() { "1" } else { page });
    Ok(Request::get(url.to_string()))
}

fn parse_definitions(
    _ctx: &ProviderContext,
    object: &str,
    response: &Response,
) -> Result<DefinitionPage> {
    let body = response.require_body()?;
    let definitions: Vec<Definition> =
        serde_json::from_value(body.get("data").cloned().unwrap_or(Value::Array(Vec::new())))?;

    let definitions = definitions
        .into_iter()
        .filter_map(|d| {
            Some(CustomFieldDefinition {
                id: value_to_string(&d.id)?,
                key: d.name.clone(),
                value_type: match d.value_type.as_str() {
                    "date" => ValueType::DateTime,
                    _ => ValueType::String,
                },
                provider_type: d.field_type,
                objects: vec![object.to_string()],
                name: d.name,
                ..Default::default()
            })
        })
        .collect();

    Ok(DefinitionPage {
        definitions,
        next_page: extract_string(body, "metadata.paging.next_page").unwrap_or_default(),
    })
}

// ============================================================================
// Webhooks
// ============================================================================

fn build_create(
    ctx: &ProviderContext,
    params: &SubscribeParams,
    target: &EventTarget,
) -> Result<Request> {
    Ok(Request::post(
        ctx.url(&["webhook_subscriptions"])?.to_string(),
        json!({
            "callback_url": params.webhook_endpoint,
            "callback_token": params.secret,
            "event_type": target.event,
        }),
    ))
}

fn parse_create(
    _ctx: &ProviderContext,
    target: &EventTarget,
    response: &Response,
) -> Result<WebhookRegistration> {
    let body = response.require_body()?;
    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::unmarshal("webhook subscription response has no data"))?;
    let id = data
        .get("id")
        .and_then(value_to_string)
        .ok_or_else(|| Error::unmarshal("webhook subscription response has no id"))?;

    let mut extra = data.clone();
    for key in ["id", "callback_url", "event_type", "enabled"] {
        extra.remove(key);
    }

    Ok(WebhookRegistration {
        id,
        object: target.object.clone(),
        event_type: target.event.clone(),
        callback_url: data
            .get("callback_url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        enabled: data.get("enabled").and_then(Value::as_bool).unwrap_or(true),
        extra,
    })
}

fn build_unsubscribe(ctx: &ProviderContext, registration: &WebhookRegistration) -> Result<Request> {
    Ok(Request::delete(
        ctx.url(&["webhook_subscriptions", registration.id.as_str()])?
            .to_string(),
    ))
}
