//! Recurly v2021-02-25
//!
//! Lists are sorted by `updated_at` and bounded with `begin_time`/`end_time`.
//! The `next` link is a path on the API origin; `has_more` ends the read.
//! Object metadata comes from bundled schemas, falling back to sampling.

use crate::connector::{
    delete_result, write_result, DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams,
    WriteResult,
};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, HandlerSet, ProviderContext, SchemaSource};
use crate::http::{Request, Response};
use crate::interpreter::descriptors::{join_messages, MessageError};
use crate::interpreter::{ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate};
use crate::pagination::{
    NextUrlPaginator, ReadParser, RecordLocator, RecordTransformer, StopCondition, TimeWindow,
};
use crate::types::TimeFormat;
use serde::Deserialize;

/// Versioned media type every request must accept
pub const ACCEPT: &str = "application/vnd.recurly.v2021-02-25+json";

/// Largest page Recurly returns
pub const MAX_LIMIT: usize = 200;

const READ_OBJECTS: &[&str] = &[
    "accounts",
    "subscriptions",
    "invoices",
    "plans",
    "coupons",
    "transactions",
    "items",
];

const WRITE_OBJECTS: &[&str] = &["accounts", "subscriptions", "plans", "coupons", "items"];

const DELETE_OBJECTS: &[&str] = &["accounts", "plans", "coupons", "items"];

/// Handlers for Recurly
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(error_handler())
        .read(HandlerSet::new(build_read, parse_read).only(READ_OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(WRITE_OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(DELETE_OBJECTS))
        .schema(SchemaSource::Composite(include_str!(
            "../../schemas/recurly.json"
        )))
}

// ============================================================================
// Errors
// ============================================================================

/// `{"error": {"type": "validation", "message": "...", "params": [...]}}`
#[derive(Debug, Deserialize)]
struct RecurlyError {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
    #[serde(default)]
    params: Vec<ErrorParam>,
}

#[derive(Debug, Deserialize)]
struct ErrorParam {
    param: String,
    message: String,
}

impl ErrorDescriptor for RecurlyError {
    fn combine(&self, base: Error) -> Error {
        let mut parts = vec![if self.error.kind.is_empty() {
            self.error.message.clone()
        } else {
            format!("{}: {}", self.error.kind, self.error.message)
        }];
        parts.extend(
            self.error
                .params
                .iter()
                .map(|p| format!("{}:{}", p.param, p.message)),
        );
        base.with_message(join_messages(parts, "; "))
    }
}

fn error_handler() -> ErrorHandler {
    ErrorHandler::new(FormatSwitch::new(vec![
        FormatTemplate::new::<RecurlyError>(&["error"]),
        FormatTemplate::new::<MessageError>(&["message"]),
    ]))
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    if !params.next_page.is_empty() {
        return Ok(Request::get(params.next_page.clone()).header("Accept", ACCEPT));
    }

    let window = TimeWindow::from_params(params);
    let url = ctx
        .url(&[params.object_name.as_str()])?
        .with_query_param("limit", params.page_size_or(MAX_LIMIT).min(MAX_LIMIT).to_string())
        .with_query_param("sort", "updated_at")
        .with_query_param("order", "asc")
        .with_optional_query_param("begin_time", window.since_as(TimeFormat::Rfc3339))
        .with_optional_query_param("end_time", window.until_as(TimeFormat::Rfc3339));

    Ok(Request::get(url.to_string()).header("Accept", ACCEPT))
}

fn parse_read(
    ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    ReadParser::new(
        RecordLocator::path("data"),
        NextUrlPaginator::new("next")
            .with_base_url(ctx.module_url.clone())
            .reorigin()
            .with_stop_condition(StopCondition::field("has_more", false)),
    )
    .with_transformer(RecordTransformer::new().id_field("id"))
    .parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    let object = params.object_name.as_str();
    let request = match params.update_id() {
        Some(id) => Request::put(ctx.url(&[object, id])?.to_string(), params.record_data.clone()),
        None => Request::post(ctx.url(&[object])?.to_string(), params.record_data.clone()),
    };
    Ok(request.header("Accept", ACCEPT))
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
    Ok(Request::delete(url.to_string()).header("Accept", ACCEPT))
}

fn parse_delete(
    _ctx: &ProviderContext,
    _params: &DeleteParams,
    _request: &Request,
    response: &Response,
) -> Result<DeleteResult> {
    delete_result(response)
}
