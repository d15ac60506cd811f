//! AWS IAM Identity Center identity store
//!
//! The identity store speaks JSON-RPC: every call is a POST to the module
//! root naming its action in `X-Amz-Target`. Requests are signed by the
//! caller-supplied transport.

use crate::connector::{
    delete_result, write_result, DeleteParams, DeleteResult, ReadParams, ReadResult, WriteParams,
    WriteResult,
};
use crate::error::{Error, Result};
use crate::handlers::{HandlerRegistry, HandlerSet, ProviderContext, SchemaSource};
use crate::http::{Request, Response};
use crate::interpreter::descriptors::MessageError;
use crate::interpreter::{ErrorDescriptor, ErrorHandler, FormatSwitch, FormatTemplate};
use crate::pagination::{CursorPaginator, ReadParser, RecordLocator, RecordTransformer};
use crate::resolver::keys;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const OBJECTS: &[&str] = &["Groups", "Users"];

const TARGET_PREFIX: &str = "AWSIdentityStore";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Handlers for the identity store
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(error_handler())
        .read(HandlerSet::new(build_read, parse_read).only(OBJECTS))
        .write(HandlerSet::new(build_write, parse_write).only(OBJECTS))
        .delete(HandlerSet::new(build_delete, parse_delete).only(OBJECTS))
        .schema(SchemaSource::Sampling)
}

/// Singular resource name and id attribute of an object
fn resource(object: &str) -> Result<(&'static str, &'static str)> {
    match object {
        "Groups" => Ok(("Group", "GroupId")),
        "Users" => Ok(("User", "UserId")),
        other => Err(Error::object_not_supported(other)),
    }
}

fn call(ctx: &ProviderContext, action: &str, body: Value) -> Result<Request> {
    let url = ctx.url::<&str>(&[])?;
    Ok(Request::post(url.to_string(), body)
        .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
        .header("Content-Type", CONTENT_TYPE))
}

fn store_id(ctx: &ProviderContext) -> Result<String> {
    Ok(ctx.metadata.require(keys::IDENTITY_STORE_ID)?.to_string())
}

// ============================================================================
// Errors
// ============================================================================

/// `{"__type": "com.amazonaws.identitystore#ResourceNotFoundException", "message": "..."}`
#[derive(Debug, Deserialize)]
struct AwsError {
    #[serde(rename = "__type")]
    kind: String,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

impl ErrorDescriptor for AwsError {
    fn combine(&self, base: Error) -> Error {
        let kind = self.kind.rsplit('#').next().unwrap_or(&self.kind);
        match &self.message {
            Some(message) => base.with_message(format!("{kind}: {message}")),
            None => base.with_message(kind),
        }
    }
}

fn error_handler() -> ErrorHandler {
    ErrorHandler::new(FormatSwitch::new(vec![
        FormatTemplate::new::<AwsError>(&["__type"]),
        FormatTemplate::new::<MessageError>(&["message"]),
    ]))
}

// ============================================================================
// Read
// ============================================================================

fn build_read(ctx: &ProviderContext, params: &ReadParams) -> Result<Request> {
    let (resource, _) = resource(&params.object_name)?;

    let mut body = Map::new();
    body.insert("IdentityStoreId".into(), Value::String(store_id(ctx)?));
    if let Some(size) = params.page_size {
        body.insert("MaxResults".into(), json!(size.min(100)));
    }
    if !params.next_page.is_empty() {
        body.insert("NextToken".into(), Value::String(params.next_page.clone()));
    }

    call(ctx, &format!("List{resource}s"), Value::Object(body))
}

fn parse_read(
    _ctx: &ProviderContext,
    params: &ReadParams,
    request: &Request,
    response: &Response,
) -> Result<ReadResult> {
    let (_, id_attribute) = resource(&params.object_name)?;
    ReadParser::new(
        RecordLocator::path(params.object_name.clone()),
        CursorPaginator::new("NextToken"),
    )
    .with_transformer(RecordTransformer::new().id_field(id_attribute))
    .parse(params, request, response)
}

// ============================================================================
// Write / Delete
// ============================================================================

/// Update operations replacing each given attribute
fn operations(record: &Value) -> Vec<Value> {
    record
        .as_object()
        .map(|attributes| {
            attributes
                .iter()
                .map(|(path, value)| json!({"AttributePath": path, "AttributeValue": value}))
                .collect()
        })
        .unwrap_or_default()
}

fn build_write(ctx: &ProviderContext, params: &WriteParams) -> Result<Request> {
    let (resource, id_attribute) = resource(&params.object_name)?;
    let store = store_id(ctx)?;

    match params.update_id() {
        Some(id) => call(
            ctx,
            &format!("Update{resource}"),
            json!({
                "IdentityStoreId": store,
                id_attribute: id,
                "Operations": operations(&params.record_data),
            }),
        ),
        None => {
            let mut body = params.record_data.as_object().cloned().unwrap_or_default();
            body.insert("IdentityStoreId".into(), Value::String(store));
            call(ctx, &format!("Create{resource}"), Value::Object(body))
        }
    }
}

fn parse_write(
    _ctx: &ProviderContext,
    params: &WriteParams,
    _request: &Request,
    response: &Response,
) -> Result<WriteResult> {
    let (_, id_attribute) = resource(&params.object_name)?;
    write_result(response, "", id_attribute, params.update_id())
}

fn build_delete(ctx: &ProviderContext, params: &DeleteParams) -> Result<Request> {
    let (resource, id_attribute) = resource(&params.object_name)?;
    call(
        ctx,
        &format!("Delete{resource}"),
        json!({"IdentityStoreId": store_id(ctx)?, id_attribute: params.record_id}),
    )
}

fn parse_delete(
    _ctx: &ProviderContext,
    _params: &DeleteParams,
    _request: &Request,
    response: &Response,
) -> Result<DeleteResult> {
    delete_result(response)
}
