//! Shared response parsers for write and delete handlers

use super::types::{DeleteResult, WriteResult};
use crate::error::Result;
use crate::http::Response;
use crate::pagination::{extract_path, extract_string};
use serde_json::Value;

/// Build a [`WriteResult`] from a provider response.
///
/// `data_path` locates the written record in the body (empty for the body
/// itself) and `id_path` its id inside that record. An empty body is a
/// success without a record id. When the body carries no id, `known_id`
/// (the id of an update) is reported.
pub fn write_result(
    response: &Response,
    data_path: &str,
    id_path: &str,
    known_id: Option<&str>,
) -> Result<WriteResult> {
    let Some(body) = &response.body else {
        return Ok(WriteResult::empty_success());
    };

    let record = extract_path(body, data_path).unwrap_or(body);
    let record_id = extract_string(record, id_path).or_else(|| known_id.map(ToString::to_string));
    let data = match record {
        Value::Object(map) => Some(map.clone()),
        _ => None,
    };

    Ok(WriteResult {
        success: true,
        record_id,
        data,
        errors: Vec::new(),
    })
}

/// Any 2xx response deletes successfully
pub fn delete_result(_response: &Response) -> Result<DeleteResult> {
    Ok(DeleteResult { success: true })
}
