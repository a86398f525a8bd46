//! HTTP request handlers for the mock server.

pub mod content;
pub mod deployments;
pub mod groups;
pub mod instrumentation;
pub mod users;

pub use content::*;
pub use deployments::*;
pub use groups::*;
pub use instrumentation::*;
pub use users::*;

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

/// Query string parameters, by name.
pub type Params = HashMap<String, String>;

/// Largest page the server hands out.
const MAX_PAGE_SIZE: usize = 500;

/// A Connect-shaped error body.
pub fn error(status: StatusCode, code: i64, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "code": code,
            "error": message.into(),
            "payload": null,
        })),
    )
        .into_response()
}

pub fn not_found(kind: &str, id: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        4,
        format!("The requested {kind} '{id}' could not be found."),
    )
}

pub fn bad_request(message: impl Into<String>) -> Response {
    error(StatusCode::BAD_REQUEST, 3, message)
}

pub fn ok(body: Value) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub fn created(body: Value) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// The request body as an object.
pub fn object(body: Value) -> Result<Map<String, Value>, Response> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(bad_request("Request body must be a JSON object.")),
    }
}

/// Offset page: `page_number` is 1-based, `page_size` defaults to 20.
pub fn offset_page(records: Vec<Value>, params: &Params) -> Value {
    let page_number = params
        .get("page_number")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let page_size = params
        .get("page_size")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(20)
        .clamp(1, MAX_PAGE_SIZE);

    let total = records.len();
    let results: Vec<Value> = records
        .into_iter()
        .skip((page_number - 1) * page_size)
        .take(page_size)
        .collect();

    json!({
        "results": results,
        "current_page": page_number,
        "total": total,
    })
}

/// Cursor page: the cursor is the offset of the next record.
pub fn cursor_page(records: Vec<Value>, params: &Params) -> Value {
    let limit = params
        .get("limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(20)
        .clamp(1, MAX_PAGE_SIZE);
    let start = params
        .get("next")
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);

    let total = records.len();
    let results: Vec<Value> = records.into_iter().skip(start).take(limit).collect();
    let next = (start + limit < total).then(|| (start + limit).to_string());
    let previous = (start > 0).then(|| start.saturating_sub(limit).to_string());

    json!({
        "results": results,
        "paging": {
            "cursors": {"previous": previous, "next": next},
        },
    })
}

/// Whether `record[field]` renders as `expected`.
pub fn field_is(record: &Value, field: &str, expected: &str) -> bool {
    match record.get(field) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}
