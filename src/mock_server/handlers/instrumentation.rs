//! Instrumentation endpoint handlers.

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde_json::Value;

use super::{cursor_page, field_is, ok, Params};
use crate::mock_server::state::SharedState;

/// Apply the shared event filters. Timestamps are RFC 3339 in UTC, so
/// string order is time order.
fn filter_events(events: &[Value], time_field: &str, params: &Params) -> Vec<Value> {
    let min_version = params
        .get("min_data_version")
        .and_then(|v| v.parse::<u64>().ok());

    events
        .iter()
        .filter(|e| params.get("content_guid").map_or(true, |c| field_is(e, "content_guid", c)))
        .filter(|e| {
            min_version.map_or(true, |min| {
                e.get("data_version").and_then(Value::as_u64).unwrap_or(0) >= min
            })
        })
        .filter(|e| {
            let time = e.get(time_field).and_then(Value::as_str).unwrap_or_default();
            params.get("from").map_or(true, |from| time >= from.as_str())
                && params.get("to").map_or(true, |to| time <= to.as_str())
        })
        .cloned()
        .collect()
}

/// GET /v1/instrumentation/content/visits
pub async fn list_visits(State(state): State<SharedState>, Query(params): Query<Params>) -> Response {
    let state = state.read().await;
    let events = filter_events(&state.visits, "time", &params);
    ok(cursor_page(events, &params))
}

/// GET /v1/instrumentation/shiny/usage
pub async fn list_shiny_usage(State(state): State<SharedState>, Query(params): Query<Params>) -> Response {
    let state = state.read().await;
    let events = filter_events(&state.shiny_usage, "started", &params);
    ok(cursor_page(events, &params))
}
