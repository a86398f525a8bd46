//! Group endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use serde_json::Value;

use super::{bad_request, created, no_content, not_found, object, offset_page, ok, Params};
use crate::mock_server::state::{find, remove, SharedState};

/// GET /v1/groups
pub async fn list_groups(State(state): State<SharedState>, Query(params): Query<Params>) -> Response {
    let state = state.read().await;

    let prefix = params.get("prefix").map(|p| p.to_lowercase());
    let groups: Vec<Value> = state
        .groups
        .iter()
        .filter(|g| {
            prefix.as_deref().map_or(true, |p| {
                g.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| name.to_lowercase().starts_with(p))
            })
        })
        .cloned()
        .collect();

    ok(offset_page(groups, &params))
}

/// GET /v1/groups/{guid}
pub async fn get_group(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    match find(&state.groups, "guid", &guid) {
        Some(group) => ok(group.clone()),
        None => not_found("group", &guid),
    }
}

/// POST /v1/groups
pub async fn create_group(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    if !fields.get("name").is_some_and(Value::is_string) {
        return bad_request("The group name is required.");
    }

    let mut state = state.write().await;
    let guid = state.next_guid();
    let owner_guid = state.current_user.clone();
    fields.insert("guid".to_string(), Value::String(guid));
    fields
        .entry("owner_guid")
        .or_insert_with(|| owner_guid.map_or(Value::Null, Value::String));

    let group = Value::Object(fields);
    state.groups.push(group.clone());
    created(group)
}

/// DELETE /v1/groups/{guid}
pub async fn delete_group(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let mut state = state.write().await;

    if remove(&mut state.groups, "guid", &guid) {
        no_content()
    } else {
        not_found("group", &guid)
    }
}
