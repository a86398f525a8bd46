//! User endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::{bad_request, created, field_is, not_found, object, offset_page, ok, Params};
use crate::mock_server::state::{find, update, SharedState};

/// Case-insensitive prefix match on the user's names and email.
fn matches_prefix(user: &Value, prefix: &str) -> bool {
    let prefix = prefix.to_lowercase();
    ["username", "first_name", "last_name", "email"]
        .iter()
        .filter_map(|field| user.get(*field).and_then(Value::as_str))
        .any(|value| value.to_lowercase().starts_with(&prefix))
}

/// `account_status` takes `|`-separated statuses.
fn matches_status(user: &Value, statuses: &str) -> bool {
    let locked = user.get("locked").and_then(Value::as_bool).unwrap_or(false);
    let active = user.get("active_time").is_some_and(|t| !t.is_null());
    statuses.split('|').any(|status| match status {
        "locked" => locked,
        "licensed" => !locked,
        "inactive" => !active,
        _ => false,
    })
}

/// GET /v1/users
pub async fn list_users(State(state): State<SharedState>, Query(params): Query<Params>) -> Response {
    let state = state.read().await;

    let users: Vec<Value> = state
        .users
        .iter()
        .filter(|u| params.get("prefix").map_or(true, |p| matches_prefix(u, p)))
        .filter(|u| params.get("user_role").map_or(true, |r| field_is(u, "user_role", r)))
        .filter(|u| {
            params
                .get("account_status")
                .map_or(true, |s| matches_status(u, s))
        })
        .cloned()
        .collect();

    ok(offset_page(users, &params))
}

/// GET /v1/users/{guid}
pub async fn get_user(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    match find(&state.users, "guid", &guid) {
        Some(user) => ok(user.clone()),
        None => not_found("user", &guid),
    }
}

/// GET /v1/user
pub async fn get_me(State(state): State<SharedState>) -> Response {
    let state = state.read().await;

    match state.me() {
        Some(user) => ok(user.clone()),
        None => not_found("user", "me"),
    }
}

/// POST /v1/users
pub async fn create_user(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    let Some(username) = fields.get("username").and_then(Value::as_str).map(str::to_string) else {
        return bad_request("The username is required.");
    };

    let mut state = state.write().await;
    if find(&state.users, "username", &username).is_some() {
        return bad_request(format!("The username '{username}' is already in use."));
    }

    let guid = state.next_guid();
    fields.insert("guid".to_string(), Value::String(guid));
    fields.insert("created_time".to_string(), Value::String(Utc::now().to_rfc3339()));
    fields.insert("locked".to_string(), Value::Bool(false));
    fields
        .entry("user_role")
        .or_insert_with(|| Value::String("viewer".to_string()));

    let user = Value::Object(fields);
    state.users.push(user.clone());
    created(user)
}

/// PUT /v1/users/{guid}
pub async fn update_user(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut changes = match object(body) {
        Ok(changes) => changes,
        Err(response) => return response,
    };
    // Locking has its own endpoint.
    changes.remove("locked");
    changes.remove("guid");

    let mut state = state.write().await;
    match update(&mut state.users, "guid", &guid, &changes) {
        Some(user) => ok(user),
        None => not_found("user", &guid),
    }
}

/// POST /v1/users/{guid}/lock
pub async fn lock_user(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(locked) = body.get("locked").and_then(Value::as_bool) else {
        return bad_request("The field 'locked' is required.");
    };

    let mut changes = Map::new();
    changes.insert("locked".to_string(), Value::Bool(locked));

    let mut state = state.write().await;
    match update(&mut state.users, "guid", &guid, &changes) {
        Some(_) => ok(json!({})),
        None => not_found("user", &guid),
    }
}
