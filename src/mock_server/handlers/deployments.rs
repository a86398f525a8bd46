//! Bundle, deploy and task endpoint handlers.
//!
//! Deployments finish immediately: the task is created already finished.

use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::{bad_request, no_content, not_found, object, ok, Params};
use crate::mock_server::state::{find, SharedState};

/// GET /v1/content/{guid}/bundles
pub async fn list_bundles(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }
    ok(Value::Array(state.bundles.get(&guid).cloned().unwrap_or_default()))
}

/// GET /v1/content/{guid}/bundles/{id}
pub async fn get_bundle(State(state): State<SharedState>, Path((guid, id)): Path<(String, String)>) -> Response {
    let state = state.read().await;

    match state.bundles.get(&guid).and_then(|b| find(b, "id", &id)) {
        Some(bundle) => ok(bundle.clone()),
        None => not_found("bundle", &id),
    }
}

/// DELETE /v1/content/{guid}/bundles/{id}
pub async fn delete_bundle(State(state): State<SharedState>, Path((guid, id)): Path<(String, String)>) -> Response {
    let mut state = state.write().await;

    let Some(bundles) = state.bundles.get_mut(&guid) else {
        return not_found("bundle", &id);
    };
    let Some(index) = bundles.iter().position(|b| b["id"] == id.as_str()) else {
        return not_found("bundle", &id);
    };
    if bundles[index]["active"] == true {
        return bad_request("The active bundle cannot be deleted.");
    }
    bundles.remove(index);
    no_content()
}

/// POST /v1/content/{guid}/deploy
///
/// A null `bundle_id` redeploys the active bundle.
pub async fn deploy_content(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    let mut state = state.write().await;
    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }

    let bundles = state.bundles.entry(guid.clone()).or_default();
    let target = match fields.get("bundle_id") {
        Some(Value::String(id)) => bundles.iter().position(|b| b["id"] == id.as_str()),
        Some(Value::Null) | None => bundles.iter().position(|b| b["active"] == true),
        Some(_) => return bad_request("The bundle_id must be a string."),
    };
    let Some(target) = target else {
        return bad_request("No bundle to deploy.");
    };
    for (index, bundle) in bundles.iter_mut().enumerate() {
        bundle["active"] = Value::Bool(index == target);
    }
    let bundle_id = bundles[target]["id"].clone();

    let now = Utc::now().to_rfc3339();
    if let Some(item) = state
        .content
        .iter_mut()
        .find(|c| c["guid"] == guid.as_str())
    {
        item["bundle_id"] = bundle_id.clone();
        item["last_deployed_time"] = Value::String(now);
    }

    let task_id = state.next_id();
    state.tasks.push(json!({
        "id": task_id,
        "finished": true,
        "code": 0,
        "error": "",
        "output": [
            format!("Deploying bundle {}", bundle_id.as_str().unwrap_or_default()),
            "Launching content",
        ],
        "result": {"type": "deploy", "data": {"content_guid": guid}},
    }));
    ok(json!({"task_id": task_id}))
}

/// GET /v1/tasks/{id}
///
/// `first` skips output lines; `wait` is accepted and ignored.
pub async fn get_task(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    let state = state.read().await;

    let Some(task) = find(&state.tasks, "id", &id) else {
        return not_found("task", &id);
    };
    let first = params
        .get("first")
        .and_then(|f| f.parse::<usize>().ok())
        .unwrap_or(0);

    let mut task = task.clone();
    let output: Vec<Value> = task["output"]
        .as_array()
        .map(|lines| lines.iter().skip(first).cloned().collect())
        .unwrap_or_default();
    task["last"] = json!(first + output.len());
    task["output"] = Value::Array(output);
    ok(task)
}
