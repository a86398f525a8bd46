//! Content, permission, job, repository, vanity and environment endpoint handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::{bad_request, created, error, field_is, no_content, not_found, object, ok, Params};
use crate::mock_server::state::{find, remove, update, SharedState};

/// GET /v1/content
pub async fn list_content(State(state): State<SharedState>, Query(params): Query<Params>) -> Response {
    let state = state.read().await;

    let include_owner = params
        .get("include")
        .is_some_and(|i| i.split(',').any(|part| part == "owner"));

    let items: Vec<Value> = state
        .content
        .iter()
        .filter(|c| params.get("owner_guid").map_or(true, |o| field_is(c, "owner_guid", o)))
        .filter(|c| params.get("name").map_or(true, |n| field_is(c, "name", n)))
        .map(|c| {
            let mut item = c.clone();
            if include_owner {
                let owner = c
                    .get("owner_guid")
                    .and_then(Value::as_str)
                    .and_then(|guid| find(&state.users, "guid", guid))
                    .cloned()
                    .unwrap_or(Value::Null);
                item["owner"] = owner;
            }
            item
        })
        .collect();

    ok(Value::Array(items))
}

/// GET /v1/content/{guid}
pub async fn get_content(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    match find(&state.content, "guid", &guid) {
        Some(item) => ok(item.clone()),
        None => not_found("content item", &guid),
    }
}

/// POST /v1/content
pub async fn create_content(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    if !fields.get("name").is_some_and(Value::is_string) {
        return bad_request("The content name is required.");
    }

    let mut state = state.write().await;
    let guid = state.next_guid();
    let owner_guid = state.current_user.clone();

    fields.insert("guid".to_string(), Value::String(guid));
    fields.insert("created_time".to_string(), Value::String(Utc::now().to_rfc3339()));
    fields.entry("app_mode").or_insert_with(|| Value::String("unknown".to_string()));
    fields.entry("title").or_insert(Value::Null);
    fields
        .entry("owner_guid")
        .or_insert_with(|| owner_guid.map_or(Value::Null, Value::String));

    let item = Value::Object(fields);
    state.content.push(item.clone());
    created(item)
}

/// PATCH /v1/content/{guid}
pub async fn update_content(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let changes = match object(body) {
        Ok(changes) => changes,
        Err(response) => return response,
    };

    let mut state = state.write().await;
    match update(&mut state.content, "guid", &guid, &changes) {
        Some(item) => ok(item),
        None => not_found("content item", &guid),
    }
}

/// DELETE /v1/content/{guid}
pub async fn delete_content(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let mut state = state.write().await;

    if !remove(&mut state.content, "guid", &guid) {
        return not_found("content item", &guid);
    }
    state.permissions.remove(&guid);
    state.jobs.remove(&guid);
    state.repositories.remove(&guid);
    state.bundles.remove(&guid);
    state.vanities.remove(&guid);
    state.environments.remove(&guid);
    no_content()
}

/// GET /v1/content/{guid}/permissions
pub async fn list_permissions(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }
    let permissions = state.permissions.get(&guid).cloned().unwrap_or_default();
    ok(Value::Array(permissions))
}

/// GET /v1/content/{guid}/permissions/{id}
pub async fn get_permission(
    State(state): State<SharedState>,
    Path((guid, id)): Path<(String, String)>,
) -> Response {
    let state = state.read().await;

    match state.permissions.get(&guid).and_then(|p| find(p, "id", &id)) {
        Some(permission) => ok(permission.clone()),
        None => not_found("permission", &id),
    }
}

/// POST /v1/content/{guid}/permissions
pub async fn create_permission(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    for required in ["principal_guid", "principal_type", "role"] {
        if !fields.contains_key(required) {
            return bad_request(format!("The field '{required}' is required."));
        }
    }

    let mut state = state.write().await;
    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }

    let id = state.next_id();
    fields.insert("id".to_string(), Value::String(id));
    fields.insert("content_guid".to_string(), Value::String(guid.clone()));

    let permission = Value::Object(fields);
    state
        .permissions
        .entry(guid)
        .or_default()
        .push(permission.clone());
    created(permission)
}

/// PUT /v1/content/{guid}/permissions/{id}
pub async fn update_permission(
    State(state): State<SharedState>,
    Path((guid, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let changes = match object(body) {
        Ok(changes) => changes,
        Err(response) => return response,
    };
    for required in ["principal_guid", "principal_type", "role"] {
        if !changes.contains_key(required) {
            return bad_request(format!("The field '{required}' is required."));
        }
    }

    let mut state = state.write().await;
    let updated = state
        .permissions
        .get_mut(&guid)
        .and_then(|p| update(p, "id", &id, &changes));
    match updated {
        Some(permission) => ok(permission),
        None => not_found("permission", &id),
    }
}

/// DELETE /v1/content/{guid}/permissions/{id}
pub async fn delete_permission(
    State(state): State<SharedState>,
    Path((guid, id)): Path<(String, String)>,
) -> Response {
    let mut state = state.write().await;

    let removed = state
        .permissions
        .get_mut(&guid)
        .is_some_and(|p| remove(p, "id", &id));
    if removed {
        no_content()
    } else {
        not_found("permission", &id)
    }
}

/// GET /v1/content/{guid}/jobs
pub async fn list_jobs(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }
    ok(Value::Array(state.jobs.get(&guid).cloned().unwrap_or_default()))
}

/// GET /v1/content/{guid}/jobs/{key}
pub async fn get_job(State(state): State<SharedState>, Path((guid, key)): Path<(String, String)>) -> Response {
    let state = state.read().await;

    match state.jobs.get(&guid).and_then(|j| find(j, "key", &key)) {
        Some(job) => ok(job.clone()),
        None => not_found("job", &key),
    }
}

/// DELETE /v1/content/{guid}/jobs/{key}
pub async fn delete_job(State(state): State<SharedState>, Path((guid, key)): Path<(String, String)>) -> Response {
    let mut state = state.write().await;

    if state.jobs.get_mut(&guid).is_some_and(|j| remove(j, "key", &key)) {
        no_content()
    } else {
        not_found("job", &key)
    }
}

/// GET /v1/content/{guid}/repository
pub async fn get_repository(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    match state.repositories.get(&guid) {
        Some(repository) => ok(repository.clone()),
        None => not_found("repository for content item", &guid),
    }
}

/// PUT /v1/content/{guid}/repository
pub async fn put_repository(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    if !fields.get("repository").is_some_and(Value::is_string) {
        return bad_request("The repository URL is required.");
    }

    let mut state = state.write().await;
    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }

    fields
        .entry("branch")
        .or_insert_with(|| Value::String("main".to_string()));
    fields
        .entry("directory")
        .or_insert_with(|| Value::String(".".to_string()));
    fields.entry("polling").or_insert(Value::Bool(false));

    let repository = Value::Object(fields);
    state.repositories.insert(guid, repository.clone());
    ok(repository)
}

/// PATCH /v1/content/{guid}/repository
pub async fn update_repository(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let changes = match object(body) {
        Ok(changes) => changes,
        Err(response) => return response,
    };

    let mut state = state.write().await;
    match state.repositories.get_mut(&guid) {
        Some(Value::Object(repository)) => {
            repository.extend(changes);
            ok(Value::Object(repository.clone()))
        }
        _ => not_found("repository for content item", &guid),
    }
}

/// DELETE /v1/content/{guid}/repository
pub async fn delete_repository(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let mut state = state.write().await;

    match state.repositories.remove(&guid) {
        Some(_) => no_content(),
        None => not_found("repository for content item", &guid),
    }
}

/// GET /v1/content/{guid}/vanity
pub async fn get_vanity(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    match state.vanities.get(&guid) {
        Some(vanity) => ok(vanity.clone()),
        None => not_found("vanity for content item", &guid),
    }
}

/// PUT /v1/content/{guid}/vanity
///
/// A path held by another item is a conflict unless `force` is set.
pub async fn put_vanity(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let fields = match object(body) {
        Ok(fields) => fields,
        Err(response) => return response,
    };
    let Some(path) = fields.get("path").and_then(Value::as_str) else {
        return bad_request("The vanity path is required.");
    };
    let force = fields.get("force").and_then(Value::as_bool).unwrap_or(false);

    let mut state = state.write().await;
    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }

    let holder = state
        .vanities
        .iter()
        .find(|(owner, v)| *owner != &guid && v["path"] == path)
        .map(|(owner, _)| owner.clone());
    if let Some(holder) = holder {
        if !force {
            return error(
                StatusCode::CONFLICT,
                51,
                format!("The vanity path '{path}' is in use by another content item."),
            );
        }
        state.vanities.remove(&holder);
    }

    let vanity = json!({
        "content_guid": guid,
        "path": path,
        "created_time": Utc::now().to_rfc3339(),
    });
    state.vanities.insert(guid, vanity.clone());
    ok(vanity)
}

/// DELETE /v1/content/{guid}/vanity
pub async fn delete_vanity(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let mut state = state.write().await;

    match state.vanities.remove(&guid) {
        Some(_) => no_content(),
        None => not_found("vanity for content item", &guid),
    }
}

/// GET /v1/content/{guid}/environment
///
/// Only names are returned, never values.
pub async fn get_environment(State(state): State<SharedState>, Path(guid): Path<String>) -> Response {
    let state = state.read().await;

    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }
    ok(environment_names(state.environments.get(&guid)))
}

/// PATCH /v1/content/{guid}/environment
///
/// Takes `[{"name", "value"}]`; a null value removes the variable.
pub async fn update_environment(
    State(state): State<SharedState>,
    Path(guid): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Value::Array(changes) = body else {
        return bad_request("Request body must be a JSON array.");
    };

    let mut state = state.write().await;
    if find(&state.content, "guid", &guid).is_none() {
        return not_found("content item", &guid);
    }

    let vars = state.environments.entry(guid).or_default();
    for change in changes {
        let Some(name) = change.get("name").and_then(Value::as_str) else {
            return bad_request("Each variable needs a name.");
        };
        match change.get("value") {
            Some(Value::String(value)) => {
                vars.insert(name.to_string(), value.clone());
            }
            Some(Value::Null) | None => {
                vars.remove(name);
            }
            Some(_) => return bad_request(format!("The value of '{name}' must be a string.")),
        }
    }
    ok(environment_names(Some(&*vars)))
}

fn environment_names(vars: Option<&BTreeMap<String, String>>) -> Value {
    Value::Array(
        vars.into_iter()
            .flat_map(|vars| vars.keys())
            .map(|name| Value::String(name.clone()))
            .collect(),
    )
}
