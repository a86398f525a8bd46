//! Mock server state management.
//!
//! Provides the in-memory data store for the mock Connect server. Records
//! are kept as JSON objects in insertion order, which is the order list
//! endpoints return them in.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// State shared between the mock server's handlers.
pub type SharedState = Arc<RwLock<MockState>>;

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug, Clone)]
pub struct MockState {
    /// Content items, keyed by `guid`.
    pub content: Vec<Value>,

    /// Permissions per content guid.
    pub permissions: HashMap<String, Vec<Value>>,

    /// Jobs per content guid.
    pub jobs: HashMap<String, Vec<Value>>,

    /// Git repository settings per content guid.
    pub repositories: HashMap<String, Value>,

    /// Bundles per content guid.
    pub bundles: HashMap<String, Vec<Value>>,

    /// Vanity URLs per content guid.
    pub vanities: HashMap<String, Value>,

    /// Environment variables per content guid.
    pub environments: HashMap<String, BTreeMap<String, String>>,

    /// Background tasks, keyed by `id`.
    pub tasks: Vec<Value>,

    /// Users, keyed by `guid`.
    pub users: Vec<Value>,

    /// Groups, keyed by `guid`.
    pub groups: Vec<Value>,

    /// Content visit events.
    pub visits: Vec<Value>,

    /// Shiny session events.
    pub shiny_usage: Vec<Value>,

    /// Guid of the user `GET /v1/user` answers with.
    pub current_user: Option<String>,

    /// Version reported by `GET /server_settings`.
    pub version: String,

    /// Optional API key. If set, requests must send `Authorization: Key <key>`.
    pub required_key: Option<String>,

    /// Counter for generated identifiers; starts above the fixture ids.
    next_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            permissions: HashMap::new(),
            jobs: HashMap::new(),
            repositories: HashMap::new(),
            bundles: HashMap::new(),
            vanities: HashMap::new(),
            environments: HashMap::new(),
            tasks: Vec::new(),
            users: Vec::new(),
            groups: Vec::new(),
            visits: Vec::new(),
            shiny_usage: Vec::new(),
            current_user: None,
            version: "2024.08.0".to_string(),
            required_key: None,
            next_id: 1000,
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Add a content item to the state.
    pub fn with_content(mut self, item: Value) -> Self {
        self.content.push(item);
        self
    }

    /// Add a permission to a content item.
    pub fn with_permission(mut self, content_guid: &str, permission: Value) -> Self {
        self.permissions
            .entry(content_guid.to_string())
            .or_default()
            .push(permission);
        self
    }

    /// Add a job to a content item.
    pub fn with_job(mut self, content_guid: &str, job: Value) -> Self {
        self.jobs.entry(content_guid.to_string()).or_default().push(job);
        self
    }

    /// Attach repository settings to a content item.
    pub fn with_repository(mut self, content_guid: &str, repository: Value) -> Self {
        self.repositories.insert(content_guid.to_string(), repository);
        self
    }

    /// Add a bundle to a content item.
    pub fn with_bundle(mut self, content_guid: &str, bundle: Value) -> Self {
        self.bundles
            .entry(content_guid.to_string())
            .or_default()
            .push(bundle);
        self
    }

    /// Give a content item a vanity URL.
    pub fn with_vanity(mut self, content_guid: &str, vanity: Value) -> Self {
        self.vanities.insert(content_guid.to_string(), vanity);
        self
    }

    /// Set an environment variable on a content item.
    pub fn with_environment_variable(mut self, content_guid: &str, name: &str, value: &str) -> Self {
        self.environments
            .entry(content_guid.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Add a user to the state.
    pub fn with_user(mut self, user: Value) -> Self {
        self.users.push(user);
        self
    }

    /// Add a group to the state.
    pub fn with_group(mut self, group: Value) -> Self {
        self.groups.push(group);
        self
    }

    /// Add a visit event.
    pub fn with_visit(mut self, event: Value) -> Self {
        self.visits.push(event);
        self
    }

    /// Add a Shiny usage event.
    pub fn with_shiny_usage(mut self, event: Value) -> Self {
        self.shiny_usage.push(event);
        self
    }

    /// Set which user the API key belongs to.
    pub fn with_current_user(mut self, guid: &str) -> Self {
        self.current_user = Some(guid.to_string());
        self
    }

    /// Set the required API key.
    pub fn with_required_key(mut self, key: &str) -> Self {
        self.required_key = Some(key.to_string());
        self
    }

    /// A fresh guid-shaped identifier.
    pub fn next_guid(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        format!("00000000-0000-4000-8000-{id:012}")
    }

    /// A fresh numeric identifier, rendered as a string.
    pub fn next_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    /// The user `GET /v1/user` answers with.
    pub fn me(&self) -> Option<&Value> {
        let guid = self.current_user.as_deref()?;
        find(&self.users, "guid", guid)
    }
}

/// Find the record whose `key` field equals `id`.
pub fn find<'a>(records: &'a [Value], key: &str, id: &str) -> Option<&'a Value> {
    records.iter().find(|r| r.get(key).and_then(Value::as_str) == Some(id))
}

/// Merge `changes` into the record whose `key` is `id`, returning the result.
pub fn update(records: &mut [Value], key: &str, id: &str, changes: &Map<String, Value>) -> Option<Value> {
    let record = records
        .iter_mut()
        .find(|r| r.get(key).and_then(Value::as_str) == Some(id))?;
    if let Value::Object(fields) = record {
        for (name, value) in changes {
            fields.insert(name.clone(), value.clone());
        }
    }
    Some(record.clone())
}

/// Remove the record whose `key` is `id`; returns whether it existed.
pub fn remove(records: &mut Vec<Value>, key: &str, id: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.get(key).and_then(Value::as_str) != Some(id));
    records.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_add_and_find_content() {
        let state = MockState::new().with_content(json!({"guid": "c1", "name": "report"}));

        let item = find(&state.content, "guid", "c1");
        assert!(item.is_some());
        assert_eq!(item.unwrap()["name"], "report");
        assert!(find(&state.content, "guid", "c2").is_none());
    }

    #[test]
    fn test_state_update_record() {
        let mut state = MockState::new().with_user(json!({"guid": "u1", "locked": false}));

        let changes = json!({"locked": true});
        let updated = update(&mut state.users, "guid", "u1", changes.as_object().unwrap());

        assert_eq!(updated, Some(json!({"guid": "u1", "locked": true})));
        assert_eq!(state.users[0]["locked"], true);
    }

    #[test]
    fn test_state_remove_record() {
        let mut state = MockState::new().with_group(json!({"guid": "g1"}));
        assert!(remove(&mut state.groups, "guid", "g1"));
        assert!(!remove(&mut state.groups, "guid", "g1"));
    }

    #[test]
    fn test_state_me_and_ids() {
        let mut state = MockState::new()
            .with_user(json!({"guid": "u1", "username": "admin"}))
            .with_current_user("u1");

        assert_eq!(state.me().unwrap()["username"], "admin");
        assert_ne!(state.next_guid(), state.next_guid());
    }
}
