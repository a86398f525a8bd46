//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic Connect records.

use serde_json::{json, Value};

/// Collection of fixture factories for test data.
pub struct Fixtures;

/// A coherent set of users, content and events.
#[derive(Debug, Clone)]
pub struct DefaultScenario {
    pub users: Vec<Value>,
    pub current_user: String,
    pub content: Vec<Value>,
    pub permissions: Vec<(String, Value)>,
    pub jobs: Vec<(String, Value)>,
    pub repositories: Vec<(String, Value)>,
    pub bundles: Vec<(String, Value)>,
    pub vanities: Vec<(String, Value)>,
    /// `(content_guid, name, value)` triples.
    pub environment: Vec<(String, String, String)>,
    pub groups: Vec<Value>,
    pub visits: Vec<Value>,
    pub shiny_usage: Vec<Value>,
}

impl Fixtures {
    // =========================================================================
    // User Fixtures
    // =========================================================================

    /// Create an unlocked user.
    pub fn user(guid: &str, username: &str, role: &str) -> Value {
        json!({
            "guid": guid,
            "username": username,
            "email": format!("{username}@example.com"),
            "first_name": username,
            "last_name": "Example",
            "user_role": role,
            "locked": false,
            "confirmed": true,
            "created_time": "2023-01-10T09:00:00Z",
            "updated_time": "2024-02-01T09:00:00Z",
            "active_time": "2024-06-01T09:00:00Z",
        })
    }

    /// Create a group.
    pub fn group(guid: &str, name: &str) -> Value {
        json!({
            "guid": guid,
            "name": name,
            "owner_guid": null,
        })
    }

    // =========================================================================
    // Content Fixtures
    // =========================================================================

    /// Create a content item with required fields only.
    pub fn content_item(guid: &str, name: &str, app_mode: &str, owner_guid: &str) -> Value {
        json!({
            "guid": guid,
            "name": name,
            "title": null,
            "description": "",
            "access_type": "acl",
            "app_mode": app_mode,
            "owner_guid": owner_guid,
            "created_time": "2024-01-15T12:00:00Z",
            "last_deployed_time": "2024-05-20T08:30:00Z",
            "content_url": format!("https://connect.example.com/content/{guid}/"),
            "dashboard_url": format!("https://connect.example.com/connect/#/apps/{guid}"),
        })
    }

    /// Create a permission granting `role` to a principal.
    pub fn permission(id: &str, content_guid: &str, principal_guid: &str, principal_type: &str, role: &str) -> Value {
        json!({
            "id": id,
            "content_guid": content_guid,
            "principal_guid": principal_guid,
            "principal_type": principal_type,
            "role": role,
        })
    }

    /// Create a finished job.
    pub fn job(key: &str, tag: &str) -> Value {
        json!({
            "id": key,
            "key": key,
            "tag": tag,
            "status": 1,
            "exit_code": 0,
            "hostname": "connect-worker-1",
            "start_time": "2024-05-20T08:30:00Z",
            "end_time": "2024-05-20T08:31:12Z",
        })
    }

    /// Create repository settings pointing at `url`.
    pub fn repository(url: &str) -> Value {
        json!({
            "repository": url,
            "branch": "main",
            "directory": ".",
            "polling": false,
        })
    }

    /// Create a bundle uploaded for `content_guid`.
    pub fn bundle(id: &str, content_guid: &str, active: bool) -> Value {
        json!({
            "id": id,
            "content_guid": content_guid,
            "created_time": "2024-05-20T08:29:00Z",
            "cluster_name": "Local",
            "image_name": null,
            "r_version": null,
            "py_version": "3.11.4",
            "quarto_version": null,
            "active": active,
            "size": 48213,
            "metadata": {
                "source": "git",
                "source_repo": "https://github.com/example/sales-dashboard",
                "source_branch": "main",
                "source_commit": format!("a1b2c3d{id}"),
                "archive_md5": null,
                "archive_sha1": null,
            },
        })
    }

    /// Create a vanity URL for `content_guid`.
    pub fn vanity(content_guid: &str, path: &str) -> Value {
        json!({
            "content_guid": content_guid,
            "path": path,
            "created_time": "2024-02-11T16:00:00Z",
        })
    }

    // =========================================================================
    // Instrumentation Fixtures
    // =========================================================================

    /// Create a visit event at `time`.
    pub fn visit(content_guid: &str, user_guid: &str, time: &str) -> Value {
        json!({
            "content_guid": content_guid,
            "user_guid": user_guid,
            "variant_key": null,
            "rendering_id": null,
            "bundle_id": 12,
            "time": time,
            "data_version": 1,
            "path": "/",
        })
    }

    /// Create a Shiny session event.
    pub fn shiny_usage(content_guid: &str, user_guid: &str, started: &str, ended: Option<&str>) -> Value {
        json!({
            "content_guid": content_guid,
            "user_guid": user_guid,
            "started": started,
            "ended": ended,
            "data_version": 1,
        })
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// The data a fresh [`MockServer`](super::MockServer) starts with.
    pub fn default_scenario() -> DefaultScenario {
        let admin = "6f300623-1e0c-48e6-a473-ddf630c0c0c3";
        let carlos = "20a79ce3-6e87-4522-9faf-be24228800a4";
        let ada = "a1f9e2b5-0d4c-4f6e-9a7b-3c2d1e0f9a8b";

        let dashboard = "f2f37341-e21d-3d80-c698-a935ad614066";
        let report = "b6a1c8d2-3e4f-4a5b-8c7d-9e0f1a2b3c4d";
        let model = "c9d8e7f6-a5b4-4c3d-2e1f-0a9b8c7d6e5f";

        DefaultScenario {
            users: vec![
                Self::user(admin, "admin", "administrator"),
                Self::user(carlos, "carlos", "publisher"),
                Self::user(ada, "ada", "viewer"),
            ],
            current_user: admin.to_string(),
            content: vec![
                Self::content_item(dashboard, "sales-dashboard", "python-streamlit", carlos),
                Self::content_item(report, "quarterly-report", "quarto-static", ada),
                Self::content_item(model, "churn-model", "python-fastapi", carlos),
            ],
            permissions: vec![(
                dashboard.to_string(),
                Self::permission("1", dashboard, ada, "user", "viewer"),
            )],
            jobs: vec![
                (dashboard.to_string(), Self::job("tHawGvHZTosJA2Dx", "run_app")),
                (dashboard.to_string(), Self::job("Xyz8ePq2LmN4vB7c", "build_robust")),
            ],
            repositories: vec![(
                report.to_string(),
                Self::repository("https://github.com/example/quarterly-report"),
            )],
            bundles: vec![
                (dashboard.to_string(), Self::bundle("101", dashboard, false)),
                (dashboard.to_string(), Self::bundle("102", dashboard, true)),
            ],
            vanities: vec![(dashboard.to_string(), Self::vanity(dashboard, "/sales/"))],
            environment: vec![(
                dashboard.to_string(),
                "DATABASE_URL".to_string(),
                "postgres://db.example.com/sales".to_string(),
            )],
            groups: vec![
                Self::group("4b3e9a8f-5c2d-4e1f-8a7b-6c5d4e3f2a1b", "data-science"),
                Self::group("9e8d7c6b-5a4f-4e3d-2c1b-0a9f8e7d6c5b", "finance"),
            ],
            visits: vec![
                Self::visit(dashboard, ada, "2024-06-01T10:00:00Z"),
                Self::visit(dashboard, carlos, "2024-06-02T11:00:00Z"),
                Self::visit(report, ada, "2024-06-03T12:00:00Z"),
                Self::visit(dashboard, ada, "2024-06-04T13:00:00Z"),
            ],
            shiny_usage: vec![
                Self::shiny_usage(dashboard, ada, "2024-06-01T10:00:00Z", Some("2024-06-01T10:20:00Z")),
                Self::shiny_usage(dashboard, carlos, "2024-06-02T11:00:00Z", None),
            ],
        }
    }
}
