//! Mock Connect server.
//!
//! Provides an axum-based HTTP server that simulates the Connect API under
//! `/__api__`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::fixtures::{DefaultScenario, Fixtures};
use super::handlers;
use super::state::{MockState, SharedState};

/// A mock Connect server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a realistic, stateful API implementation.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: SharedState,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Self::default_state()).await
    }

    /// Start a mock server with empty state.
    ///
    /// Useful when you want to control exactly what data is available.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Get the server URL, without the `/__api__` suffix.
    ///
    /// Pass it to [`Config::new`](crate::Config::new) when creating a client.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get access to the server's shared state.
    ///
    /// This allows modifying the mock data during a test.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the default state with common test fixtures.
    fn default_state() -> MockState {
        Self::state_from_scenario(Fixtures::default_scenario())
    }

    /// Create state from a scenario.
    fn state_from_scenario(scenario: DefaultScenario) -> MockState {
        let mut state = MockState::new().with_current_user(&scenario.current_user);

        for user in scenario.users {
            state = state.with_user(user);
        }
        for item in scenario.content {
            state = state.with_content(item);
        }
        for (content_guid, permission) in scenario.permissions {
            state = state.with_permission(&content_guid, permission);
        }
        for (content_guid, job) in scenario.jobs {
            state = state.with_job(&content_guid, job);
        }
        for (content_guid, repository) in scenario.repositories {
            state = state.with_repository(&content_guid, repository);
        }
        for (content_guid, bundle) in scenario.bundles {
            state = state.with_bundle(&content_guid, bundle);
        }
        for (content_guid, vanity) in scenario.vanities {
            state = state.with_vanity(&content_guid, vanity);
        }
        for (content_guid, name, value) in scenario.environment {
            state = state.with_environment_variable(&content_guid, &name, &value);
        }
        for group in scenario.groups {
            state = state.with_group(group);
        }
        for event in scenario.visits {
            state = state.with_visit(event);
        }
        for event in scenario.shiny_usage {
            state = state.with_shiny_usage(event);
        }

        state
    }

    /// Create the axum router with all routes.
    pub fn router(state: SharedState) -> Router {
        let api = Router::new()
            // Content routes
            .route(
                "/v1/content",
                get(handlers::list_content).post(handlers::create_content),
            )
            .route(
                "/v1/content/:guid",
                get(handlers::get_content)
                    .patch(handlers::update_content)
                    .delete(handlers::delete_content),
            )
            .route(
                "/v1/content/:guid/permissions",
                get(handlers::list_permissions).post(handlers::create_permission),
            )
            .route(
                "/v1/content/:guid/permissions/:id",
                get(handlers::get_permission)
                    .put(handlers::update_permission)
                    .delete(handlers::delete_permission),
            )
            .route("/v1/content/:guid/jobs", get(handlers::list_jobs))
            .route(
                "/v1/content/:guid/jobs/:key",
                get(handlers::get_job).delete(handlers::delete_job),
            )
            .route(
                "/v1/content/:guid/repository",
                get(handlers::get_repository)
                    .put(handlers::put_repository)
                    .patch(handlers::update_repository)
                    .delete(handlers::delete_repository),
            )
            .route(
                "/v1/content/:guid/vanity",
                get(handlers::get_vanity)
                    .put(handlers::put_vanity)
                    .delete(handlers::delete_vanity),
            )
            .route(
                "/v1/content/:guid/environment",
                get(handlers::get_environment).patch(handlers::update_environment),
            )
            .route("/v1/content/:guid/bundles", get(handlers::list_bundles))
            .route(
                "/v1/content/:guid/bundles/:id",
                get(handlers::get_bundle).delete(handlers::delete_bundle),
            )
            .route("/v1/content/:guid/deploy", post(handlers::deploy_content))
            .route("/v1/tasks/:id", get(handlers::get_task))
            // User routes
            .route(
                "/v1/users",
                get(handlers::list_users).post(handlers::create_user),
            )
            .route(
                "/v1/users/:guid",
                get(handlers::get_user).put(handlers::update_user),
            )
            .route("/v1/users/:guid/lock", post(handlers::lock_user))
            .route("/v1/user", get(handlers::get_me))
            // Group routes
            .route(
                "/v1/groups",
                get(handlers::list_groups).post(handlers::create_group),
            )
            .route(
                "/v1/groups/:guid",
                get(handlers::get_group).delete(handlers::delete_group),
            )
            // Instrumentation routes
            .route(
                "/v1/instrumentation/content/visits",
                get(handlers::list_visits),
            )
            .route(
                "/v1/instrumentation/shiny/usage",
                get(handlers::list_shiny_usage),
            )
            .route("/server_settings", get(server_settings))
            .layer(middleware::from_fn_with_state(state.clone(), require_key));

        Router::new()
            .nest("/__api__", api)
            // Health check
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Reject requests without the configured API key.
async fn require_key(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let required = state.read().await.required_key.clone();

    if let Some(key) = required {
        let expected = format!("Key {key}");
        let sent = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if sent != Some(expected.as_str()) {
            return handlers::error(StatusCode::UNAUTHORIZED, 30, "Invalid API key.");
        }
    }

    next.run(request).await
}

/// GET /server_settings
async fn server_settings(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    handlers::ok(json!({
        "version": state.version,
        "build": "mock",
    }))
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
