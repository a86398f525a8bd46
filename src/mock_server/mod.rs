//! Mock Connect server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the Connect
//! API for integration and end-to-end testing. Unlike wiremock which mocks at
//! the HTTP level per-test, this server maintains state across requests,
//! enabling realistic workflow testing.
//!
//! # Example
//!
//! ```ignore
//! use connectapi::mock_server::MockServer;
//! use connectapi::{Client, Config, Queryable};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = Client::new(Config::new(server.url(), "test-key").unwrap()).unwrap();
//!
//!     // Server comes with default fixtures
//!     let item = client
//!         .content()
//!         .unwrap()
//!         .get("f2f37341-e21d-3d80-c698-a935ad614066")
//!         .await
//!         .unwrap();
//!     assert_eq!(item.name().unwrap(), "sales-dashboard");
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures};
pub use server::MockServer;
pub use state::{MockState, SharedState};
