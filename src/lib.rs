//! Posit Connect API client library.
//!
//! A Rust library for the Connect REST API that presents server resources
//! as immutable values you navigate from a root [`Client`]. Collections
//! fetch lazily and hide pagination; entities return new values from
//! `update` instead of changing in place.
//!
//! # Quick Start
//!
//! ```no_run
//! use connectapi::{Attrs, Client, Fetchable, Query, Queryable, Update};
//!
//! #[tokio::main]
//! async fn main() -> connectapi::Result<()> {
//!     // Create client from environment variables
//!     let client = Client::from_env()?;
//!
//!     // Every page of users, in server order
//!     let users = client.users()?;
//!     println!("Found {} users", users.count().await?);
//!
//!     // Criteria the server understands become query parameters;
//!     // the rest are checked against the fetched records
//!     let apps = client
//!         .content()?
//!         .find(Query::new().eq("app_mode", "python-streamlit"))
//!         .await?;
//!
//!     for item in apps.fetch().await? {
//!         let renamed = item.update(Attrs::new().set("title", "Dashboard")).await?;
//!         println!("{:?}", renamed.title()?);
//!
//!         // Children inherit the item's identifier
//!         let permissions = item.permissions()?;
//!         println!("{} permissions", permissions.count().await?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Collections implement capability traits:
//!
//! - [`Fetchable`] - Resolve every page once, then serve from memory
//! - [`Queryable`] - `find`, `find_one` and `get`
//! - [`Create`] - Add a member
//!
//! Resources implement [`Resource`] plus [`Update`] and [`Delete`] where
//! the server allows them. Requests go through the [`Transport`] trait;
//! [`HttpTransport`] is the default.
//!
//! # Configuration
//!
//! [`Client::from_env`] reads:
//!
//! - `CONNECT_SERVER` (required) - Server URL, with or without `/__api__`
//! - `CONNECT_API_KEY` (required) - Your Connect API key

mod client;
mod collection;
mod config;
mod context;
mod entity;
mod error;
mod models;
mod pagination;
mod query;
mod record;
pub mod schema;
mod traits;
mod transport;

#[cfg(feature = "test-server")]
pub mod mock_server;

#[cfg(test)]
mod testing;

// Re-export core types
pub use client::Client;
pub use collection::Collection;
pub use config::Config;
pub use context::Context;
pub use entity::{Attrs, Entity};
pub use error::{ConnectError, Result};
pub use pagination::{PageMarker, Pagination, DEFAULT_PAGE_SIZE};
pub use query::Query;
pub use record::{Record, Sequence};
pub use transport::{HttpTransport, Method, Request, Response, Transport};

// Re-export traits
pub use traits::{Contextual, Create, Delete, Fetchable, Queryable, Resource, Update};

// Re-export models
pub use models::{
    // Content types
    Bundle,
    ContentItem,
    ContentItemOwner,
    Environment,
    Repository,
    Task,
    Vanity,
    // Permission types
    Permission,
    PrincipalType,
    Role,
    // Job types
    Job,
    // User and group types
    Group,
    User,
    UserRole,
    // Instrumentation types
    ShinyUsageEvent,
    VisitEvent,
};
