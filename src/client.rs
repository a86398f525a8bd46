//! Connect API client.
//!
//! The root of the resource graph. It owns the root [`Context`] and hands
//! out the top-level collections; everything else is reached by navigating
//! from those.

use std::sync::Arc;

use crate::collection::Collection;
use crate::config::Config;
use crate::context::Context;
use crate::error::{ConnectError, Result};
use crate::models::{current_user, ContentItem, Group, ShinyUsageEvent, Task, User, VisitEvent};
use crate::traits::Queryable;
use crate::transport::{HttpTransport, Request, Transport};

/// Connect API client.
///
/// This struct is cheaply cloneable; clones share the same transport and
/// its connection pool.
///
/// # Example
///
/// ```no_run
/// use connectapi::{Client, Config, Fetchable};
///
/// # async fn example() -> connectapi::Result<()> {
/// // Create from environment variables
/// let client = Client::from_env()?;
///
/// // Or configure manually
/// let config = Config::new("https://connect.example.com", "your-api-key")?;
/// let client = Client::new(config)?;
///
/// let users = client.users()?;
/// println!("{} users", users.count().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    ctx: Context,
}

impl Client {
    /// Create a client for the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        tracing::debug!(url = %config.url(), "client created");
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client from `CONNECT_SERVER` and `CONNECT_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is not set.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Create a client over any [`Transport`].
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            ctx: Context::new(transport),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// All content items visible to the caller.
    pub fn content(&self) -> Result<Collection<ContentItem>> {
        Collection::new(&self.ctx)
    }

    pub fn users(&self) -> Result<Collection<User>> {
        Collection::new(&self.ctx)
    }

    pub fn groups(&self) -> Result<Collection<Group>> {
        Collection::new(&self.ctx)
    }

    /// Content visit events.
    pub fn visits(&self) -> Result<Collection<VisitEvent>> {
        Collection::new(&self.ctx)
    }

    /// Shiny application session events.
    pub fn shiny_usage(&self) -> Result<Collection<ShinyUsageEvent>> {
        Collection::new(&self.ctx)
    }

    /// Look up a background task, such as a deployment, by id.
    pub async fn task(&self, id: &str) -> Result<Task> {
        Collection::<Task>::new(&self.ctx)?.get(id).await
    }

    /// The user the API key belongs to.
    pub async fn me(&self) -> Result<User> {
        current_user(&self.ctx).await
    }

    /// Version string the server reports, such as `2024.08.0`.
    pub async fn server_version(&self) -> Result<String> {
        let path = "server_settings";
        let response = self.ctx.send(Request::get(path)).await?;
        response
            .body
            .get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ConnectError::UnexpectedResponse {
                path: path.to_string(),
                reason: "missing 'version'".to_string(),
            })
    }
}

impl crate::traits::Contextual for Client {
    fn context(&self) -> &Context {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubTransport;
    use crate::transport::Response;
    use serde_json::json;

    fn client(transport: StubTransport) -> Client {
        Client::with_transport(Arc::new(transport))
    }

    #[test]
    fn test_root_collections() {
        let client = client(StubTransport::default());
        assert_eq!(client.content().unwrap().path(), "v1/content");
        assert_eq!(client.users().unwrap().path(), "v1/users");
        assert_eq!(client.groups().unwrap().path(), "v1/groups");
        assert_eq!(client.visits().unwrap().path(), "v1/instrumentation/content/visits");
        assert_eq!(client.shiny_usage().unwrap().path(), "v1/instrumentation/shiny/usage");
    }

    #[tokio::test]
    async fn test_server_version() {
        let client = client(StubTransport::new(|request| {
            assert_eq!(request.path, "server_settings");
            Ok(Response::ok(json!({"version": "2024.08.0", "build": "abc"})))
        }));
        assert_eq!(client.server_version().await.unwrap(), "2024.08.0");
    }

    #[tokio::test]
    async fn test_me() {
        let client = client(StubTransport::new(|_| {
            Ok(Response::ok(json!({"guid": "u1", "username": "carlos"})))
        }));
        let me = client.me().await.unwrap();
        assert_eq!(me.username().unwrap(), "carlos");
        assert_eq!(me.content().unwrap().params()[0].1, "u1");
    }
}
