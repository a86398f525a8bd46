//! Environment variables of a content item.
//!
//! The server never returns values, only names, so this is a handle with
//! set and unset operations rather than a collection of entities.

use serde_json::{json, Value};

use crate::context::Context;
use crate::error::{ConnectError, Result};
use crate::traits::Contextual;
use crate::transport::{Method, Request};

const ENVIRONMENT_PATH: &str = "v1/content/{content_guid}/environment";

/// The environment variables a content item runs with.
#[derive(Debug, Clone)]
pub struct Environment {
    ctx: Context,
    path: String,
}

impl Environment {
    pub(crate) fn new(ctx: &Context) -> Result<Self> {
        Ok(Self {
            ctx: ctx.clone(),
            path: ctx.resolve("environment", ENVIRONMENT_PATH)?,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Names of the variables currently set.
    pub async fn names(&self) -> Result<Vec<String>> {
        let response = self.ctx.send(Request::get(&self.path)).await?;
        self.names_from(response.body)
    }

    /// Set each `(name, value)` pair, leaving other variables alone.
    ///
    /// Returns the names set afterwards.
    pub async fn set<I, K, V>(&self, vars: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let changes = vars
            .into_iter()
            .map(|(name, value)| json!({"name": name.into(), "value": value.into()}))
            .collect();
        self.patch(changes).await
    }

    /// Remove the named variables. Unknown names are ignored by the server.
    ///
    /// Returns the names set afterwards.
    pub async fn unset<I, K>(&self, names: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let changes = names
            .into_iter()
            .map(|name| json!({"name": name.into(), "value": null}))
            .collect();
        self.patch(changes).await
    }

    #[tracing::instrument(skip(self, changes), fields(path = %self.path))]
    async fn patch(&self, changes: Vec<Value>) -> Result<Vec<String>> {
        if changes.is_empty() {
            return self.names().await;
        }
        let request = Request::new(Method::Patch, &self.path).body(Value::Array(changes));
        let response = self.ctx.send(request).await?;
        self.names_from(response.body)
    }

    fn names_from(&self, body: Value) -> Result<Vec<String>> {
        serde_json::from_value(body).map_err(|_| ConnectError::UnexpectedResponse {
            path: self.path.clone(),
            reason: "expected an array of variable names".to_string(),
        })
    }
}

impl Contextual for Environment {
    fn context(&self) -> &Context {
        &self.ctx
    }
}
