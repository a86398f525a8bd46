//! Deployment bundles and the deploy action.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::context::Context;
use crate::error::Result;
use crate::pagination::Pagination;
use crate::schema::{Actions, Schema};
use crate::traits::Delete;
use crate::transport::{Method, Request};

use super::task::{started_task, Task};

pub(crate) const BUNDLE: Schema = Schema {
    name: "bundle",
    path: "v1/content/{content_guid}/bundles",
    id_field: Some("id"),
    context_key: None,
    fields: &[],
    queries: &[],
    pagination: Pagination::None,
    actions: Actions {
        create: false,
        update: None,
        delete: true,
    },
};

const DEPLOY_PATH: &str = "v1/content/{content_guid}/deploy";

resource!(
    /// One uploaded source archive of a content item.
    Bundle => BUNDLE
);

impl Delete for Bundle {}

impl Bundle {
    pub fn id(&self) -> Result<String> {
        self.0.field_as::<Value>("id").map(|id| match id {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn content_guid(&self) -> Result<&str> {
        self.0.field_str("content_guid")
    }

    pub fn created_time(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("created_time")
    }

    /// Whether this is the bundle the item currently serves.
    pub fn active(&self) -> Result<bool> {
        Ok(self.0.field_opt("active")?.unwrap_or(false))
    }

    /// Archive size in bytes.
    pub fn size(&self) -> Result<Option<u64>> {
        self.0.field_opt("size")
    }

    /// Source details recorded at upload: git origin, commit, archive name.
    pub fn metadata(&self) -> Result<Map<String, Value>> {
        Ok(self.0.field_opt("metadata")?.unwrap_or_default())
    }

    /// Deploy this bundle, returning the server task doing the work.
    pub async fn deploy(&self) -> Result<Task> {
        let id = self.id()?;
        deploy(self.0.context(), json!({ "bundle_id": id })).await
    }

    /// Remove the bundle. The active bundle cannot be removed.
    pub async fn destroy(&self) -> Result<()> {
        self.delete().await
    }
}

/// Start a deployment for the content item in `ctx`.
#[tracing::instrument(skip(ctx))]
pub(crate) async fn deploy(ctx: &Context, body: Value) -> Result<Task> {
    let path = ctx.resolve("deployment", DEPLOY_PATH)?;
    let response = ctx
        .send(Request::new(Method::Post, &path).body(body))
        .await?;
    started_task(ctx, &path, &response.body).await
}
