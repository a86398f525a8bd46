//! Content items, their owners, git repositories and vanity URLs.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::collection::Collection;
use crate::context::Context;
use crate::entity::{Attrs, Entity};
use crate::error::{ConnectError, Result};
use crate::pagination::Pagination;
use crate::record::Record;
use crate::schema::{Actions, QueryField, Schema};
use crate::traits::{Delete, Resource, Update};
use crate::transport::{Method, Request};

use super::bundle::deploy;
use super::vanity::VANITY;
use super::{Bundle, Environment, Job, Permission, Task, Vanity};

pub(crate) const CONTENT_ITEM: Schema = Schema {
    name: "content item",
    path: "v1/content",
    id_field: Some("guid"),
    context_key: Some("content_guid"),
    fields: &[],
    queries: &[
        QueryField::native("owner_guid"),
        QueryField::native("name"),
        QueryField::param("include", "include"),
    ],
    pagination: Pagination::None,
    actions: Actions {
        create: true,
        update: Some(Method::Patch),
        delete: true,
    },
};

pub(crate) const CONTENT_ITEM_OWNER: Schema = Schema {
    name: "content item owner",
    path: "v1/users",
    id_field: Some("guid"),
    context_key: None,
    fields: &[],
    queries: &[],
    pagination: Pagination::None,
    actions: Actions::READ_ONLY,
};

pub(crate) const REPOSITORY: Schema = Schema {
    name: "repository",
    path: "v1/content/{content_guid}/repository",
    id_field: None,
    context_key: None,
    fields: &[],
    queries: &[],
    pagination: Pagination::None,
    actions: Actions {
        create: false,
        update: Some(Method::Patch),
        delete: true,
    },
};

resource!(
    /// A piece of content published to Connect.
    ///
    /// Content items are the top-level containers for deployed work. Each
    /// item has its own permissions, jobs, bundles and environment, and
    /// optionally a git repository it deploys from and a vanity URL.
    ContentItem => CONTENT_ITEM
);

impl Update for ContentItem {}
impl Delete for ContentItem {}

impl ContentItem {
    pub fn guid(&self) -> Result<&str> {
        self.0.field_str("guid")
    }

    pub fn name(&self) -> Result<&str> {
        self.0.field_str("name")
    }

    pub fn title(&self) -> Result<Option<String>> {
        self.0.field_opt("title")
    }

    /// Runtime type, such as `shiny`, `python-streamlit` or `quarto-static`.
    pub fn app_mode(&self) -> Result<&str> {
        self.0.field_str("app_mode")
    }

    pub fn owner_guid(&self) -> Result<&str> {
        self.0.field_str("owner_guid")
    }

    pub fn created_time(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("created_time")
    }

    pub fn last_deployed_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.0.field_opt("last_deployed_time")
    }

    pub fn content_url(&self) -> Result<&str> {
        self.0.field_str("content_url")
    }

    /// Who can view or manage this item.
    pub fn permissions(&self) -> Result<Collection<Permission>> {
        Collection::new(self.0.context())
    }

    /// Processes run on behalf of this item.
    pub fn jobs(&self) -> Result<Collection<Job>> {
        Collection::new(self.0.context())
    }

    /// Uploaded source archives.
    pub fn bundles(&self) -> Result<Collection<Bundle>> {
        Collection::new(self.0.context())
    }

    /// Environment variables the item runs with.
    pub fn environment(&self) -> Result<Environment> {
        Environment::new(self.0.context())
    }

    /// Redeploy the active bundle, returning the server task doing the work.
    pub async fn deploy(&self) -> Result<Task> {
        deploy(self.0.context(), json!({ "bundle_id": null })).await
    }

    /// The item's owner.
    ///
    /// Uses the `owner` object when the item was fetched with
    /// `include=owner`; otherwise looks the owner up by `owner_guid`.
    /// Returns `None` if the owner no longer exists.
    pub async fn owner(&self) -> Result<Option<ContentItemOwner>> {
        let ctx = self.0.context();

        match self.0.raw().get("owner") {
            Some(Value::Object(owner)) => {
                let record = Record::new(owner.clone());
                return Ok(Some(ContentItemOwner(Entity::embedded(ctx, &CONTENT_ITEM_OWNER, record))));
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(ConnectError::FieldType {
                    field: "owner".to_string(),
                    expected: "object",
                })
            }
        }

        let Some(owner_guid) = self.0.field_opt::<String>("owner_guid")? else {
            return Ok(None);
        };
        let path = format!("v1/users/{}", urlencoding::encode(&owner_guid));
        match ctx.send(Request::get(&path)).await {
            Ok(response) => {
                let record = Record::from_value(&path, response.body)?;
                Ok(Some(ContentItemOwner(Entity::embedded(ctx, &CONTENT_ITEM_OWNER, record))))
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// The git repository this item deploys from, or `None` if it has none.
    pub async fn repository(&self) -> Result<Option<Repository>> {
        Ok(singleton(self.0.context(), &REPOSITORY).await?.map(Repository))
    }

    /// Attach a git repository to this item.
    pub async fn create_repository(&self, attrs: Attrs) -> Result<Repository> {
        let body = attrs.to_wire(&REPOSITORY);
        Ok(Repository(put_singleton(self.0.context(), &REPOSITORY, body).await?))
    }

    /// The item's vanity URL, or `None` if it has none.
    pub async fn vanity(&self) -> Result<Option<Vanity>> {
        Ok(singleton(self.0.context(), &VANITY).await?.map(Vanity::from_entity))
    }

    /// Serve this item at `path` as well as its own URL.
    ///
    /// Replaces the item's current vanity. With `force`, also takes `path`
    /// away from another item that holds it.
    pub async fn create_vanity(&self, path: &str, force: bool) -> Result<Vanity> {
        let mut body = Map::new();
        body.insert("path".to_string(), Value::String(path.to_string()));
        if force {
            body.insert("force".to_string(), Value::Bool(true));
        }
        Ok(Vanity::from_entity(put_singleton(self.0.context(), &VANITY, body).await?))
    }
}

/// Read the singleton at `schema`'s path; `None` if the server has none.
async fn singleton(ctx: &Context, schema: &'static Schema) -> Result<Option<Entity>> {
    let path = ctx.resolve(schema.name, schema.path)?;

    match ctx.send(Request::get(&path)).await {
        Ok(response) => {
            let record = Record::from_value(&path, response.body)?;
            Ok(Some(Entity::at(ctx, schema, path, record)))
        }
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Create or replace the singleton at `schema`'s path.
async fn put_singleton(ctx: &Context, schema: &'static Schema, body: Map<String, Value>) -> Result<Entity> {
    let path = ctx.resolve(schema.name, schema.path)?;
    let response = ctx
        .send(Request::new(Method::Put, &path).body(Value::Object(body)))
        .await?;
    let record = Record::from_value(&path, response.body)?;
    Ok(Entity::at(ctx, schema, path, record))
}

resource!(
    /// The user who owns a content item, as embedded in the item.
    ///
    /// Read-only: manage the account through [`User`](crate::User).
    ContentItemOwner => CONTENT_ITEM_OWNER
);

impl ContentItemOwner {
    pub fn guid(&self) -> Result<&str> {
        self.0.field_str("guid")
    }

    pub fn username(&self) -> Result<&str> {
        self.0.field_str("username")
    }

    pub fn first_name(&self) -> Result<Option<String>> {
        self.0.field_opt("first_name")
    }

    pub fn last_name(&self) -> Result<Option<String>> {
        self.0.field_opt("last_name")
    }
}

resource!(
    /// Git repository settings for a content item.
    Repository => REPOSITORY
);

impl Update for Repository {}
impl Delete for Repository {}

impl Repository {
    pub fn repository(&self) -> Result<&str> {
        self.0.field_str("repository")
    }

    pub fn branch(&self) -> Result<&str> {
        self.0.field_str("branch")
    }

    pub fn directory(&self) -> Result<&str> {
        self.0.field_str("directory")
    }

    pub fn polling(&self) -> Result<bool> {
        self.0.field_as("polling")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubTransport};
    use crate::traits::Contextual;
    use crate::transport::Response;
    use serde_json::json;

    fn item(ctx: &crate::Context, value: Value) -> ContentItem {
        let record = Record::from_value("v1/content", value).unwrap();
        ContentItem::from_entity(Entity::member(ctx, &CONTENT_ITEM, "v1/content", record))
    }

    #[test]
    fn test_children_inherit_content_guid() {
        let (ctx, _) = context(StubTransport::default());
        let item = item(&ctx, json!({"guid": "c1", "name": "report"}));

        assert_eq!(item.context().id("content_guid"), Some("c1"));
        assert_eq!(item.permissions().unwrap().path(), "v1/content/c1/permissions");
        assert_eq!(item.jobs().unwrap().path(), "v1/content/c1/jobs");
        assert_eq!(item.bundles().unwrap().path(), "v1/content/c1/bundles");
        assert_eq!(item.environment().unwrap().path(), "v1/content/c1/environment");
    }

    #[tokio::test]
    async fn test_embedded_owner_is_read_only() {
        let (ctx, transport) = context(StubTransport::default());
        let item = item(
            &ctx,
            json!({"guid": "c1", "owner_guid": "u1", "owner": {"guid": "u1", "username": "carlos"}}),
        );

        let owner = item.owner().await.unwrap().unwrap();
        assert_eq!(owner.username().unwrap(), "carlos");
        assert!(transport.requests().is_empty());
        assert!(matches!(
            owner.entity().update(Attrs::new().set("username", "x")).await,
            Err(ConnectError::Immutable { .. })
        ));
    }

    #[tokio::test]
    async fn test_owner_looked_up_by_guid() {
        let (ctx, transport) = context(StubTransport::new(|request| {
            assert_eq!(request.path, "v1/users/u1");
            Ok(Response::ok(json!({"guid": "u1", "username": "carlos"})))
        }));
        let item = item(&ctx, json!({"guid": "c1", "owner_guid": "u1"}));

        let owner = item.owner().await.unwrap().unwrap();
        assert_eq!(owner.guid().unwrap(), "u1");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_repository_absent_on_404() {
        let (ctx, _) = context(StubTransport::default());
        let item = item(&ctx, json!({"guid": "c1"}));
        assert_eq!(item.repository().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_repository_propagates_server_errors() {
        let (ctx, _) = context(StubTransport::new(|_| {
            Err(ConnectError::ApiError {
                message: "boom".to_string(),
                status_code: Some(500),
                error_code: None,
            })
        }));
        let item = item(&ctx, json!({"guid": "c1"}));
        assert!(item.repository().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_repository_update_patches_singleton_path() {
        let (ctx, transport) = context(StubTransport::new(|request| match request.method {
            Method::Get => Ok(Response::ok(json!({"repository": "https://github.com/org/app", "branch": "main"}))),
            _ => Ok(Response::ok(json!({"branch": "release"}))),
        }));
        let item = item(&ctx, json!({"guid": "c1"}));

        let repo = item.repository().await.unwrap().unwrap();
        let updated = repo.update(Attrs::new().set("branch", "release")).await.unwrap();

        assert_eq!(updated.branch().unwrap(), "release");
        assert_eq!(repo.branch().unwrap(), "main");
        let requests = transport.requests();
        assert_eq!(requests[1].method, Method::Patch);
        assert_eq!(requests[1].path, "v1/content/c1/repository");
    }

    #[tokio::test]
    async fn test_deploy_redeploys_active_bundle() {
        let (ctx, transport) = context(StubTransport::new(|request| match request.method {
            Method::Post => Ok(Response::ok(json!({"task_id": "t1"}))),
            _ => Ok(Response::ok(json!({"id": "t1", "finished": true, "code": 0}))),
        }));
        let item = item(&ctx, json!({"guid": "c1"}));

        let task = item.deploy().await.unwrap();

        assert_eq!(task.error_code().unwrap(), Some(0));
        let requests = transport.requests();
        assert_eq!(requests[0].path, "v1/content/c1/deploy");
        assert_eq!(requests[0].body, Some(json!({"bundle_id": null})));
        assert_eq!(requests[1].path, "v1/tasks/t1");
    }

    #[tokio::test]
    async fn test_vanity_absent_on_404() {
        let (ctx, transport) = context(StubTransport::default());
        let item = item(&ctx, json!({"guid": "c1"}));

        assert_eq!(item.vanity().await.unwrap(), None);
        assert_eq!(transport.requests()[0].path, "v1/content/c1/vanity");
    }

    #[tokio::test]
    async fn test_create_vanity_sends_force_only_when_asked() {
        let (ctx, transport) = context(StubTransport::new(|request| match request.method {
            Method::Put => {
                let mut body = request.body.clone().unwrap_or(Value::Null);
                body["content_guid"] = json!("c1");
                Ok(Response::ok(body))
            }
            _ => Ok(Response::new(204, Value::Null)),
        }));
        let item = item(&ctx, json!({"guid": "c1"}));

        let vanity = item.create_vanity("/sales/", false).await.unwrap();
        item.create_vanity("/sales/", true).await.unwrap();
        vanity.destroy().await.unwrap();

        assert_eq!(vanity.path().unwrap(), "/sales/");
        assert_eq!(vanity.content_guid().unwrap(), "c1");
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Put);
        assert_eq!(requests[0].body, Some(json!({"path": "/sales/"})));
        assert_eq!(requests[1].body, Some(json!({"path": "/sales/", "force": true})));
        assert_eq!(requests[2].method, Method::Delete);
        assert_eq!(requests[2].path, "v1/content/c1/vanity");
    }
}
