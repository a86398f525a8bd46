//! Lazily fetched, queryable collections.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::context::Context;
use crate::entity::{Attrs, Entity};
use crate::error::{ConnectError, Result};
use crate::pagination::Paginator;
use crate::query::{merge_params, Filter, Query};
use crate::record::{Record, Sequence};
use crate::traits::{Contextual, Create, Fetchable, Queryable, Resource};
use crate::transport::{Method, Request};

/// The members of one collection endpoint.
///
/// A collection is either resolved (its members are known) or unresolved,
/// in which case the first [`Fetchable::fetch`] walks every page and
/// publishes the result in one step. Each instance fetches at most once;
/// [`Queryable::find`] returns a fresh instance.
pub struct Collection<T> {
    ctx: Context,
    path: String,
    params: Vec<(String, String)>,
    filters: Vec<Filter>,
    data: OnceCell<Sequence<T>>,
}

impl<T: Clone> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            path: self.path.clone(),
            params: self.params.clone(),
            filters: self.filters.clone(),
            data: self.data.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("filters", &self.filters)
            .field("data", &self.data.get())
            .finish()
    }
}

impl<T: Resource> Collection<T> {
    /// An unresolved collection at the resource's path under `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::MissingIdentifier`] if the path needs a parent
    /// identifier `ctx` does not carry.
    pub fn new(ctx: &Context) -> Result<Self> {
        let path = ctx.resolve(T::SCHEMA.name, T::SCHEMA.path)?;
        Ok(Self {
            ctx: ctx.clone(),
            path,
            params: Vec::new(),
            filters: Vec::new(),
            data: OnceCell::new(),
        })
    }

    /// A collection whose members are already known.
    pub fn resolved(ctx: &Context, path: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            ctx: ctx.clone(),
            path: path.into(),
            params: Vec::new(),
            filters: Vec::new(),
            data: OnceCell::from(Sequence::from(items)),
        }
    }

    /// Send `key=value` with every request this collection makes.
    ///
    /// When `key` is a native query field the value also scopes `get` and
    /// later `find` calls, so members outside it are never returned.
    #[must_use]
    pub(crate) fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.params = merge_params(&self.params, &[(key.to_string(), value.clone())]);

        let pinned = Query::new().eq(key, value).plan(T::SCHEMA);
        for filter in pinned.record_filters {
            self.filters.retain(|f| f.field != filter.field);
            self.filters.push(filter);
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters sent when fetching.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_resolved(&self) -> bool {
        self.data.initialized()
    }

    /// Members, if already fetched.
    pub fn items(&self) -> Option<&Sequence<T>> {
        self.data.get()
    }

    fn derive(&self, params: Vec<(String, String)>, filters: Vec<Filter>, data: OnceCell<Sequence<T>>) -> Self {
        Self {
            ctx: self.ctx.clone(),
            path: self.path.clone(),
            params,
            filters,
            data,
        }
    }

    fn member(&self, record: Record) -> T {
        T::from_entity(Entity::member(&self.ctx, T::SCHEMA, &self.path, record))
    }

    async fn load(&self) -> Result<Sequence<T>> {
        let results = Paginator::new(&self.ctx, &self.path, T::SCHEMA.pagination)
            .params(&self.params)
            .fetch_results()
            .await?;

        let mut items = Vec::with_capacity(results.len());
        for value in results {
            let record = Record::from_value(&self.path, value)?;
            if self.filters.iter().all(|f| f.matches(&record)) {
                items.push(self.member(record));
            }
        }

        tracing::debug!(path = %self.path, count = items.len(), "collection resolved");
        Ok(Sequence::from(items))
    }

    /// Whether `a` and `b` are the same member, by id where the resource
    /// has one.
    fn same_member(a: &T, b: &T) -> bool {
        match (a.id(), b.id()) {
            (Some(a), Some(b)) => a == b,
            _ => a.raw() == b.raw(),
        }
    }
}

impl<T> Contextual for Collection<T> {
    fn context(&self) -> &Context {
        &self.ctx
    }
}

#[async_trait]
impl<T: Resource> Fetchable for Collection<T> {
    type Item = T;

    #[tracing::instrument(skip(self), fields(path = %self.path))]
    async fn fetch(&self) -> Result<&Sequence<T>> {
        self.data.get_or_try_init(|| self.load()).await
    }
}

#[async_trait]
impl<T: Resource> Queryable for Collection<T> {
    type Item = T;

    #[tracing::instrument(skip(self, query), fields(path = %self.path, criteria = query.len()))]
    async fn find(&self, query: Query) -> Result<Self> {
        let plan = query.plan(T::SCHEMA);
        let held = |key: &str| self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v);
        let is_param_only = |key: &str| plan.param_only.iter().any(|(k, _)| k == key);

        // Record-backed criteria only ever narrow: they join this
        // collection's filters, including the ones pinned by its parameters.
        let mut filters = self.filters.clone();
        for filter in plan.record_filters {
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }

        // A parameter-only criterion can't be checked against records. A new
        // one needs a server request; one that contradicts a held value is
        // answered by the server and then intersected with this collection.
        let replaced = plan
            .param_only
            .iter()
            .any(|(k, v)| held(k.as_str()).is_some_and(|h| h != v));
        let unsent = plan.param_only.iter().any(|(k, _)| held(k.as_str()).is_none());

        if let (Some(items), false, false) = (self.data.get(), replaced, unsent) {
            let filtered: Sequence<T> = items
                .iter()
                .filter(|item| filters.iter().all(|f| f.matches(item.raw())))
                .cloned()
                .collect();
            return Ok(self.derive(self.params.clone(), filters, OnceCell::from(filtered)));
        }

        // Held native values stay; a conflicting native criterion is left to
        // its record filter.
        let mut params = self.params.clone();
        for (key, value) in plan.params {
            match held(key.as_str()) {
                None => params.push((key, value)),
                Some(h) if *h != value && is_param_only(key.as_str()) => {
                    params = merge_params(&params, &[(key, value)]);
                }
                Some(_) => {}
            }
        }

        let found = self.derive(params, filters, OnceCell::new());
        if !replaced {
            found.fetch().await?;
            return Ok(found);
        }

        tracing::debug!("intersecting re-query with the current members");
        let current = self.fetch().await?;
        let kept: Sequence<T> = found
            .fetch()
            .await?
            .iter()
            .filter(|item| current.iter().any(|c| Self::same_member(c, item)))
            .cloned()
            .collect();
        Ok(self.derive(found.params, found.filters, OnceCell::from(kept)))
    }

    async fn find_one(&self, query: Query) -> Result<Option<T>> {
        let found = self.find(query).await?;
        let first = found.fetch().await?.first().cloned();
        Ok(first)
    }

    #[tracing::instrument(skip(self), fields(path = %self.path))]
    async fn get(&self, id: &str) -> Result<T> {
        let Some(id_field) = T::SCHEMA.id_field else {
            return Err(ConnectError::Unsupported {
                resource: T::SCHEMA.name,
                operation: "get",
            });
        };
        let path = format!("{}/{}", self.path, urlencoding::encode(id));

        if let Some(items) = self.data.get() {
            return items
                .iter()
                .find(|item| item.id().as_deref() == Some(id))
                .cloned()
                .ok_or(ConnectError::NotFound { path });
        }

        let response = self.ctx.send(Request::get(&path)).await?;
        let record = Record::from_value(&path, response.body)?;

        // A member outside this collection's filters is not in it.
        if !self.filters.iter().all(|f| f.matches(&record)) {
            return Err(ConnectError::NotFound { path });
        }
        if record.get(id_field).is_none() {
            return Err(ConnectError::UnexpectedResponse {
                path,
                reason: format!("response has no '{id_field}'"),
            });
        }

        Ok(self.member(record))
    }
}

#[async_trait]
impl<T: Resource> Create for Collection<T> {
    type Item = T;

    #[tracing::instrument(skip(self, attrs), fields(path = %self.path))]
    async fn create(&self, attrs: Attrs) -> Result<T> {
        if !T::SCHEMA.actions.create {
            return Err(ConnectError::Immutable {
                resource: T::SCHEMA.name,
                operation: "create",
            });
        }

        let body = Value::Object(attrs.to_wire(T::SCHEMA));
        let response = self
            .ctx
            .send(Request::new(Method::Post, &self.path).body(body))
            .await?;
        let record = Record::from_value(&self.path, response.body)?;

        Ok(self.member(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Pagination;
    use crate::schema::{Actions, QueryField, Schema};
    use crate::testing::{context, param, StubTransport};
    use crate::transport::Response;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(Entity);

    impl Resource for Item {
        const SCHEMA: &'static Schema = &Schema {
            name: "item",
            path: "v1/items",
            id_field: Some("guid"),
            context_key: None,
            fields: &[],
            queries: &[QueryField::native("owner_guid"), QueryField::param("prefix", "prefix")],
            pagination: Pagination::Offset { page_size: 500 },
            actions: Actions::READ_ONLY,
        };

        fn from_entity(entity: Entity) -> Self {
            Self(entity)
        }

        fn entity(&self) -> &Entity {
            &self.0
        }
    }

    fn data() -> Vec<Value> {
        vec![
            json!({"guid": "a1", "app_mode": "streamlit", "owner_guid": "u1", "name": "alpha"}),
            json!({"guid": "a2", "app_mode": "shiny", "owner_guid": "u1", "name": "beta"}),
            json!({"guid": "a3", "app_mode": "streamlit", "owner_guid": "u2", "name": "gamma"}),
            json!({"guid": "a4", "app_mode": "quarto", "owner_guid": "u2", "name": "delta"}),
        ]
    }

    /// Serves `data()` in pages of two, honouring `owner_guid` and `prefix`.
    fn server() -> StubTransport {
        StubTransport::new(|request| {
            if let Some(id) = request.path.strip_prefix("v1/items/") {
                return data()
                    .into_iter()
                    .find(|r| r["guid"] == id)
                    .map(Response::ok)
                    .ok_or(ConnectError::NotFound {
                        path: request.path.clone(),
                    });
            }

            let matching: Vec<Value> = data()
                .into_iter()
                .filter(|r| param(request, "owner_guid").map_or(true, |o| r["owner_guid"] == o))
                .filter(|r| {
                    param(request, "prefix")
                        .map_or(true, |p| r["name"].as_str().unwrap().starts_with(p))
                })
                .collect();
            let page: usize = param(request, "page_number").unwrap().parse().unwrap();
            let items: Vec<Value> = matching.iter().skip((page - 1) * 2).take(2).cloned().collect();
            Ok(Response::ok(json!({
                "results": items,
                "current_page": page,
                "total": matching.len(),
            })))
        })
    }

    async fn guids(collection: &Collection<Item>) -> Vec<String> {
        let items = collection.fetch().await.unwrap();
        items.iter().filter_map(Resource::id).collect()
    }

    #[tokio::test]
    async fn test_fetch_walks_all_pages_once() {
        let (ctx, transport) = context(server());
        let items = Collection::<Item>::new(&ctx).unwrap();

        assert!(!items.is_resolved());
        assert_eq!(items.count().await.unwrap(), 4);
        assert_eq!(items.fetch().await.unwrap().len(), 4);
        assert_eq!(guids(&items).await, vec!["a1", "a2", "a3", "a4"]);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_find_filters_unknown_fields_locally() {
        let (ctx, transport) = context(server());
        let found = Collection::<Item>::new(&ctx)
            .unwrap()
            .find(Query::new().eq("app_mode", "streamlit"))
            .await
            .unwrap();

        assert!(found.is_resolved());
        assert_eq!(guids(&found).await, vec!["a1", "a3"]);
        for request in transport.requests() {
            assert_eq!(param(&request, "app_mode"), None);
        }
    }

    #[tokio::test]
    async fn test_find_sends_native_fields() {
        let (ctx, transport) = context(server());
        let found = Collection::<Item>::new(&ctx)
            .unwrap()
            .find(Query::new().eq("owner_guid", "u2"))
            .await
            .unwrap();

        assert_eq!(guids(&found).await, vec!["a3", "a4"]);
        assert_eq!(param(&transport.requests()[0], "owner_guid"), Some("u2"));
    }

    #[tokio::test]
    async fn test_find_on_resolved_collection_filters_locally() {
        let (ctx, transport) = context(server());
        let first = Collection::<Item>::new(&ctx)
            .unwrap()
            .find(Query::new().eq("owner_guid", "u1").eq("app_mode", "streamlit"))
            .await
            .unwrap();
        let sent = transport.requests().len();

        let again = first.find(Query::new().eq("app_mode", "streamlit")).await.unwrap();
        assert_eq!(guids(&again).await, guids(&first).await);
        assert_eq!(guids(&again).await, vec!["a1"]);
        assert_eq!(transport.requests().len(), sent);
    }

    #[tokio::test]
    async fn test_find_with_new_param_requeries() {
        let (ctx, transport) = context(server());
        let first = Collection::<Item>::new(&ctx)
            .unwrap()
            .find(Query::new().eq("app_mode", "streamlit"))
            .await
            .unwrap();
        let sent = transport.requests().len();

        let narrowed = first.find(Query::new().eq("prefix", "ga")).await.unwrap();
        assert_eq!(guids(&narrowed).await, vec!["a3"]);
        assert!(transport.requests().len() > sent);

        let same = narrowed.find(Query::new().eq("prefix", "ga")).await.unwrap();
        assert_eq!(guids(&same).await, vec!["a3"]);
    }

    #[tokio::test]
    async fn test_find_nothing_is_empty() {
        let (ctx, _) = context(server());
        let items = Collection::<Item>::new(&ctx).unwrap();
        let found = items.find(Query::new().eq("app_mode", "rmarkdown")).await.unwrap();
        assert_eq!(found.count().await.unwrap(), 0);
        assert_eq!(items.find_one(Query::new().eq("app_mode", "rmarkdown")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_one_returns_first_match() {
        let (ctx, _) = context(server());
        let item = Collection::<Item>::new(&ctx)
            .unwrap()
            .find_one(Query::new().eq("app_mode", "streamlit"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.id().as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_get_unresolved_requests_member() {
        let (ctx, transport) = context(server());
        let items = Collection::<Item>::new(&ctx).unwrap();

        let item = items.get("a2").await.unwrap();
        assert_eq!(item.id().as_deref(), Some("a2"));
        assert_eq!(item.entity().path(), Some("v1/items/a2"));
        assert_eq!(transport.requests()[0].path, "v1/items/a2");

        assert!(items.get("zz").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_get_resolved_searches_members() {
        let (ctx, transport) = context(server());
        let found = Collection::<Item>::new(&ctx)
            .unwrap()
            .find(Query::new().eq("app_mode", "streamlit"))
            .await
            .unwrap();
        let sent = transport.requests().len();

        assert_eq!(found.get("a3").await.unwrap().id().as_deref(), Some("a3"));
        assert!(found.get("a2").await.unwrap_err().is_not_found());
        assert_eq!(transport.requests().len(), sent);
    }

    #[tokio::test]
    async fn test_create_on_read_only_resource() {
        let (ctx, transport) = context(server());
        let result = Collection::<Item>::new(&ctx)
            .unwrap()
            .create(Attrs::new().set("name", "epsilon"))
            .await;
        assert!(matches!(result, Err(ConnectError::Immutable { operation: "create", .. })));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_publishes_nothing() {
        let (ctx, _) = context(StubTransport::new(|_| {
            Err(ConnectError::ApiError {
                message: "unavailable".to_string(),
                status_code: Some(503),
                error_code: None,
            })
        }));
        let items = Collection::<Item>::new(&ctx).unwrap();

        assert!(items.fetch().await.unwrap_err().is_transport());
        assert!(!items.is_resolved());
        assert!(items.items().is_none());
    }

    #[test]
    fn test_with_param_replaces_existing() {
        let (ctx, _) = context(StubTransport::default());
        let items = Collection::<Item>::new(&ctx)
            .unwrap()
            .with_param("owner_guid", "u1")
            .with_param("owner_guid", "u2");
        assert_eq!(items.params(), &[("owner_guid".to_string(), "u2".to_string())]);
        assert_eq!(items.filters.len(), 1);
    }

    #[tokio::test]
    async fn test_scoped_collection_never_widens() {
        let (ctx, transport) = context(server());
        let owned = Collection::<Item>::new(&ctx).unwrap().with_param("owner_guid", "u1");

        let other = owned.find(Query::new().eq("owner_guid", "u2")).await.unwrap();
        assert!(guids(&other).await.is_empty());
        for request in transport.requests() {
            assert_eq!(param(&request, "owner_guid"), Some("u1"));
        }

        let same = owned.find(Query::new().eq("owner_guid", "u1")).await.unwrap();
        assert_eq!(guids(&same).await, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn test_scoped_get_rejects_outside_members() {
        let (ctx, _) = context(server());
        let owned = Collection::<Item>::new(&ctx).unwrap().with_param("owner_guid", "u1");

        assert_eq!(owned.get("a2").await.unwrap().id().as_deref(), Some("a2"));
        assert!(owned.get("a3").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_conflicting_param_intersects_with_members() {
        let (ctx, transport) = context(server());
        let alpha = Collection::<Item>::new(&ctx)
            .unwrap()
            .find(Query::new().eq("prefix", "alp"))
            .await
            .unwrap();
        assert_eq!(guids(&alpha).await, vec!["a1"]);

        let disjoint = alpha.find(Query::new().eq("prefix", "be")).await.unwrap();
        assert!(guids(&disjoint).await.is_empty());
        assert_eq!(param(transport.requests().last().unwrap(), "prefix"), Some("be"));

        let wider = alpha.find(Query::new().eq("prefix", "a")).await.unwrap();
        assert_eq!(guids(&wider).await, vec!["a1"]);
    }
}
