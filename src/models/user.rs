//! Users and the current account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::collection::Collection;
use crate::context::Context;
use crate::entity::Entity;
use crate::error::{ConnectError, Result};
use crate::pagination::{Pagination, DEFAULT_PAGE_SIZE};
use crate::record::Record;
use crate::schema::{Actions, QueryField, Schema};
use crate::traits::Update;
use crate::transport::{Method, Request};

use super::ContentItem;

pub(crate) const USER: Schema = Schema {
    name: "user",
    path: "v1/users",
    id_field: Some("guid"),
    context_key: Some("user_guid"),
    fields: &[],
    queries: &[
        QueryField::native("user_role"),
        QueryField::param("prefix", "prefix"),
        QueryField::param("account_status", "account_status"),
    ],
    pagination: Pagination::Offset {
        page_size: DEFAULT_PAGE_SIZE,
    },
    actions: Actions {
        create: true,
        update: Some(Method::Put),
        delete: false,
    },
};

/// Server-wide role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Administrator,
    Publisher,
    Viewer,
}

resource!(
    /// A Connect user account.
    User => USER
);

impl Update for User {}

impl User {
    pub fn guid(&self) -> Result<&str> {
        self.0.field_str("guid")
    }

    pub fn username(&self) -> Result<&str> {
        self.0.field_str("username")
    }

    pub fn email(&self) -> Result<Option<String>> {
        self.0.field_opt("email")
    }

    pub fn first_name(&self) -> Result<Option<String>> {
        self.0.field_opt("first_name")
    }

    pub fn last_name(&self) -> Result<Option<String>> {
        self.0.field_opt("last_name")
    }

    pub fn user_role(&self) -> Result<UserRole> {
        self.0.field_as("user_role")
    }

    pub fn locked(&self) -> Result<bool> {
        self.0.field_as("locked")
    }

    pub fn created_time(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("created_time")
    }

    /// Content items owned by this user.
    pub fn content(&self) -> Result<Collection<ContentItem>> {
        Ok(Collection::new(self.0.context())?.with_param("owner_guid", self.guid()?))
    }

    /// Lock the account and return the locked user.
    ///
    /// Locking your own account is refused unless `force` is set, since only
    /// an administrator can unlock it again.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::InvalidOperation`] when locking yourself
    /// without `force`.
    pub async fn lock(&self, force: bool) -> Result<Self> {
        if !force {
            let me = current_user(self.0.context()).await?;
            if me.guid()? == self.guid()? {
                return Err(ConnectError::InvalidOperation(
                    "You cannot lock your own account. Pass force = true to override this behavior."
                        .to_string(),
                ));
            }
        }
        self.set_locked(true).await
    }

    /// Unlock the account and return the unlocked user.
    pub async fn unlock(&self) -> Result<Self> {
        self.set_locked(false).await
    }

    async fn set_locked(&self, locked: bool) -> Result<Self> {
        self.0.post_action("lock", json!({ "locked": locked })).await?;

        let mut changes = Map::new();
        changes.insert("locked".to_string(), Value::Bool(locked));
        Ok(Self(self.0.with_record(self.0.raw().merged(&changes))))
    }
}

/// The user the API key belongs to.
pub(crate) async fn current_user(ctx: &Context) -> Result<User> {
    let path = "v1/user";
    let response = ctx.send(Request::get(path)).await?;
    let record = Record::from_value(path, response.body)?;
    Ok(User(Entity::member(ctx, &USER, USER.path, record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StubTransport};
    use crate::traits::Resource;
    use crate::transport::Response;

    fn user(ctx: &Context, guid: &str) -> User {
        let record = Record::from_value(
            "v1/users",
            json!({"guid": guid, "username": "carlos", "locked": false, "user_role": "publisher"}),
        )
        .unwrap();
        User::from_entity(Entity::member(ctx, &USER, "v1/users", record))
    }

    fn server() -> StubTransport {
        StubTransport::new(|request| match request.path.as_str() {
            "v1/user" => Ok(Response::ok(json!({"guid": "me", "username": "admin"}))),
            _ => Ok(Response::ok(json!({}))),
        })
    }

    #[test]
    fn test_content_filters_by_owner() {
        let (ctx, _) = context(StubTransport::default());
        let content = user(&ctx, "u1").content().unwrap();
        assert_eq!(content.path(), "v1/content");
        assert_eq!(content.params(), &[("owner_guid".to_string(), "u1".to_string())]);
    }

    #[tokio::test]
    async fn test_lock_returns_locked_user() {
        let (ctx, transport) = context(server());
        let original = user(&ctx, "u1");

        let locked = original.lock(false).await.unwrap();
        assert!(locked.locked().unwrap());
        assert!(!original.locked().unwrap());

        let requests = transport.requests();
        assert_eq!(requests[1].path, "v1/users/u1/lock");
        assert_eq!(requests[1].body, Some(json!({"locked": true})));
    }

    #[tokio::test]
    async fn test_lock_self_refused_without_force() {
        let (ctx, transport) = context(server());
        let me = user(&ctx, "me");

        let err = me.lock(false).await.unwrap_err();
        assert!(matches!(err, ConnectError::InvalidOperation(_)));
        assert_eq!(transport.requests().len(), 1);

        assert!(me.lock(true).await.unwrap().locked().unwrap());
    }

    #[tokio::test]
    async fn test_unlock_skips_self_check() {
        let (ctx, transport) = context(server());
        let unlocked = user(&ctx, "me").unlock().await.unwrap();
        assert!(!unlocked.locked().unwrap());
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(unlocked.user_role().unwrap(), UserRole::Publisher);
    }
}
