//! Content permissions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::entity::Attrs;
use crate::error::Result;
use crate::pagination::Pagination;
use crate::schema::{Actions, Schema};
use crate::traits::{Create, Delete, Resource, Update};
use crate::transport::Method;

pub(crate) const PERMISSION: Schema = Schema {
    name: "permission",
    path: "v1/content/{content_guid}/permissions",
    id_field: Some("id"),
    context_key: None,
    fields: &[],
    queries: &[],
    pagination: Pagination::None,
    actions: Actions {
        create: true,
        update: Some(Method::Put),
        delete: true,
    },
};

/// Fields the server requires on every permission write.
const PRINCIPAL_FIELDS: [&str; 3] = ["principal_guid", "principal_type", "role"];

/// Kind of principal a permission is granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Group,
}

/// Access level granted by a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Owner,
}

resource!(
    /// Access granted to a user or group on a content item.
    Permission => PERMISSION
);

impl Delete for Permission {}

/// Permissions are replaced with `PUT`, so the current principal and role
/// are sent along with whatever changes.
#[async_trait]
impl Update for Permission {
    async fn update(&self, attrs: Attrs) -> Result<Self> {
        let current = PRINCIPAL_FIELDS
            .iter()
            .filter_map(|&name| self.0.raw().get(name).map(|v| (name, v.clone())));
        let body = Attrs::from_iter(current).merged(attrs);

        let entity = self.0.update(body).await?;
        Ok(Self::from_entity(entity))
    }
}

impl Permission {
    pub fn principal_guid(&self) -> Result<&str> {
        self.0.field_str("principal_guid")
    }

    pub fn principal_type(&self) -> Result<PrincipalType> {
        self.0.field_as("principal_type")
    }

    pub fn role(&self) -> Result<Role> {
        self.0.field_as("role")
    }
}

impl Collection<Permission> {
    /// Grant a permission; same as [`Create::create`].
    pub async fn add(&self, attrs: Attrs) -> Result<Permission> {
        self.create(attrs).await
    }
}
