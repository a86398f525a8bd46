//! Static per-resource configuration.
//!
//! Every resource type declares one [`Schema`] constant. The core reads it to
//! build paths, translate field names, route query criteria and decide which
//! actions are allowed. Nothing in a schema is discovered at runtime.

use crate::pagination::Pagination;
use crate::transport::Method;

/// Field name translation: `name` is what callers use, `wire` is what the
/// server sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub wire: &'static str,
}

impl Field {
    pub const fn renamed(name: &'static str, wire: &'static str) -> Self {
        Self { name, wire }
    }
}

/// How a `find` criterion on a given field reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Sent as a query parameter; the field also exists on records, so it
    /// can be re-checked client-side.
    Native(&'static str),
    /// Sent as a query parameter with no record counterpart (`prefix`,
    /// time ranges). Only the server can evaluate it.
    ParamOnly(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryField {
    pub field: &'static str,
    pub kind: QueryKind,
}

impl QueryField {
    pub const fn native(field: &'static str) -> Self {
        Self {
            field,
            kind: QueryKind::Native(field),
        }
    }

    pub const fn param(field: &'static str, param: &'static str) -> Self {
        Self {
            field,
            kind: QueryKind::ParamOnly(param),
        }
    }
}

/// Which mutations the server accepts for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actions {
    pub create: bool,
    /// Verb used for updates (`PATCH` or `PUT`), if updates are allowed.
    pub update: Option<Method>,
    pub delete: bool,
}

impl Actions {
    pub const READ_ONLY: Self = Self {
        create: false,
        update: None,
        delete: false,
    };
}

/// Static description of one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Human-readable singular name, used in errors.
    pub name: &'static str,
    /// Collection path template relative to the API root, with `{key}`
    /// placeholders filled from the context (`v1/content/{content_guid}/jobs`).
    pub path: &'static str,
    /// Field holding the identifying key, if members are addressable.
    pub id_field: Option<&'static str>,
    /// Context key under which a member's id is published to its children.
    pub context_key: Option<&'static str>,
    pub fields: &'static [Field],
    pub queries: &'static [QueryField],
    pub pagination: Pagination,
    pub actions: Actions,
}

impl Schema {
    /// Wire name for a standardized field name.
    pub fn wire_name<'a>(&self, name: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map_or(name, |f| f.wire)
    }

    /// Standardized name for a wire field name.
    pub fn exposed_name<'a>(&self, wire: &'a str) -> &'a str {
        self.fields
            .iter()
            .find(|f| f.wire == wire)
            .map_or(wire, |f| f.name)
    }

    pub fn query_kind(&self, field: &str) -> Option<QueryKind> {
        self.queries
            .iter()
            .find(|q| q.field == field)
            .map(|q| q.kind)
    }
}
