//! Vanity URLs.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pagination::Pagination;
use crate::schema::{Actions, Schema};
use crate::traits::Delete;

pub(crate) const VANITY: Schema = Schema {
    name: "vanity",
    path: "v1/content/{content_guid}/vanity",
    id_field: None,
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

resource!(
    /// A custom URL path that serves a content item, such as `/sales/`.
    ///
    /// Replace a vanity with [`ContentItem::create_vanity`](crate::ContentItem::create_vanity).
    Vanity => VANITY
);

impl Delete for Vanity {}

impl Vanity {
    pub fn path(&self) -> Result<&str> {
        self.0.field_str("path")
    }

    pub fn content_guid(&self) -> Result<&str> {
        self.0.field_str("content_guid")
    }

    pub fn created_time(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("created_time")
    }

    /// Remove the vanity URL. The item stays reachable at its own URL.
    pub async fn destroy(&self) -> Result<()> {
        self.delete().await
    }
}
