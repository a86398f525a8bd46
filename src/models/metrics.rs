//! Instrumentation event streams.
//!
//! Both streams are cursor-paginated and read-only. Time ranges are given
//! with the `start` and `end` criteria, which the server calls `from` and
//! `to`.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pagination::{Pagination, DEFAULT_PAGE_SIZE};
use crate::schema::{Actions, Field, QueryField, Schema};

const EVENT_QUERIES: &[QueryField] = &[
    QueryField::native("content_guid"),
    QueryField::param("min_data_version", "min_data_version"),
    QueryField::param("start", "from"),
    QueryField::param("end", "to"),
];

pub(crate) const VISIT_EVENT: Schema = Schema {
    name: "visit event",
    path: "v1/instrumentation/content/visits",
    id_field: None,
    context_key: None,
    fields: &[Field::renamed("started", "time")],
    queries: EVENT_QUERIES,
    pagination: Pagination::Cursor {
        limit: DEFAULT_PAGE_SIZE,
    },
    actions: Actions::READ_ONLY,
};

pub(crate) const SHINY_USAGE_EVENT: Schema = Schema {
    name: "shiny usage event",
    path: "v1/instrumentation/shiny/usage",
    id_field: None,
    context_key: None,
    fields: &[],
    queries: EVENT_QUERIES,
    pagination: Pagination::Cursor {
        limit: DEFAULT_PAGE_SIZE,
    },
    actions: Actions::READ_ONLY,
};

resource!(
    /// One visit to a content item.
    VisitEvent => VISIT_EVENT
);

impl VisitEvent {
    pub fn content_guid(&self) -> Result<&str> {
        self.0.field_str("content_guid")
    }

    pub fn user_guid(&self) -> Result<Option<String>> {
        self.0.field_opt("user_guid")
    }

    /// When the visit happened.
    pub fn started(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("started")
    }

    pub fn bundle_id(&self) -> Result<Option<u64>> {
        self.0.field_opt("bundle_id")
    }

    pub fn rendering_id(&self) -> Result<Option<u64>> {
        self.0.field_opt("rendering_id")
    }

    pub fn data_version(&self) -> Result<u32> {
        self.0.field_as("data_version")
    }

    /// Path requested below the content URL.
    pub fn path(&self) -> Result<&str> {
        self.0.field_str("path")
    }
}

resource!(
    /// One Shiny session on a content item.
    ShinyUsageEvent => SHINY_USAGE_EVENT
);

impl ShinyUsageEvent {
    pub fn content_guid(&self) -> Result<&str> {
        self.0.field_str("content_guid")
    }

    pub fn user_guid(&self) -> Result<Option<String>> {
        self.0.field_opt("user_guid")
    }

    pub fn started(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("started")
    }

    /// `None` while the session is still open.
    pub fn ended(&self) -> Result<Option<DateTime<Utc>>> {
        self.0.field_opt("ended")
    }

    pub fn data_version(&self) -> Result<u32> {
        self.0.field_as("data_version")
    }
}
