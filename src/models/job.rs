//! Jobs run on behalf of a content item.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::pagination::Pagination;
use crate::schema::{Actions, Schema};
use crate::traits::Delete;

pub(crate) const JOB: Schema = Schema {
    name: "job",
    path: "v1/content/{content_guid}/jobs",
    id_field: Some("key"),
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
    /// A process Connect ran for a content item: a render, a Shiny worker,
    /// an environment restore.
    Job => JOB
);

impl Delete for Job {}

impl Job {
    pub fn key(&self) -> Result<&str> {
        self.0.field_str("key")
    }

    /// 0 while running, 1 when finished, 2 when it could not start.
    pub fn status(&self) -> Result<u8> {
        self.0.field_as("status")
    }

    pub fn tag(&self) -> Result<&str> {
        self.0.field_str("tag")
    }

    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        self.0.field_time("start_time")
    }

    pub fn end_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.0.field_opt("end_time")
    }

    /// Stop the job and remove it. This cannot be undone.
    pub async fn destroy(&self) -> Result<()> {
        self.delete().await
    }
}
