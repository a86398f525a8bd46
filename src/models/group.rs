//! Groups of users.

use crate::error::Result;
use crate::pagination::{Pagination, DEFAULT_PAGE_SIZE};
use crate::schema::{Actions, QueryField, Schema};
use crate::traits::Delete;

pub(crate) const GROUP: Schema = Schema {
    name: "group",
    path: "v1/groups",
    id_field: Some("guid"),
    context_key: Some("group_guid"),
    fields: &[],
    queries: &[QueryField::param("prefix", "prefix")],
    pagination: Pagination::Offset {
        page_size: DEFAULT_PAGE_SIZE,
    },
    actions: Actions {
        create: true,
        update: None,
        delete: true,
    },
};

resource!(
    /// A named set of users that permissions can be granted to.
    ///
    /// Groups cannot be renamed through the API; there is no `Update` impl.
    Group => GROUP
);

impl Delete for Group {}

impl Group {
    pub fn guid(&self) -> Result<&str> {
        self.0.field_str("guid")
    }

    pub fn name(&self) -> Result<&str> {
        self.0.field_str("name")
    }

    pub fn owner_guid(&self) -> Result<Option<String>> {
        self.0.field_opt("owner_guid")
    }
}
