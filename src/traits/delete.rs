//! Delete trait for removing resources.

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::Resource;

/// Delete a resource on the server.
///
/// The value stays readable afterwards, but further mutations surface the
/// server's `NotFound`.
#[async_trait]
pub trait Delete: Resource {
    async fn delete(&self) -> Result<()> {
        self.entity().delete().await
    }
}
