//! Update trait for modifying resources.

use async_trait::async_trait;

use crate::entity::Attrs;
use crate::error::Result;
use crate::traits::Resource;

/// Update an existing resource.
///
/// Implement this trait for resource types that can be modified after
/// creation. The receiver is never changed; the updated resource is a new
/// value.
///
/// # Example
///
/// ```ignore
/// use connectapi::{Attrs, Client, Queryable, Update};
///
/// let client = Client::from_env()?;
/// let item = client.content()?.get("f2f37341-e21d-3d80-c698-a935ad614066").await?;
/// let renamed = item.update(Attrs::new().set("title", "New Title")).await?;
/// ```
#[async_trait]
pub trait Update: Resource {
    /// Update the resource and return the updated version.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource no longer exists or the request fails.
    async fn update(&self, attrs: Attrs) -> Result<Self> {
        let entity = self.entity().update(attrs).await?;
        Ok(Self::from_entity(entity))
    }
}
