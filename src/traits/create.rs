//! Create trait for adding members to a collection.

use async_trait::async_trait;

use crate::entity::Attrs;
use crate::error::Result;

/// Create a new member of a collection.
///
/// # Example
///
/// ```ignore
/// use connectapi::{Attrs, Client, Create};
///
/// let client = Client::from_env()?;
/// let item = client
///     .content()?
///     .create(Attrs::new().set("name", "quarterly-report"))
///     .await?;
/// ```
#[async_trait]
pub trait Create {
    type Item;

    /// Create the member and return it as the server reports it.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Immutable`](crate::ConnectError::Immutable)
    /// if the endpoint does not accept new members.
    async fn create(&self, attrs: Attrs) -> Result<Self::Item>;
}
