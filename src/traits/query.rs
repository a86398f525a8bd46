//! Queryable trait for finding members of a collection.

use async_trait::async_trait;

use crate::error::Result;
use crate::query::Query;

/// Look up members of a collection by criteria or by identifier.
///
/// # Example
///
/// ```ignore
/// use connectapi::{Client, Query, Queryable};
///
/// let client = Client::from_env()?;
/// let streamlit = client
///     .content()?
///     .find(Query::new().eq("app_mode", "streamlit"))
///     .await?;
/// let item = client.content()?.get("f2f37341-e21d-3d80-c698-a935ad614066").await?;
/// ```
#[async_trait]
pub trait Queryable: Sized {
    type Item;

    /// Return a new, resolved collection holding the matching members.
    ///
    /// Criteria the server understands are sent as query parameters; the
    /// rest are applied to the fetched records. Nothing matching is an empty
    /// collection, not an error.
    ///
    /// # Errors
    ///
    /// Returns any transport error raised while fetching.
    async fn find(&self, query: Query) -> Result<Self>;

    /// First member matching `query`, or `None`.
    async fn find_one(&self, query: Query) -> Result<Option<Self::Item>>;

    /// The member whose identifying key is `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::NotFound`](crate::ConnectError::NotFound) if
    /// there is no such member.
    async fn get(&self, id: &str) -> Result<Self::Item>;
}
