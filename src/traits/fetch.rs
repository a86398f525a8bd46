//! Fetchable trait for lazily resolved collections.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::Sequence;

/// Resolve a collection endpoint into its full contents.
///
/// # Example
///
/// ```ignore
/// use connectapi::{Client, Fetchable};
///
/// let client = Client::from_env()?;
/// let users = client.users()?;
/// for user in users.fetch().await? {
///     println!("{}", user.username()?);
/// }
/// ```
#[async_trait]
pub trait Fetchable {
    type Item: Send + Sync;

    /// Fetch every page on first call and return the materialized items.
    ///
    /// Later calls return the same items without another request.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while paginating; nothing is
    /// published in that case and the next call starts over.
    async fn fetch(&self) -> Result<&Sequence<Self::Item>>;

    /// Number of items after resolution.
    async fn count(&self) -> Result<usize> {
        Ok(self.fetch().await?.len())
    }
}
