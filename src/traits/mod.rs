//! Capability traits.
//!
//! Resources and collections implement the capabilities their endpoints
//! support. A group has no `Update` impl; an event stream has no `Create`.

mod create;
mod delete;
mod fetch;
mod query;
mod resource;
mod update;

pub use create::Create;
pub use delete::Delete;
pub use fetch::Fetchable;
pub use query::Queryable;
pub use resource::{Contextual, Resource};
pub use update::Update;
