//! Connect resource types.
//!
//! Each resource is a newtype over [`Entity`](crate::Entity) declared with
//! `resource!`, plus a [`Schema`](crate::schema::Schema) constant describing
//! its endpoint and the navigation methods that lead to its children.

/// Declare a resource newtype bound to a schema constant.
macro_rules! resource {
    ($(#[$meta:meta])* $name:ident => $schema:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(crate::entity::Entity);

        impl crate::traits::Resource for $name {
            const SCHEMA: &'static crate::schema::Schema = &$schema;

            fn from_entity(entity: crate::entity::Entity) -> Self {
                Self(entity)
            }

            fn entity(&self) -> &crate::entity::Entity {
                &self.0
            }
        }

        impl crate::traits::Contextual for $name {
            fn context(&self) -> &crate::context::Context {
                self.0.context()
            }
        }
    };
}

mod bundle;
mod content;
mod environment;
mod group;
mod job;
mod metrics;
mod permission;
mod task;
mod user;
mod vanity;

pub use bundle::*;
pub use content::*;
pub use environment::*;
pub use group::*;
pub use job::*;
pub use metrics::*;
pub use permission::*;
pub use task::*;
pub use user::*;
pub use vanity::*;
