//! Resource and Contextual traits.

use serde_json::{Map, Value};

use crate::context::Context;
use crate::entity::Entity;
use crate::error::Result;
use crate::record::Record;
use crate::schema::Schema;

/// A typed view over an [`Entity`] of one resource kind.
///
/// Implementors are thin newtypes; the schema constant carries everything
/// the generic machinery needs to know about the endpoint.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Static description of the endpoint.
    const SCHEMA: &'static Schema;

    /// Wrap an entity built from this resource's schema.
    fn from_entity(entity: Entity) -> Self;

    /// The underlying entity.
    fn entity(&self) -> &Entity;

    fn id(&self) -> Option<String> {
        self.entity().id()
    }

    /// Look up a field by its standardized name.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::FieldNotFound`](crate::ConnectError::FieldNotFound)
    /// if the record lacks the field.
    fn field(&self, name: &str) -> Result<&Value> {
        self.entity().field(name)
    }

    fn to_map(&self) -> Map<String, Value> {
        self.entity().to_map()
    }

    fn raw(&self) -> &Record {
        self.entity().raw()
    }
}

/// Anything that carries a [`Context`] for deriving child resources.
pub trait Contextual {
    fn context(&self) -> &Context;
}

impl Contextual for Entity {
    fn context(&self) -> &Context {
        Entity::context(self)
    }
}
