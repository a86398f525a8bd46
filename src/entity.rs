//! A single resource record plus the actions its schema allows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::Context;
use crate::error::{ConnectError, Result};
use crate::record::Record;
use crate::schema::Schema;
use crate::transport::{Method, Request};

/// Attributes for `create` and `update`, keyed by standardized field names.
///
/// ```
/// use connectapi::Attrs;
///
/// let attrs = Attrs::new().set("title", "Quarterly report").set("locked", false);
/// assert_eq!(attrs.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Attrs(Map<String, Value>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// These attributes with `other` laid over them.
    #[must_use]
    pub fn merged(mut self, other: Attrs) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Body for the wire, with names translated through `schema`.
    pub(crate) fn to_wire(&self, schema: &Schema) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(name, value)| (schema.wire_name(name).to_string(), value.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for Attrs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Attrs
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One server resource.
///
/// Field access goes through the resource's [`Schema`], so callers use
/// standardized names even where the server's wire names differ. Mutating
/// actions never touch `self`; they return a new entity built from the
/// server's answer.
#[derive(Clone)]
pub struct Entity {
    ctx: Context,
    schema: &'static Schema,
    path: Option<String>,
    record: Record,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("resource", &self.schema.name)
            .field("path", &self.path)
            .field("record", &self.record)
            .finish()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name
            && self.path == other.path
            && self.record == other.record
    }
}

impl Entity {
    /// A member of the collection at `collection_path`.
    ///
    /// Its own path is the collection path plus its identifier, and its
    /// context publishes that identifier under the schema's context key.
    pub(crate) fn member(
        ctx: &Context,
        schema: &'static Schema,
        collection_path: &str,
        record: Record,
    ) -> Self {
        let id = schema
            .id_field
            .and_then(|field| record.get(field))
            .and_then(id_string);

        let path = id
            .as_deref()
            .map(|id| format!("{collection_path}/{}", urlencoding::encode(id)));
        let ctx = match (schema.context_key, id) {
            (Some(key), Some(id)) => ctx.with_id(key, id),
            _ => ctx.clone(),
        };

        Self {
            ctx,
            schema,
            path,
            record,
        }
    }

    /// A singleton living at `path`.
    pub(crate) fn at(ctx: &Context, schema: &'static Schema, path: String, record: Record) -> Self {
        Self {
            ctx: ctx.clone(),
            schema,
            path: Some(path),
            record,
        }
    }

    /// A record nested inside another resource's body, with no path of its own.
    pub(crate) fn embedded(ctx: &Context, schema: &'static Schema, record: Record) -> Self {
        Self {
            ctx: ctx.clone(),
            schema,
            path: None,
            record,
        }
    }

    /// Rebuild an entity from standardized field names, as produced by
    /// [`Entity::to_map`].
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::MissingIdentifier`] if the schema's path needs
    /// a parent identifier `ctx` does not carry.
    pub fn from_map(ctx: &Context, schema: &'static Schema, map: Map<String, Value>) -> Result<Self> {
        let record: Map<String, Value> = map
            .into_iter()
            .map(|(name, value)| (schema.wire_name(&name).to_string(), value))
            .collect();
        let collection_path = ctx.resolve(schema.name, schema.path)?;
        Ok(Self::member(ctx, schema, &collection_path, Record::new(record)))
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// API path of this entity, if it is addressable on its own.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Identifying key, rendered as a string.
    pub fn id(&self) -> Option<String> {
        self.schema
            .id_field
            .and_then(|field| self.record.get(field))
            .and_then(id_string)
    }

    /// Look up a field by its standardized name.
    ///
    /// A field present as JSON `null` is returned as `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::FieldNotFound`] if the record lacks the field.
    pub fn field(&self, name: &str) -> Result<&Value> {
        self.record
            .get(self.schema.wire_name(name))
            .ok_or_else(|| ConnectError::FieldNotFound {
                resource: self.schema.name,
                field: name.to_string(),
            })
    }

    pub fn field_str(&self, name: &str) -> Result<&str> {
        self.field(name)?
            .as_str()
            .ok_or_else(|| ConnectError::FieldType {
                field: name.to_string(),
                expected: "string",
            })
    }

    /// Deserialize a field into `T`.
    pub fn field_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        serde_json::from_value(self.field(name)?.clone()).map_err(|_| ConnectError::FieldType {
            field: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Like [`Entity::field_as`], but absent and `null` fields are `Ok(None)`.
    pub fn field_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.record.get(self.schema.wire_name(name)) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.field_as(name).map(Some),
        }
    }

    /// Parse an RFC 3339 timestamp field.
    pub fn field_time(&self, name: &str) -> Result<DateTime<Utc>> {
        self.field_as(name)
    }

    /// The record exactly as the server sent it.
    pub fn raw(&self) -> &Record {
        &self.record
    }

    /// All fields under their standardized names.
    pub fn to_map(&self) -> Map<String, Value> {
        self.record
            .iter()
            .map(|(wire, value)| (self.schema.exposed_name(wire).to_string(), value.clone()))
            .collect()
    }

    /// A sibling entity with a different record.
    pub(crate) fn with_record(&self, record: Record) -> Self {
        Self {
            ctx: self.ctx.clone(),
            schema: self.schema,
            path: self.path.clone(),
            record,
        }
    }

    fn own_path(&self, operation: &'static str) -> Result<&str> {
        self.path.as_deref().ok_or(ConnectError::Unsupported {
            resource: self.schema.name,
            operation,
        })
    }

    /// Send `attrs` with the schema's update verb and return the updated entity.
    ///
    /// The server's answer is merged over the current record; an empty answer
    /// merges the attributes that were sent. `self` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError::Immutable`] if the resource cannot be updated,
    /// or whatever the server reports (`NotFound` once the entity is deleted).
    #[tracing::instrument(skip(self, attrs), fields(resource = self.schema.name, path = ?self.path))]
    pub async fn update(&self, attrs: Attrs) -> Result<Self> {
        let method = self.schema.actions.update.ok_or(ConnectError::Immutable {
            resource: self.schema.name,
            operation: "update",
        })?;
        let path = self.own_path("update")?;

        let body = attrs.to_wire(self.schema);
        let response = self
            .ctx
            .send(Request::new(method, path).body(Value::Object(body.clone())))
            .await?;

        let changes = match response.body {
            Value::Object(map) if !map.is_empty() => map,
            Value::Object(_) | Value::Null => body,
            _ => {
                return Err(ConnectError::UnexpectedResponse {
                    path: path.to_string(),
                    reason: "expected the updated object".to_string(),
                })
            }
        };

        Ok(self.with_record(self.record.merged(&changes)))
    }

    /// Delete this entity on the server.
    ///
    /// The entity stays readable afterwards.
    #[tracing::instrument(skip(self), fields(resource = self.schema.name, path = ?self.path))]
    pub async fn delete(&self) -> Result<()> {
        if !self.schema.actions.delete {
            return Err(ConnectError::Immutable {
                resource: self.schema.name,
                operation: "delete",
            });
        }
        let path = self.own_path("delete")?;
        self.ctx.send(Request::delete(path)).await?;
        Ok(())
    }

    /// Re-read this entity from its own path.
    pub async fn refresh(&self) -> Result<Self> {
        self.refresh_with(Vec::new()).await
    }

    /// Re-read this entity, sending `params` with the request.
    pub(crate) async fn refresh_with(&self, params: Vec<(String, String)>) -> Result<Self> {
        let path = self.own_path("refresh")?;
        let response = self.ctx.send(Request::get(path).params(params)).await?;
        Ok(self.with_record(Record::from_value(path, response.body)?))
    }

    /// POST `body` to `{path}/{action}`, for action endpoints like `lock`.
    pub(crate) async fn post_action(&self, action: &'static str, body: Value) -> Result<Value> {
        let path = format!("{}/{action}", self.own_path(action)?);
        let response = self
            .ctx
            .send(Request::new(Method::Post, path).body(body))
            .await?;
        Ok(response.body)
    }
}

/// Identifiers come as strings or integers depending on the endpoint.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
