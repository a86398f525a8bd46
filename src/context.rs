//! Ambient information threaded down the resource graph.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConnectError, Result};
use crate::transport::{Request, Response, Transport};

/// Transport handle plus the identifiers of every enclosing resource.
///
/// A context is immutable. Navigating into a child resource derives a new
/// context with [`Context::with_id`]; the parent is never touched, so
/// contexts only ever flow downward.
#[derive(Clone)]
pub struct Context {
    transport: Arc<dyn Transport>,
    ids: BTreeMap<&'static str, String>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("transport", &self.transport)
            .field("ids", &self.ids)
            .finish()
    }
}

impl Context {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            ids: BTreeMap::new(),
        }
    }

    /// Derive a child context that also carries `key = value`.
    #[must_use]
    pub fn with_id(&self, key: &'static str, value: impl Into<String>) -> Self {
        let mut ids = self.ids.clone();
        ids.insert(key, value.into());
        Self {
            transport: Arc::clone(&self.transport),
            ids,
        }
    }

    /// Look up a parent identifier.
    pub fn id(&self, key: &str) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Send a request through the transport.
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.transport.request(request).await
    }

    /// Fill `{key}` placeholders in a path template from this context.
    ///
    /// Values are percent-encoded as single path segments.
    pub fn resolve(&self, resource: &'static str, template: &'static str) -> Result<String> {
        let mut path = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let key = &rest[start + 1..start + len];
            let value = self.id(key).ok_or(ConnectError::MissingIdentifier {
                resource,
                key: placeholder(template, key),
            })?;

            path.push_str(&rest[..start]);
            path.push_str(&urlencoding::encode(value));
            rest = &rest[start + len + 1..];
        }
        path.push_str(rest);

        Ok(path)
    }
}

/// Re-borrow a placeholder name from the `'static` template.
fn placeholder(template: &'static str, key: &str) -> &'static str {
    template
        .find(key)
        .map_or("", |start| &template[start..start + key.len()])
}
