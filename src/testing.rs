//! In-process transport for unit tests.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::{ConnectError, Result};
use crate::transport::{Request, Response, Transport};

type Handler = Box<dyn Fn(&Request) -> Result<Response> + Send + Sync>;

/// Answers every request with a closure and records what it was asked.
pub(crate) struct StubTransport {
    handler: Handler,
    requests: Mutex<Vec<Request>>,
}

impl fmt::Debug for StubTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTransport").finish_non_exhaustive()
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new(|request| {
            Err(ConnectError::NotFound {
                path: request.path.clone(),
            })
        })
    }
}

impl StubTransport {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn request(&self, request: Request) -> Result<Response> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

/// A root context over `transport`, keeping a handle for request assertions.
pub(crate) fn context(transport: StubTransport) -> (Context, Arc<StubTransport>) {
    let transport = Arc::new(transport);
    (Context::new(transport.clone()), transport)
}

/// Look up a query parameter on a recorded request.
pub(crate) fn param<'a>(request: &'a Request, key: &str) -> Option<&'a str> {
    request
        .params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
