//! Transport boundary.
//!
//! Everything above this module talks to the server through the
//! [`Transport`] trait. [`HttpTransport`] is the reqwest-backed
//! implementation used by [`Client::new`](crate::Client::new); tests and
//! embedders can supply their own.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{ConnectError, Result};
use crate::pagination::PageMarker;

const USER_AGENT: &str = concat!("connectapi/", env!("CARGO_PKG_VERSION"));

/// HTTP verbs used by the resource layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path relative to the API root, without a leading slash (`v1/content`).
    pub path: String,
    /// Query string parameters, in order.
    pub params: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Append a single query parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append query parameters.
    #[must_use]
    pub fn params<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    /// Decoded JSON body; `Value::Null` for an empty body.
    pub body: Value,
    /// Pagination metadata found in the body, if any.
    pub pagination: Option<PageMarker>,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        let pagination = PageMarker::detect(&body);
        Self {
            status,
            body,
            pagination,
        }
    }

    /// A `200 OK` response.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }
}

/// Performs authenticated requests against the server.
///
/// Implementations must report a missing resource as
/// [`ConnectError::NotFound`] and every other failure as a transport error
/// (see [`ConnectError::is_transport`]). Timeouts and retries belong here,
/// not in the resource layer.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn request(&self, request: Request) -> Result<Response>;
}

/// reqwest-backed [`Transport`].
///
/// Cheaply cloneable; clones share the same connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Arc<Url>,
    api_key: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport for the configured server.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(config.timeout())
            .build()
            .map_err(ConnectError::HttpError)?;

        Ok(Self {
            http,
            base_url: Arc::new(config.url().clone()),
            api_key: config.api_key().to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check response status and convert errors.
    async fn check_response(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ConnectError::NotFound {
                path: path.to_string(),
            });
        }

        // Handle rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ConnectError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let (message, error_code) = Self::extract_error(response, status).await;
        Err(ConnectError::ApiError {
            message,
            status_code: Some(status.as_u16()),
            error_code,
        })
    }

    /// Extract the message and Connect error code from a failed response.
    async fn extract_error(response: reqwest::Response, status: StatusCode) -> (String, Option<i64>) {
        let body = match response.text().await {
            Ok(b) => b,
            Err(_) => return (format!("HTTP {status}"), None),
        };

        // Connect reports `{"code": 4, "error": "...", "payload": null}`
        if let Ok(json) = serde_json::from_str::<Value>(&body) {
            let code = json.get("code").and_then(Value::as_i64);
            if let Some(msg) = json.get("error").and_then(Value::as_str) {
                return (msg.to_string(), code);
            }
            if let Some(msg) = json.get("message").and_then(Value::as_str) {
                return (msg.to_string(), code);
            }
        }

        if body.is_empty() {
            (format!("HTTP {status}"), None)
        } else {
            (body, None)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn request(&self, request: Request) -> Result<Response> {
        let url = self.base_url.join(&request.path)?;

        let mut builder = self
            .http
            .request(request.method.into(), url)
            .header(AUTHORIZATION, format!("Key {}", self.api_key));
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ConnectError::HttpError)?;
        let response = Self::check_response(&request.path, response).await?;
        let status = response.status().as_u16();

        let text = response.text().await.map_err(ConnectError::HttpError)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        tracing::trace!(status, "response decoded");

        Ok(Response::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transport_debug_hides_key() {
        let config = Config::new("https://connect.example.com", "test-key").unwrap();
        let transport = HttpTransport::new(&config).unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.contains("HttpTransport"));
        assert!(debug.contains("base_url"));
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_method_into_reqwest() {
        assert_eq!(reqwest::Method::from(Method::Patch), reqwest::Method::PATCH);
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::get("v1/users")
            .param("page_number", "1")
            .params(vec![("prefix".to_string(), "jo".to_string())]);
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.params.len(), 2);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_response_detects_pagination() {
        let response = Response::ok(json!({"results": [], "current_page": 1, "total": 0}));
        assert!(matches!(
            response.pagination,
            Some(PageMarker::Offset { current_page: 1, total: 0 })
        ));

        let response = Response::ok(json!([{"guid": "a"}]));
        assert!(response.pagination.is_none());
    }
}
