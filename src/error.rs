//! Error types for Connect API operations.

use thiserror::Error;

/// Errors that can occur during Connect API operations.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Configuration is missing or incomplete.
    #[error("Connect configuration required: {0}")]
    ConfigMissing(String),

    /// The server has no resource at this path, or a lookup found nothing.
    #[error("'{path}' not found")]
    NotFound { path: String },

    /// An entity was asked for a field its record does not carry.
    #[error("{resource} has no field '{field}'")]
    FieldNotFound {
        resource: &'static str,
        field: String,
    },

    /// A field is present but holds a different JSON type.
    #[error("field '{field}' is not a {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    /// The resource is read-only for this operation.
    #[error("{resource} is read-only: {operation} is not available")]
    Immutable {
        resource: &'static str,
        operation: &'static str,
    },

    /// The resource cannot be addressed this way.
    #[error("{operation} is not supported for {resource}")]
    Unsupported {
        resource: &'static str,
        operation: &'static str,
    },

    /// A path template needs a parent identifier the context does not carry.
    #[error("{resource} requires '{key}' from its parent resource")]
    MissingIdentifier {
        resource: &'static str,
        key: &'static str,
    },

    /// The operation was refused before reaching the server.
    #[error("{0}")]
    InvalidOperation(String),

    /// API request failed.
    #[error("Connect API error: {message}")]
    ApiError {
        message: String,
        status_code: Option<u16>,
        error_code: Option<i64>,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// The response decoded but does not have the expected shape.
    #[error("Unexpected response from '{path}': {reason}")]
    UnexpectedResponse { path: String, reason: String },

    /// Pagination did not terminate within the page limit.
    #[error("Stopped paginating '{path}' after {pages} pages")]
    PaginationLimit { path: String, pages: u32 },

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },
}

impl ConnectError {
    /// Returns true for a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for failures raised by the transport or the wire format,
    /// as opposed to local lookups and policy checks.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ApiError { .. }
                | Self::HttpError(_)
                | Self::ParseError(_)
                | Self::UnexpectedResponse { .. }
                | Self::PaginationLimit { .. }
                | Self::RateLimited { .. }
        )
    }
}

/// Result type alias for Connect operations.
pub type Result<T> = core::result::Result<T, ConnectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_not_transport() {
        let err = ConnectError::NotFound {
            path: "v1/content/abc".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "'v1/content/abc' not found");
    }

    #[test]
    fn test_api_error_is_transport() {
        let err = ConnectError::ApiError {
            message: "boom".to_string(),
            status_code: Some(500),
            error_code: None,
        };
        assert!(err.is_transport());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_field_not_found_message() {
        let err = ConnectError::FieldNotFound {
            resource: "content item",
            field: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "content item has no field 'bogus'");
    }
}
