//! Typed error handling at the HTTP boundary
//!
//! Every failure a handler can produce is an [`ApiError`]. It knows its HTTP
//! status, its stable `code`, and how to render itself as a flat JSON body:
//!
//! ```json
//! {
//!   "code": "InvalidRequestBody",
//!   "message": "Multiple errors occurred.",
//!   "details": [{ "message": "...", "target": "pizzas[0].size" }],
//!   "innerError": { "code": "InvalidJsonBody" }
//! }
//! ```
//!
//! # Error Categories
//!
//! - [`ApiError`]: Errors returned to HTTP clients
//! - [`ConfigError`]: Errors related to configuration parsing and validation

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use crate::core::conditional::HeaderError;
use crate::core::json::JsonError;
use crate::ordering::OrderError;
use crate::storage::StoreError;

/// Error returned by an HTTP handler
#[derive(Debug)]
pub enum ApiError {
    /// No order with this id exists
    NotFound { order_id: String },

    /// The order id in the path is malformed
    InvalidId { message: String },

    /// The `continuationToken` query parameter was rejected by the store
    InvalidContinuation { message: String },

    /// The request body failed validation
    InvalidBody(JsonError),

    /// The request body is not JSON at all
    MalformedJson { message: String },

    /// The order is cancelled and can no longer change
    OrderCancelled { order_id: String },

    /// `If-Match` / `If-None-Match` are missing or invalid
    ConditionalHeader(HeaderError),

    /// An order with this id already exists
    AlreadyExists { order_id: String },

    /// The order changed since the client read it
    ETagMismatch { order_id: String },

    /// The store call was cancelled or timed out
    Cancelled,

    /// Anything else (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound { order_id } => {
                write!(f, "Order with id '{}' was not found.", order_id)
            }
            ApiError::InvalidId { message } => write!(f, "{}", message),
            ApiError::InvalidContinuation { message } => {
                write!(f, "The continuation token is not valid: {}", message)
            }
            ApiError::InvalidBody(e) => write!(f, "{}", e.message()),
            ApiError::MalformedJson { message } => {
                write!(f, "Request body is not valid JSON: {}", message)
            }
            ApiError::OrderCancelled { order_id } => {
                write!(f, "Order '{}' is cancelled and cannot be modified.", order_id)
            }
            ApiError::ConditionalHeader(e) => write!(f, "{}", e),
            ApiError::AlreadyExists { order_id } => {
                write!(f, "Order with id '{}' already exists.", order_id)
            }
            ApiError::ETagMismatch { order_id } => write!(
                f,
                "Order '{}' has been modified. Fetch the latest version and retry.",
                order_id
            ),
            ApiError::Cancelled => write!(f, "The request was cancelled."),
            ApiError::Internal(_) => write!(f, "An internal server error occurred."),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::InvalidBody(e) => Some(e),
            ApiError::ConditionalHeader(e) => Some(e),
            _ => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// One entry per problem when there are several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ErrorDetail>>,
    /// More specific error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<InnerError>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InnerError {
    pub code: String,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidId { .. }
            | ApiError::InvalidContinuation { .. }
            | ApiError::InvalidBody(_)
            | ApiError::MalformedJson { .. }
            | ApiError::OrderCancelled { .. } => StatusCode::BAD_REQUEST,
            ApiError::ConditionalHeader(e) => e.status_code(),
            ApiError::AlreadyExists { .. } => StatusCode::CONFLICT,
            ApiError::ETagMismatch { .. } => StatusCode::PRECONDITION_FAILED,
            ApiError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "ResourceNotFound",
            ApiError::InvalidId { .. } | ApiError::InvalidContinuation { .. } => {
                "InvalidRequestParameter"
            }
            ApiError::InvalidBody(_)
            | ApiError::MalformedJson { .. }
            | ApiError::OrderCancelled { .. } => "InvalidRequestBody",
            ApiError::ConditionalHeader(_) => "InvalidConditionalHeader",
            ApiError::AlreadyExists { .. } => "ResourceAlreadyExists",
            ApiError::ETagMismatch { .. } => "ETagMismatch",
            ApiError::Cancelled => "RequestCancelled",
            ApiError::Internal(_) => "InternalServerError",
        }
    }

    fn inner_code(&self) -> Option<&'static str> {
        match self {
            ApiError::InvalidId { .. } => Some("InvalidId"),
            ApiError::InvalidContinuation { .. } => Some("InvalidContinuationToken"),
            ApiError::InvalidBody(_) | ApiError::MalformedJson { .. } => Some("InvalidJsonBody"),
            ApiError::OrderCancelled { .. } => Some("OrderCancelled"),
            _ => None,
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
            inner_error: self.inner_code().map(|code| InnerError {
                code: code.to_string(),
            }),
        }
    }

    fn details(&self) -> Option<Vec<ErrorDetail>> {
        let ApiError::InvalidBody(e) = self else {
            return None;
        };

        let details: Vec<ErrorDetail> = e
            .details()
            .iter()
            .map(|issue| ErrorDetail {
                message: issue.message().to_string(),
                target: issue.target(),
            })
            .collect();
        (!details.is_empty()).then_some(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Internal(cause) = &self {
            tracing::error!(%cause, "Request failed with an internal error");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

impl From<JsonError> for ApiError {
    fn from(err: JsonError) -> Self {
        ApiError::InvalidBody(err)
    }
}

impl From<HeaderError> for ApiError {
    fn from(err: HeaderError) -> Self {
        ApiError::ConditionalHeader(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => ApiError::Cancelled,
            StoreError::InvalidContinuation(message) => ApiError::InvalidContinuation { message },
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => ApiError::NotFound {
                order_id: id.to_string(),
            },
            OrderError::AlreadyExists(id) => ApiError::AlreadyExists {
                order_id: id.to_string(),
            },
            OrderError::ETagMismatch(id) => ApiError::ETagMismatch {
                order_id: id.to_string(),
            },
            OrderError::Cancelled(id) => ApiError::OrderCancelled {
                order_id: id.to_string(),
            },
            OrderError::InvalidDocument(e) => ApiError::Internal(e.to_string()),
            OrderError::Store(e) => e.into(),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Missing required field in configuration
    MissingField { field: String, context: String },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },

    /// IO error while reading configuration
    IoError { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::MissingField { field, context } => {
                write!(f, "Missing required field '{}' in {}", field, context)
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
