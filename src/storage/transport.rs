//! Request/response seam between the document store adapter and Cosmos DB
//!
//! A transport executes one document request and hands back the raw HTTP
//! status, headers of interest and JSON body. It never interprets status
//! codes; that is the job of [`DocumentStore`](super::DocumentStore).

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::ordering::{ContinuationToken, CosmosId, ETag};

/// JSON Patch-style operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Set,
}

/// One partial-update operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: Value,
}

impl PatchOperation {
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Set,
            path: path.into(),
            value,
        }
    }
}

/// Write precondition sent with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// `If-Match: <etag>`
    IfMatch(ETag),
    /// `If-None-Match: *`
    IfNoneMatchAny,
}

/// Named query parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

/// Parameterized Cosmos SQL query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub query: String,
    pub parameters: Vec<SqlParameter>,
}

impl SqlQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(SqlParameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

/// A document operation against the configured container
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentRequest {
    Create {
        partition_key: String,
        document: Value,
        precondition: Precondition,
    },
    Patch {
        id: CosmosId,
        partition_key: String,
        operations: Vec<PatchOperation>,
        precondition: Precondition,
    },
    Query {
        query: SqlQuery,
        /// `None` runs a cross-partition query
        partition_key: Option<String>,
        continuation: Option<ContinuationToken>,
        max_item_count: Option<u32>,
    },
}

impl DocumentRequest {
    /// Short name for logs
    pub fn operation(&self) -> &'static str {
        match self {
            DocumentRequest::Create { .. } => "create",
            DocumentRequest::Patch { .. } => "patch",
            DocumentRequest::Query { .. } => "query",
        }
    }
}

/// Raw store response
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResponse {
    pub status: StatusCode,
    pub etag: Option<ETag>,
    pub continuation: Option<ContinuationToken>,
    pub body: Value,
}

impl DocumentResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            etag: None,
            continuation: None,
            body,
        }
    }

    pub fn with_etag(mut self, etag: Option<ETag>) -> Self {
        self.etag = etag;
        self
    }

    pub fn with_continuation(mut self, continuation: Option<ContinuationToken>) -> Self {
        self.continuation = continuation;
        self
    }
}

/// Failure to obtain any response from the store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Executes document requests against a container
#[async_trait]
pub trait CosmosTransport: Send + Sync {
    async fn execute(&self, request: DocumentRequest) -> Result<DocumentResponse, TransportError>;
}
