//! Document store adapter
//!
//! Maps create / patch / query onto [`DocumentRequest`]s and turns the
//! store's HTTP status codes into typed outcomes:
//!
//! | Operation | Status | Outcome |
//! |-----------|--------|---------|
//! | create | 409, 412 | [`StoreError::AlreadyExists`] |
//! | patch | 412 | [`StoreError::ETagMismatch`] |
//! | patch | 404 | [`StoreError::NotFound`] |
//! | query with a continuation | 400 | [`StoreError::InvalidContinuation`] |
//! | any | other non-2xx | [`StoreError::Unexpected`] |
//!
//! Writes carry their precondition to the store, which enforces it
//! atomically. The adapter holds no locks and never retries.

use axum::http::StatusCode;
use futures::{Stream, TryStreamExt, stream};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::transport::{
    CosmosTransport, DocumentRequest, DocumentResponse, PatchOperation, Precondition, SqlQuery,
    TransportError,
};
use crate::ordering::{ContinuationToken, CosmosId, ETag};

/// Typed outcome of a failed store operation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("document already exists")]
    AlreadyExists,

    #[error("document was modified (ETag mismatch)")]
    ETagMismatch,

    #[error("document not found")]
    NotFound,

    #[error("store call was cancelled")]
    Cancelled,

    #[error("continuation token was rejected: {0}")]
    InvalidContinuation(String),

    #[error("store returned unexpected status {status}: {message}")]
    Unexpected { status: u16, message: String },

    #[error("store returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("store unreachable: {0}")]
    Transport(String),
}

impl From<TransportError> for StoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => StoreError::Cancelled,
            TransportError::Connection(message) => StoreError::Transport(message),
            TransportError::InvalidResponse(message) => StoreError::InvalidResponse(message),
        }
    }
}

/// A document together with its current ETag
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub document: Value,
    pub etag: ETag,
}

/// One page of query results
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPage {
    pub documents: Vec<Value>,
    /// Token for the next page; `None` on the last page
    pub continuation: Option<ContinuationToken>,
}

/// Adapter over a [`CosmosTransport`]
///
/// Cheap to clone; all clones share the same transport.
#[derive(Clone)]
pub struct DocumentStore {
    transport: Arc<dyn CosmosTransport>,
    page_size: Option<u32>,
}

impl DocumentStore {
    pub fn new(transport: Arc<dyn CosmosTransport>) -> Self {
        Self {
            transport,
            page_size: None,
        }
    }

    /// Ask the store for at most `page_size` documents per page
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    async fn execute(&self, request: DocumentRequest) -> Result<DocumentResponse, StoreError> {
        let operation = request.operation();
        let response = self.transport.execute(request).await.map_err(|e| {
            tracing::error!(operation, error = %e, "Store request failed");
            StoreError::from(e)
        })?;

        tracing::debug!(operation, status = response.status.as_u16(), "Store request completed");
        Ok(response)
    }

    /// Create a document, failing if it already exists
    pub async fn create_record(
        &self,
        document: Value,
        partition_key: &str,
    ) -> Result<VersionedDocument, StoreError> {
        let response = self
            .execute(DocumentRequest::Create {
                partition_key: partition_key.to_string(),
                document,
                precondition: Precondition::IfNoneMatchAny,
            })
            .await?;

        match response.status {
            s if s.is_success() => versioned(response),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                tracing::warn!(partition_key, "Create rejected, document already exists");
                Err(StoreError::AlreadyExists)
            }
            s => Err(unexpected(s, &response.body)),
        }
    }

    /// Apply `operations` if the stored document still has `if_match`
    pub async fn patch_record(
        &self,
        id: &CosmosId,
        partition_key: &str,
        operations: Vec<PatchOperation>,
        if_match: &ETag,
    ) -> Result<VersionedDocument, StoreError> {
        let response = self
            .execute(DocumentRequest::Patch {
                id: id.clone(),
                partition_key: partition_key.to_string(),
                operations,
                precondition: Precondition::IfMatch(if_match.clone()),
            })
            .await?;

        match response.status {
            s if s.is_success() => versioned(response),
            StatusCode::PRECONDITION_FAILED => {
                tracing::warn!(%id, partition_key, "Patch rejected, ETag mismatch");
                Err(StoreError::ETagMismatch)
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            s => Err(unexpected(s, &response.body)),
        }
    }

    /// Fetch a single page of query results
    pub async fn query_page(
        &self,
        query: SqlQuery,
        continuation: Option<ContinuationToken>,
        partition_key: Option<&str>,
    ) -> Result<QueryPage, StoreError> {
        let resuming = continuation.is_some();
        let response = self
            .execute(DocumentRequest::Query {
                query,
                partition_key: partition_key.map(str::to_string),
                continuation,
                max_item_count: self.page_size,
            })
            .await?;

        if resuming && response.status == StatusCode::BAD_REQUEST {
            let message = error_message(&response.body);
            tracing::warn!(%message, "Continuation token rejected");
            return Err(StoreError::InvalidContinuation(message));
        }
        if !response.status.is_success() {
            return Err(unexpected(response.status, &response.body));
        }

        let documents = match response.body.get("Documents") {
            Some(Value::Array(documents)) => documents.clone(),
            _ => {
                return Err(StoreError::InvalidResponse(
                    "query response has no 'Documents' array".to_string(),
                ));
            }
        };

        Ok(QueryPage {
            documents,
            continuation: response.continuation,
        })
    }

    /// Stream every page of a query, following continuation tokens
    pub fn query_pages(
        &self,
        query: SqlQuery,
        continuation: Option<ContinuationToken>,
        partition_key: Option<String>,
    ) -> impl Stream<Item = Result<QueryPage, StoreError>> + Send + 'static {
        enum Cursor {
            Start(Option<ContinuationToken>),
            Next(ContinuationToken),
            Done,
        }

        let store = self.clone();
        stream::try_unfold(Cursor::Start(continuation), move |cursor| {
            let store = store.clone();
            let query = query.clone();
            let partition_key = partition_key.clone();
            async move {
                let token = match cursor {
                    Cursor::Done => return Ok::<_, StoreError>(None),
                    Cursor::Start(token) => token,
                    Cursor::Next(token) => Some(token),
                };

                let page = store
                    .query_page(query, token, partition_key.as_deref())
                    .await?;
                let next = match &page.continuation {
                    Some(token) => Cursor::Next(token.clone()),
                    None => Cursor::Done,
                };
                Ok::<_, StoreError>(Some((page, next)))
            }
        })
    }

    /// Run a query to completion, concatenating every page in order
    pub async fn query(
        &self,
        query: SqlQuery,
        continuation: Option<ContinuationToken>,
        partition_key: Option<&str>,
    ) -> Result<Vec<Value>, StoreError> {
        let pages: Vec<QueryPage> = self
            .query_pages(query, continuation, partition_key.map(str::to_string))
            .try_collect()
            .await?;

        Ok(pages.into_iter().flat_map(|page| page.documents).collect())
    }
}

fn versioned(response: DocumentResponse) -> Result<VersionedDocument, StoreError> {
    let etag = response
        .etag
        .or_else(|| {
            response
                .body
                .get("_etag")
                .and_then(Value::as_str)
                .and_then(|s| ETag::new(s))
        })
        .ok_or_else(|| StoreError::InvalidResponse("response carries no ETag".to_string()))?;

    Ok(VersionedDocument {
        document: response.body,
        etag,
    })
}

fn error_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

fn unexpected(status: StatusCode, body: &Value) -> StoreError {
    let message = error_message(body);
    tracing::error!(status = status.as_u16(), %message, "Unexpected store response");
    StoreError::Unexpected {
        status: status.as_u16(),
        message,
    }
}
