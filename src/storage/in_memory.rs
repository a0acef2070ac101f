//! In-memory Cosmos container emulator for testing and development
//!
//! Answers [`DocumentRequest`]s with the same status codes a Cosmos DB
//! container would:
//!
//! - create: 201, or 409 when `(partition key, id)` or a unique key is taken
//! - patch: 200, 404 when missing, 412 when `If-Match` is stale
//! - query: 200 with `{"Documents": [...]}` and a continuation token while
//!   more results remain
//!
//! Only `SELECT * FROM c [WHERE c.<prop> = @param [AND ...]]` queries are
//! understood; anything else is answered with 400.

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use regex::Regex;
use serde_json::{Map, Value, json};
use std::sync::{Arc, OnceLock, RwLock};
use uuid::Uuid;

use super::transport::{
    CosmosTransport, DocumentRequest, DocumentResponse, PatchOp, PatchOperation, Precondition,
    SqlQuery, TransportError,
};
use crate::ordering::{ContinuationToken, CosmosId, ETag};

const DEFAULT_PAGE_SIZE: usize = 100;
const PRECONDITION_MESSAGE: &str =
    "Operation cannot be performed because one of the specified precondition is not met.";

#[derive(Debug, Clone)]
struct Entry {
    partition_key: String,
    document: Value,
}

impl Entry {
    fn id(&self) -> Option<&str> {
        self.document.get("id").and_then(Value::as_str)
    }

    fn etag(&self) -> Option<ETag> {
        self.document
            .get("_etag")
            .and_then(Value::as_str)
            .and_then(|s| ETag::new(s))
    }
}

/// In-memory container
///
/// Uses RwLock for thread-safe access. Documents are returned by queries in
/// insertion order.
#[derive(Clone)]
pub struct InMemoryCosmos {
    entries: Arc<RwLock<Vec<Entry>>>,
    unique_keys: Vec<String>,
    default_page_size: usize,
}

impl InMemoryCosmos {
    /// Container with a unique key on `/orderId`
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            unique_keys: vec!["orderId".to_string()],
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Page size used when a query does not ask for one
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn create(
        &self,
        partition_key: String,
        document: Value,
    ) -> Result<DocumentResponse, TransportError> {
        let Value::Object(mut object) = document else {
            return Ok(error_response(StatusCode::BAD_REQUEST, "Document must be a JSON object."));
        };
        let Some(id) = object.get("id").and_then(Value::as_str).map(str::to_string) else {
            return Ok(error_response(StatusCode::BAD_REQUEST, "Document must have a string 'id'."));
        };

        let mut entries = self.entries.write().map_err(|e| lock_error("write", e))?;

        let conflict = entries.iter().filter(|e| e.partition_key == partition_key).any(|e| {
            e.id() == Some(id.as_str())
                || self
                    .unique_keys
                    .iter()
                    .any(|key| object.get(key).is_some() && e.document.get(key) == object.get(key))
        });
        if conflict {
            return Ok(error_response(
                StatusCode::CONFLICT,
                "Entity with the specified id already exists in the system.",
            ));
        }

        let etag = stamp(&mut object);
        let document = Value::Object(object);
        entries.push(Entry {
            partition_key,
            document: document.clone(),
        });

        Ok(DocumentResponse::new(StatusCode::CREATED, document).with_etag(Some(etag)))
    }

    fn patch(
        &self,
        id: &CosmosId,
        partition_key: &str,
        operations: &[PatchOperation],
        precondition: &Precondition,
    ) -> Result<DocumentResponse, TransportError> {
        let mut entries = self.entries.write().map_err(|e| lock_error("write", e))?;

        let Some(entry) = entries
            .iter_mut()
            .find(|e| e.partition_key == partition_key && e.id() == Some(id.as_str()))
        else {
            return Ok(error_response(
                StatusCode::NOT_FOUND,
                "Entity with the specified id does not exist in the system.",
            ));
        };

        if let Precondition::IfMatch(expected) = precondition {
            if !expected.is_wildcard() && entry.etag().as_ref() != Some(expected) {
                return Ok(error_response(StatusCode::PRECONDITION_FAILED, PRECONDITION_MESSAGE));
            }
        }

        let mut document = entry.document.clone();
        for operation in operations {
            if let Err(message) = apply(&mut document, operation) {
                return Ok(error_response(StatusCode::BAD_REQUEST, &message));
            }
        }

        let Value::Object(object) = &mut document else {
            return Ok(error_response(StatusCode::BAD_REQUEST, "Document is not an object."));
        };
        let etag = stamp(object);
        entry.document = document.clone();

        Ok(DocumentResponse::new(StatusCode::OK, document).with_etag(Some(etag)))
    }

    fn query(
        &self,
        query: &SqlQuery,
        partition_key: Option<&str>,
        continuation: Option<&ContinuationToken>,
        max_item_count: Option<u32>,
    ) -> Result<DocumentResponse, TransportError> {
        let filters = match parse_filters(query) {
            Ok(filters) => filters,
            Err(message) => return Ok(error_response(StatusCode::BAD_REQUEST, &message)),
        };

        let offset = match continuation {
            None => 0,
            Some(token) => match decode_token(token) {
                Some(offset) => offset,
                None => {
                    return Ok(error_response(
                        StatusCode::BAD_REQUEST,
                        "Invalid continuation token.",
                    ));
                }
            },
        };
        let page_size = max_item_count
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(self.default_page_size);

        let entries = self.entries.read().map_err(|e| lock_error("read", e))?;

        let matching: Vec<&Value> = entries
            .iter()
            .filter(|e| partition_key.is_none_or(|pk| e.partition_key == pk))
            .map(|e| &e.document)
            .filter(|doc| filters.iter().all(|(prop, value)| doc.get(prop) == Some(value)))
            .collect();

        let documents: Vec<Value> = matching
            .iter()
            .skip(offset)
            .take(page_size)
            .map(|doc| (*doc).clone())
            .collect();
        let next = offset + documents.len();
        let continuation = (next < matching.len()).then(|| encode_token(next));

        let body = json!({ "Documents": documents, "_count": documents.len() });
        Ok(DocumentResponse::new(StatusCode::OK, body).with_continuation(continuation))
    }
}

impl Default for InMemoryCosmos {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CosmosTransport for InMemoryCosmos {
    async fn execute(&self, request: DocumentRequest) -> Result<DocumentResponse, TransportError> {
        match request {
            DocumentRequest::Create {
                partition_key,
                document,
                ..
            } => self.create(partition_key, document),
            DocumentRequest::Patch {
                id,
                partition_key,
                operations,
                precondition,
            } => self.patch(&id, &partition_key, &operations, &precondition),
            DocumentRequest::Query {
                query,
                partition_key,
                continuation,
                max_item_count,
            } => self.query(
                &query,
                partition_key.as_deref(),
                continuation.as_ref(),
                max_item_count,
            ),
        }
    }
}

/// Assign fresh system properties, returning the new ETag
fn stamp(object: &mut Map<String, Value>) -> ETag {
    let etag = format!("\"{}\"", Uuid::new_v4());
    object.insert("_etag".to_string(), Value::String(etag.clone()));
    object.insert("_ts".to_string(), json!(Utc::now().timestamp()));
    ETag::new(etag).unwrap_or_else(|| unreachable!("quoted etag is never empty"))
}

fn apply(document: &mut Value, operation: &PatchOperation) -> Result<(), String> {
    match operation.op {
        PatchOp::Set => {
            let Some(path) = operation.path.strip_prefix('/') else {
                return Err(format!("Invalid patch path '{}'.", operation.path));
            };
            let segments: Vec<&str> = path.split('/').collect();
            let Some((last, parents)) = segments.split_last() else {
                return Err(format!("Invalid patch path '{}'.", operation.path));
            };
            if last.is_empty() {
                return Err(format!("Invalid patch path '{}'.", operation.path));
            }

            let mut target = document;
            for segment in parents {
                target = target
                    .as_object_mut()
                    .and_then(|o| o.get_mut(*segment))
                    .ok_or_else(|| format!("Patch path '{}' does not exist.", operation.path))?;
            }

            let object = target
                .as_object_mut()
                .ok_or_else(|| format!("Patch path '{}' does not exist.", operation.path))?;
            object.insert(last.to_string(), operation.value.clone());
            Ok(())
        }
    }
}

fn parse_filters(query: &SqlQuery) -> Result<Vec<(String, Value)>, String> {
    static SELECT: OnceLock<Regex> = OnceLock::new();
    static CONDITION: OnceLock<Regex> = OnceLock::new();
    static AND: OnceLock<Regex> = OnceLock::new();

    let select = SELECT.get_or_init(|| {
        Regex::new(r"(?is)^\s*SELECT\s+\*\s+FROM\s+c(?:\s+WHERE\s+(.+?))?\s*$").unwrap()
    });
    let condition =
        CONDITION.get_or_init(|| Regex::new(r"^\s*c\.(\w+)\s*=\s*(@\w+)\s*$").unwrap());
    let and = AND.get_or_init(|| Regex::new(r"(?i)\s+AND\s+").unwrap());

    let captures = select
        .captures(&query.query)
        .ok_or_else(|| format!("Unsupported query: {}", query.query))?;

    let Some(clause) = captures.get(1) else {
        return Ok(Vec::new());
    };

    and.split(clause.as_str())
        .map(|part| {
            let c = condition
                .captures(part)
                .ok_or_else(|| format!("Unsupported condition: {}", part.trim()))?;
            let value = query
                .parameter(&c[2])
                .ok_or_else(|| format!("Missing query parameter {}", &c[2]))?;
            Ok((c[1].to_string(), value.clone()))
        })
        .collect()
}

fn encode_token(offset: usize) -> ContinuationToken {
    ContinuationToken::new(format!("{{\"offset\":{}}}", offset))
        .unwrap_or_else(|| unreachable!("token is never empty"))
}

fn decode_token(token: &ContinuationToken) -> Option<usize> {
    serde_json::from_str::<Value>(token.as_str())
        .ok()?
        .get("offset")?
        .as_u64()
        .map(|n| n as usize)
}

fn lock_error(kind: &str, err: impl std::fmt::Display) -> TransportError {
    TransportError::Connection(format!("Failed to acquire {} lock: {}", kind, err))
}

fn error_response(status: StatusCode, message: &str) -> DocumentResponse {
    let code = status.canonical_reason().unwrap_or("Error").replace(' ', "");
    DocumentResponse::new(status, json!({ "code": code, "message": message }))
}
