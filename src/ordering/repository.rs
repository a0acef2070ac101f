//! Order persistence on top of the document store
//!
//! Every write is a single conditional store call. Reads resolve the
//! storage id of an order through a partition-scoped query on `orderId`.

use serde_json::Value;
use thiserror::Error;

use super::document::{self, StoredOrder};
use super::model::{
    ContinuationToken, CosmosId, ETag, Order, OrderId, Pizza, Status, VersionedOrder,
};
use crate::core::json::JsonError;
use crate::storage::{DocumentStore, QueryPage, SqlQuery, StoreError};

const BY_ORDER_ID: &str = "SELECT * FROM c WHERE c.orderId = @orderId";
const ALL_ORDERS: &str = "SELECT * FROM c";

/// Failure of a repository operation
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order '{0}' not found")]
    NotFound(OrderId),

    #[error("order '{0}' already exists")]
    AlreadyExists(OrderId),

    #[error("order '{0}' was modified (ETag mismatch)")]
    ETagMismatch(OrderId),

    #[error("order '{0}' is cancelled and can no longer change")]
    Cancelled(OrderId),

    #[error("stored order document is invalid: {0}")]
    InvalidDocument(JsonError),

    #[error(transparent)]
    Store(StoreError),
}

/// One page of the order listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub orders: Vec<VersionedOrder>,
    pub continuation: Option<ContinuationToken>,
}

/// Reads and writes orders
#[derive(Clone)]
pub struct OrderRepository {
    store: DocumentStore,
}

impl OrderRepository {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Fetch an order with its current ETag
    pub async fn get(&self, id: &OrderId) -> Result<VersionedOrder, OrderError> {
        self.find(id).await.map(StoredOrder::into_versioned)
    }

    /// Fetch one page of orders, starting at `continuation`
    pub async fn list_page(
        &self,
        continuation: Option<ContinuationToken>,
    ) -> Result<OrderPage, OrderError> {
        let QueryPage {
            documents,
            continuation,
        } = self
            .store
            .query_page(SqlQuery::new(ALL_ORDERS), continuation, None)
            .await
            .map_err(OrderError::Store)?;

        let orders = decode_all(&documents)?;
        Ok(OrderPage {
            orders,
            continuation,
        })
    }

    /// Create a new order; fails if one with the same id exists
    pub async fn create(&self, order: &Order) -> Result<VersionedOrder, OrderError> {
        let cosmos_id = CosmosId::generate();
        let document = document::encode_document(order, &cosmos_id);

        let created = self
            .store
            .create_record(document, order.id().as_str())
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => OrderError::AlreadyExists(order.id().clone()),
                e => OrderError::Store(e),
            })?;

        tracing::info!(order_id = %order.id(), %cosmos_id, "Order created");
        decode(&created.document).map(StoredOrder::into_versioned)
    }

    /// Replace the pizzas of an existing order if it is still at `if_match`
    pub async fn replace_pizzas(
        &self,
        id: &OrderId,
        pizzas: &[Pizza],
        if_match: &ETag,
    ) -> Result<VersionedOrder, OrderError> {
        let current = self.find_writable(id, if_match).await?;
        let updated = self
            .patch(id, &current.cosmos_id, document::pizzas_patch(pizzas), if_match)
            .await?;

        tracing::info!(order_id = %id, "Order pizzas replaced");
        Ok(updated)
    }

    /// Mark an order cancelled if it is still at `if_match`
    ///
    /// Only the status sub-document is rewritten.
    pub async fn cancel(
        &self,
        id: &OrderId,
        actor: &str,
        if_match: &ETag,
    ) -> Result<VersionedOrder, OrderError> {
        let current = self.find_writable(id, if_match).await?;
        let status = Status::cancelled(actor);
        let updated = self
            .patch(id, &current.cosmos_id, document::status_patch(&status), if_match)
            .await?;

        tracing::info!(order_id = %id, actor, "Order cancelled");
        Ok(updated)
    }

    async fn find(&self, id: &OrderId) -> Result<StoredOrder, OrderError> {
        let query = SqlQuery::new(BY_ORDER_ID).with_parameter("@orderId", id.as_str());
        let page = self
            .store
            .query_page(query, None, Some(id.as_str()))
            .await
            .map_err(OrderError::Store)?;

        match page.documents.first() {
            Some(document) => decode(document),
            None => Err(OrderError::NotFound(id.clone())),
        }
    }

    /// Read the order for a conditional write
    ///
    /// A stale `if_match` is rejected here without a write; the store still
    /// enforces it atomically on the patch itself.
    async fn find_writable(
        &self,
        id: &OrderId,
        if_match: &ETag,
    ) -> Result<StoredOrder, OrderError> {
        let current = self.find(id).await?;

        if !if_match.is_wildcard() && &current.etag != if_match {
            tracing::warn!(order_id = %id, "Stale If-Match, order has changed");
            return Err(OrderError::ETagMismatch(id.clone()));
        }
        if current.order.status().is_cancelled() {
            return Err(OrderError::Cancelled(id.clone()));
        }
        Ok(current)
    }

    async fn patch(
        &self,
        id: &OrderId,
        cosmos_id: &CosmosId,
        operations: Vec<crate::storage::PatchOperation>,
        if_match: &ETag,
    ) -> Result<VersionedOrder, OrderError> {
        let patched = self
            .store
            .patch_record(cosmos_id, id.as_str(), operations, if_match)
            .await
            .map_err(|e| match e {
                StoreError::ETagMismatch => OrderError::ETagMismatch(id.clone()),
                StoreError::NotFound => OrderError::NotFound(id.clone()),
                e => OrderError::Store(e),
            })?;

        decode(&patched.document).map(StoredOrder::into_versioned)
    }
}

fn decode(document: &Value) -> Result<StoredOrder, OrderError> {
    document::decode_document(document).map_err(|e| {
        tracing::error!(error = %e, "Stored order document failed to decode");
        OrderError::InvalidDocument(e)
    })
}

fn decode_all(documents: &[Value]) -> Result<Vec<VersionedOrder>, OrderError> {
    documents
        .iter()
        .map(|d| decode(d).map(StoredOrder::into_versioned))
        .collect()
}
