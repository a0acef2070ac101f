//! Stored document layout
//!
//! Orders are persisted as the API representation plus the storage-internal
//! `id` (a [`CosmosId`]). The store adds system properties such as `_etag`
//! and `_ts`, which are ignored on read except for the ETag.

use serde_json::Value;

use super::codec::{decode_order, encode_order, encode_pizza, encode_status};
use super::model::{CosmosId, ETag, Order, Pizza, Status, VersionedOrder};
use crate::core::json::extract;
use crate::core::json::{self, JsonError, JsonResult, JsonResultExt};
use crate::storage::PatchOperation;

pub const ID: &str = "id";
pub const ETAG: &str = "_etag";
pub const ORDER_ID: &str = "orderId";

/// An order as read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
    pub cosmos_id: CosmosId,
    pub order: Order,
    pub etag: ETag,
}

impl StoredOrder {
    pub fn into_versioned(self) -> VersionedOrder {
        VersionedOrder {
            order: self.order,
            etag: self.etag,
        }
    }
}

/// Build the document to create for a new order
pub fn encode_document(order: &Order, cosmos_id: &CosmosId) -> Value {
    let mut value = encode_order(order);
    if let Value::Object(object) = &mut value {
        object.insert(ID.to_string(), Value::String(cosmos_id.as_str().to_string()));
    }
    value
}

/// Decode a stored document, including its storage id and `_etag`
pub fn decode_document(value: &Value) -> JsonResult<StoredOrder> {
    let object = extract::as_object(value)?;
    let (cosmos_id, etag, order) = json::zip3(
        extract::non_empty_string_property(object, ID).map(CosmosId::new),
        extract::string_property(object, ETAG).and_then(|s| {
            ETag::new(s)
                .ok_or_else(|| JsonError::new("ETag cannot be empty."))
                .at_property(ETAG)
        }),
        decode_order(value),
    )?;

    Ok(StoredOrder {
        cosmos_id,
        order,
        etag,
    })
}

/// Patch that rewrites only the status sub-document
pub fn status_patch(status: &Status) -> Vec<PatchOperation> {
    vec![PatchOperation::set("/status", encode_status(status))]
}

/// Patch that replaces the pizza list
pub fn pizzas_patch(pizzas: &[Pizza]) -> Vec<PatchOperation> {
    vec![PatchOperation::set(
        "/pizzas",
        Value::Array(pizzas.iter().map(encode_pizza).collect()),
    )]
}
