//! JSON decoding and encoding of orders
//!
//! Decoders validate every field independently and report all problems of a
//! request at once. Encoders produce the API representation:
//!
//! ```json
//! {
//!   "orderId": "7f1c...",
//!   "status": { "name": "Created", "date": "2026-01-01T12:00:00Z", "actor": "alice" },
//!   "pizzas": [{ "size": "Medium", "toppings": [{ "kind": "Cheese", "amount": "Light" }] }],
//!   "eTag": "\"0400d5a1-0000-0700-0000-65a1b2c30000\""
//! }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

use super::model::{
    ETag, Order, OrderId, Pizza, PizzaSize, Status, StatusName, ToppingAmount, ToppingKind,
    VersionedOrder, empty_pizzas,
};
use crate::core::json::extract::{self, JsonEnum, JsonObject};
use crate::core::json::{self, JsonError, JsonResult, JsonResultExt};

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_topping(value: &Value) -> JsonResult<(ToppingKind, ToppingAmount)> {
    let object = extract::as_object(value)?;
    json::zip(
        extract::enum_property::<ToppingKind>(object, "kind"),
        extract::enum_property::<ToppingAmount>(object, "amount"),
    )
}

fn decode_toppings(object: &JsonObject) -> JsonResult<BTreeMap<ToppingKind, ToppingAmount>> {
    let Some(value) = extract::optional_property(object, "toppings") else {
        return Ok(BTreeMap::new());
    };

    let items = extract::as_array(value).at_property("toppings")?;
    let pairs = json::traverse(items, decode_topping).at_property("toppings")?;

    let mut toppings = BTreeMap::new();
    let mut duplicates: Option<JsonError> = None;
    for (index, (kind, amount)) in pairs.into_iter().enumerate() {
        if toppings.insert(kind, amount).is_some() {
            let err = JsonError::new(format!("Topping '{}' is listed more than once.", kind))
                .at_index(index)
                .at_property("toppings");
            duplicates = Some(match duplicates {
                Some(existing) => existing.combine(err),
                None => err,
            });
        }
    }

    match duplicates {
        Some(e) => Err(e),
        None => Ok(toppings),
    }
}

/// Decode a single pizza
pub fn decode_pizza(value: &Value) -> JsonResult<Pizza> {
    let object = extract::as_object(value)?;
    let (size, toppings) = json::zip(
        extract::enum_property::<PizzaSize>(object, "size"),
        decode_toppings(object),
    )?;
    Ok(Pizza { size, toppings })
}

/// Decode the `pizzas` property; at least one pizza is required
pub fn decode_pizzas(object: &JsonObject) -> JsonResult<Vec<Pizza>> {
    let items = extract::array_property(object, "pizzas")?;
    let pizzas = json::traverse(items, decode_pizza).at_property("pizzas")?;
    if pizzas.is_empty() {
        return Err(empty_pizzas());
    }
    Ok(pizzas)
}

fn decode_date(value: &Value) -> JsonResult<DateTime<Utc>> {
    let raw = extract::as_str(value)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| JsonError::new(format!("'{}' is not a valid RFC 3339 date.", raw)))
}

/// Decode an order status sub-document
pub fn decode_status(value: &Value) -> JsonResult<Status> {
    let object = extract::as_object(value)?;
    let (name, date, actor) = json::zip3(
        extract::enum_property::<StatusName>(object, "name"),
        extract::property(object, "date").and_then(|v| decode_date(v).at_property("date")),
        extract::non_empty_string_property(object, "actor"),
    )?;

    let actor = actor.to_string();
    Ok(match name {
        StatusName::Created => Status::Created { date, actor },
        StatusName::Cancelled => Status::Cancelled { date, actor },
    })
}

fn decode_order_id(object: &JsonObject) -> JsonResult<OrderId> {
    extract::string_property(object, "orderId")
        .and_then(|s| OrderId::new(s).at_property("orderId"))
}

/// Decode a complete order, as encoded by [`encode_order`]
pub fn decode_order(value: &Value) -> JsonResult<Order> {
    let object = extract::as_object(value)?;
    let (id, status, pizzas) = json::zip3(
        decode_order_id(object),
        extract::property(object, "status").and_then(|v| decode_status(v).at_property("status")),
        decode_pizzas(object),
    )?;
    Order::new(id, status, pizzas)
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Client-chosen id; the server generates one when absent
    pub order_id: Option<OrderId>,
    pub pizzas: Vec<Pizza>,
}

/// Decode a create or update request body
///
/// The status is server-assigned and ignored if present.
pub fn decode_order_request(value: &Value) -> JsonResult<OrderRequest> {
    let object = extract::as_object(value)?;

    let order_id = match extract::optional_property(object, "orderId") {
        Some(_) => decode_order_id(object).map(Some),
        None => Ok(None),
    };

    let (order_id, pizzas) = json::zip(order_id, decode_pizzas(object))?;
    Ok(OrderRequest { order_id, pizzas })
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn encode_pizza(pizza: &Pizza) -> Value {
    let toppings: Vec<Value> = pizza
        .toppings
        .iter()
        .map(|(kind, amount)| json!({ "kind": kind.as_str(), "amount": amount.as_str() }))
        .collect();

    json!({
        "size": pizza.size.as_str(),
        "toppings": toppings,
    })
}

pub fn encode_status(status: &Status) -> Value {
    json!({
        "name": status.name().as_str(),
        "date": status.date().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        "actor": status.actor(),
    })
}

/// Encode an order without version information
pub fn encode_order(order: &Order) -> Value {
    let mut object = Map::new();
    object.insert("orderId".to_string(), json!(order.id().as_str()));
    object.insert("status".to_string(), encode_status(order.status()));
    object.insert(
        "pizzas".to_string(),
        Value::Array(order.pizzas().iter().map(encode_pizza).collect()),
    );
    Value::Object(object)
}

/// Encode an order with its `eTag`
pub fn encode_versioned(versioned: &VersionedOrder) -> Value {
    let mut value = encode_order(&versioned.order);
    if let Value::Object(object) = &mut value {
        object.insert("eTag".to_string(), json!(versioned.etag.as_str()));
    }
    value
}

/// Read the `eTag` property written by [`encode_versioned`]
pub fn decode_etag(object: &JsonObject) -> JsonResult<ETag> {
    extract::string_property(object, "eTag").and_then(|s| {
        ETag::new(s)
            .ok_or_else(|| JsonError::new("ETag cannot be empty."))
            .at_property("eTag")
    })
}
