//! Order domain types

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::json::JsonError;
use crate::core::json::extract::JsonEnum;

/// Domain identifier of an order
///
/// Never empty or whitespace. Also used as the store partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(value: impl Into<String>) -> Result<Self, JsonError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(JsonError::new("Order id cannot be empty or whitespace."))
        } else {
            Ok(Self(value))
        }
    }

    /// Fresh random order id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque version token assigned by the store
///
/// Compared by raw string equality, quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this tag is the `*` wildcard
    pub fn is_wildcard(&self) -> bool {
        self.0 == "*"
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque pagination cursor, passed back verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        (!value.is_empty()).then_some(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Storage-internal primary key, distinct from [`OrderId`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CosmosId(String);

impl CosmosId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CosmosId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! json_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal, [$($variant:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl JsonEnum for $name {
            const VARIANTS: &'static [Self] = &[$($name::$variant),+];
            const LABEL: &'static str = $label;

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

json_enum!(
    /// Pizza size
    PizzaSize, "pizza size", [Small, Medium, Large]
);
json_enum!(ToppingKind, "topping kind", [Cheese, Pepperoni, Sausage]);
json_enum!(ToppingAmount, "topping amount", [Light, Normal, Extra]);
json_enum!(
    /// Discriminator of [`Status`] in JSON
    StatusName, "order status", [Created, Cancelled]
);

/// A pizza; at most one amount per topping kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pizza {
    pub size: PizzaSize,
    pub toppings: BTreeMap<ToppingKind, ToppingAmount>,
}

impl Pizza {
    pub fn new(size: PizzaSize) -> Self {
        Self {
            size,
            toppings: BTreeMap::new(),
        }
    }

    pub fn with_topping(mut self, kind: ToppingKind, amount: ToppingAmount) -> Self {
        self.toppings.insert(kind, amount);
        self
    }
}

/// Order lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Created { date: DateTime<Utc>, actor: String },
    Cancelled { date: DateTime<Utc>, actor: String },
}

impl Status {
    pub fn created(actor: impl Into<String>) -> Self {
        Status::Created {
            date: Utc::now(),
            actor: actor.into(),
        }
    }

    pub fn cancelled(actor: impl Into<String>) -> Self {
        Status::Cancelled {
            date: Utc::now(),
            actor: actor.into(),
        }
    }

    pub fn name(&self) -> StatusName {
        match self {
            Status::Created { .. } => StatusName::Created,
            Status::Cancelled { .. } => StatusName::Cancelled,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            Status::Created { date, .. } | Status::Cancelled { date, .. } => *date,
        }
    }

    pub fn actor(&self) -> &str {
        match self {
            Status::Created { actor, .. } | Status::Cancelled { actor, .. } => actor,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Status::Cancelled { .. })
    }
}

/// A validated order
///
/// Always holds at least one pizza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    status: Status,
    pizzas: Vec<Pizza>,
}

impl Order {
    pub fn new(id: OrderId, status: Status, pizzas: Vec<Pizza>) -> Result<Self, JsonError> {
        if pizzas.is_empty() {
            return Err(empty_pizzas());
        }

        Ok(Self { id, status, pizzas })
    }

    pub fn id(&self) -> &OrderId {
        &self.id
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn pizzas(&self) -> &[Pizza] {
        &self.pizzas
    }
}

pub(crate) fn empty_pizzas() -> JsonError {
    JsonError::new("An order must contain at least one pizza.").at_property("pizzas")
}

/// An order together with the version it was read or written at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedOrder {
    pub order: Order,
    pub etag: ETag,
}
