//! Pizza orders: domain model, JSON codec, stored layout and repository

pub mod codec;
pub mod document;
pub mod model;
pub mod repository;

pub use codec::{OrderRequest, decode_order, decode_order_request, encode_order, encode_versioned};
pub use model::{
    ContinuationToken, CosmosId, ETag, Order, OrderId, Pizza, PizzaSize, Status, StatusName,
    ToppingAmount, ToppingKind, VersionedOrder,
};
pub use repository::{OrderError, OrderPage, OrderRepository};
