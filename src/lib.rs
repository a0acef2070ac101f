//! # Pizza Orders
//!
//! A pizza ordering REST API over a Cosmos DB container.
//!
//! ## Features
//!
//! - **Accumulating Validation**: every problem in a request body is reported at once
//! - **Optimistic Concurrency**: writes are conditional on `If-Match` / `If-None-Match`
//! - **Client-driven Pagination**: listings return a `nextLink` with a continuation token
//! - **Pluggable Store**: Cosmos DB REST transport or an in-memory emulator
//! - **Configuration-Based**: YAML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pizza_orders::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_config(AppConfig::load(None)?)
//!         .serve()
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod ordering;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        conditional::{ConditionalHeaders, HeaderError, WriteIntent},
        error::{ApiError, ConfigError, ErrorResponse},
        json::{JsonError, JsonResult},
        query::ListParams,
    };

    // === Orders ===
    pub use crate::ordering::{
        ContinuationToken, CosmosId, ETag, Order, OrderError, OrderId, OrderPage, OrderRepository,
        Pizza, PizzaSize, Status, StatusName, ToppingAmount, ToppingKind, VersionedOrder,
    };

    // === Storage ===
    #[cfg(feature = "cosmos")]
    pub use crate::storage::HttpCosmosTransport;
    pub use crate::storage::{CosmosTransport, DocumentStore, InMemoryCosmos, StoreError};

    // === Config ===
    pub use crate::config::{AppConfig, CosmosConfig, ServerConfig, StoreKind};

    // === Server ===
    pub use crate::server::{AppState, ServerBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
}
