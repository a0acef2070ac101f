//! Document storage: the store adapter and its transports

#[cfg(feature = "cosmos")]
pub mod cosmos;
pub mod document_store;
pub mod in_memory;
pub mod transport;

#[cfg(feature = "cosmos")]
pub use cosmos::HttpCosmosTransport;
pub use document_store::{DocumentStore, QueryPage, StoreError, VersionedDocument};
pub use in_memory::InMemoryCosmos;
pub use transport::{
    CosmosTransport, DocumentRequest, DocumentResponse, PatchOp, PatchOperation, Precondition,
    SqlQuery, TransportError,
};
