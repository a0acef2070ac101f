//! HTTP server: handlers, routes and the `ServerBuilder`

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::AppState;
pub use router::build_order_routes;
