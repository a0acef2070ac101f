//! Router builder for order routes

use super::handlers::{AppState, cancel_order, create_order, get_order, list_orders, put_order};
use axum::{Router, routing::get};

/// Build the `/v1/orders` routes
///
/// - GET /v1/orders (and /v1/orders/) - List orders, one page at a time
/// - POST /v1/orders - Create an order
/// - GET /v1/orders/{orderId} - Get an order
/// - PUT /v1/orders/{orderId} - Create (If-None-Match: *) or update (If-Match)
/// - DELETE /v1/orders/{orderId} - Cancel (If-Match)
pub fn build_order_routes(state: AppState) -> Router {
    Router::new()
        .route("/v1/orders", get(list_orders).post(create_order))
        .route("/v1/orders/", get(list_orders))
        .route(
            "/v1/orders/{orderId}",
            get(get_order).put(put_order).delete(cancel_order),
        )
        .with_state(state)
}
