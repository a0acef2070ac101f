//! Pizza order API server
//!
//! Runs the API against the store named in the configuration:
//!
//! ```text
//! cargo run --example api_server                       # in-memory store
//! cargo run --example api_server -- config.yaml        # from a YAML file
//! PIZZA_STORE=cosmos \
//! PIZZA_COSMOS_CONNECTION_STRING="AccountEndpoint=...;AccountKey=...;" \
//!     cargo run --example api_server
//! ```

use pizza_orders::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pizza_orders=info,tower_http=info")),
        )
        .init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(path.as_deref())?;

    println!("🍕 Pizza Orders API");
    println!("   store: {:?}", config.store);
    println!("   http://{}/v1/orders", config.server.bind_addr);
    println!();
    println!("   GET    /v1/orders                  - List orders (paged)");
    println!("   POST   /v1/orders                  - Create an order");
    println!("   GET    /v1/orders/{{orderId}}        - Get an order");
    println!("   PUT    /v1/orders/{{orderId}}        - Create or update (conditional)");
    println!("   DELETE /v1/orders/{{orderId}}        - Cancel (If-Match)");

    ServerBuilder::new().with_config(config).serve().await
}
