//! ServerBuilder for fluent API to build the HTTP server

use super::handlers::{ACTOR_HEADER, AppState};
use super::router::build_order_routes;
use crate::config::{AppConfig, StoreKind};
use crate::core::ConfigError;
use crate::ordering::OrderRepository;
use crate::storage::{CosmosTransport, DocumentStore, InMemoryCosmos};
use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builder for the order API server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(AppConfig::load(None)?)
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    transport: Option<Arc<dyn CosmosTransport>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            transport: None,
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this transport instead of the one named by `store` in the config
    pub fn with_transport(mut self, transport: impl CosmosTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Add custom routes to the server
    ///
    /// They are merged next to the order routes and share the same layers.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    fn transport(&mut self) -> Result<Arc<dyn CosmosTransport>> {
        if let Some(transport) = self.transport.take() {
            return Ok(transport);
        }

        match self.config.store {
            StoreKind::InMemory => {
                tracing::warn!("Using the in-memory store, orders are lost on restart");
                Ok(Arc::new(InMemoryCosmos::new()))
            }
            #[cfg(feature = "cosmos")]
            StoreKind::Cosmos => {
                let transport =
                    crate::storage::HttpCosmosTransport::from_config(&self.config.cosmos)
                        .context("Invalid Cosmos DB configuration")?;
                tracing::info!(
                    database = %self.config.cosmos.database,
                    container = %self.config.cosmos.container,
                    "Using Cosmos DB store"
                );
                Ok(Arc::new(transport))
            }
            #[cfg(not(feature = "cosmos"))]
            StoreKind::Cosmos => {
                anyhow::bail!("store 'cosmos' requires the 'cosmos' feature")
            }
        }
    }

    fn cors_layer(&self) -> Result<Option<CorsLayer>> {
        let origins = &self.config.server.cors_allowed_origins;
        if origins.is_empty() {
            return Ok(None);
        }

        let origins = origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{}'", o))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([
                    header::CONTENT_TYPE,
                    header::IF_MATCH,
                    header::IF_NONE_MATCH,
                    HeaderName::from_static(ACTOR_HEADER),
                ])
                .expose_headers([header::ETAG, header::LOCATION]),
        ))
    }

    /// Status changes must always name an actor
    fn validate_default_actor(&self) -> Result<(), ConfigError> {
        let actor = &self.config.server.default_actor;
        if actor.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.default_actor".to_string(),
                value: actor.clone(),
                message: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        self.validate_default_actor()?;
        let transport = self.transport()?;
        let store = DocumentStore::new(transport).with_page_size(self.config.cosmos.page_size);
        let state = AppState::new(
            OrderRepository::new(store),
            self.config.server.default_actor.as_str(),
        );

        let mut app = build_order_routes(state);
        for routes in std::mem::take(&mut self.custom_routes) {
            app = app.merge(routes);
        }

        let app = match self.cors_layer()? {
            Some(cors) => app.layer(cors),
            None => app,
        };

        Ok(app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
    }

    /// Serve on the configured bind address with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.bind_addr.clone();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
