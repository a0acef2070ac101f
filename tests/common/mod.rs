//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use pizza_orders::config::AppConfig;
use pizza_orders::server::ServerBuilder;
use pizza_orders::storage::{
    CosmosTransport, DocumentRequest, DocumentResponse, InMemoryCosmos, TransportError,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Transport that answers with pre-scripted responses and records requests
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<DocumentResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<DocumentRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: StatusCode, body: Value) -> Self {
        let etag = body
            .get("_etag")
            .and_then(Value::as_str)
            .and_then(|s| pizza_orders::ordering::ETag::new(s));
        self.push(Ok(DocumentResponse::new(status, body).with_etag(etag)))
    }

    pub fn respond_with(self, response: DocumentResponse) -> Self {
        self.push(Ok(response))
    }

    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error))
    }

    fn push(self, response: Result<DocumentResponse, TransportError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<DocumentRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CosmosTransport for ScriptedTransport {
    async fn execute(&self, request: DocumentRequest) -> Result<DocumentResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response left"))
    }
}

/// Test server over a fresh in-memory store
pub fn server() -> TestServer {
    server_with(InMemoryCosmos::new())
}

/// Test server over an in-memory store with small pages
pub fn paged_server(page_size: usize) -> TestServer {
    server_with(InMemoryCosmos::new().with_default_page_size(page_size))
}

pub fn server_with(transport: impl CosmosTransport + 'static) -> TestServer {
    let mut config = AppConfig::default();
    config.server.default_actor = "test-suite".to_string();

    let app = ServerBuilder::new()
        .with_config(config)
        .with_transport(transport)
        .build()
        .unwrap();
    TestServer::new(app)
}

/// Body with one medium pizza with light cheese
pub fn medium_cheese() -> Value {
    json!({
        "pizzas": [
            { "size": "Medium", "toppings": [{ "kind": "Cheese", "amount": "Light" }] }
        ]
    })
}

/// A stored order document as the store would return it
pub fn stored_document(order_id: &str, etag: &str) -> Value {
    json!({
        "id": "cosmos-1",
        "orderId": order_id,
        "status": { "name": "Created", "date": "2026-01-02T03:04:05Z", "actor": "alice" },
        "pizzas": [{ "size": "Small", "toppings": [] }],
        "_etag": etag,
        "_ts": 1767323045
    })
}
