//! HTTP-level tests for the order API
//!
//! Every test drives the full router (decoder, conditional headers,
//! repository, in-memory store, encoder) through `axum_test`.

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum_test::{TestResponse, TestServer};
use serde_json::{Value, json};

fn h(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap()
}

fn etag_of(response: &TestResponse) -> String {
    response
        .headers()
        .get(header::ETAG)
        .expect("ETag header")
        .to_str()
        .unwrap()
        .to_string()
}

async fn create(server: &TestServer, id: &str) -> TestResponse {
    let response = server
        .put(&format!("/v1/orders/{}", id))
        .add_header(header::IF_NONE_MATCH, h("*"))
        .json(&common::medium_cheese())
        .await;
    response.assert_status(StatusCode::CREATED);
    response
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_put_with_if_none_match_creates_order() {
    let server = common::server();

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, h("*"))
        .json(&json!({
            "pizzas": [{ "size": "Medium", "toppings": [{ "kind": "Cheese", "amount": "Light" }] }]
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["orderId"], "order-1");
    assert_eq!(body["status"]["name"], "Created");
    assert_eq!(body["status"]["actor"], "test-suite");
    assert_eq!(body["pizzas"][0]["size"], "Medium");
    assert_eq!(body["pizzas"][0]["toppings"][0]["kind"], "Cheese");

    let etag = body["eTag"].as_str().unwrap();
    assert!(!etag.is_empty());
    assert_eq!(etag_of(&response), etag);
    assert_eq!(response.headers()[header::LOCATION], "/v1/orders/order-1");

    // storage id and system properties stay internal
    assert!(body.get("id").is_none());
    assert!(body.get("_etag").is_none());
}

#[tokio::test]
async fn test_put_create_twice_conflicts() {
    let server = common::server();
    create(&server, "order-1").await;

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, h("*"))
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "ResourceAlreadyExists");
}

#[tokio::test]
async fn test_post_generates_order_id() {
    let server = common::server();

    let response = server.post("/v1/orders").json(&common::medium_cheese()).await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let id = body["orderId"].as_str().unwrap();
    uuid::Uuid::parse_str(id).unwrap();
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("/v1/orders/{}", id).as_str()
    );

    server.get(&format!("/v1/orders/{}", id)).await.assert_status_ok();
}

#[tokio::test]
async fn test_post_with_client_id() {
    let server = common::server();
    let mut body = common::medium_cheese();
    body["orderId"] = json!("my-order");

    let response = server.post("/v1/orders").json(&body).await;
    response.assert_status(StatusCode::CREATED);

    let conflict = server.post("/v1/orders").json(&body).await;
    conflict.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_actor_header_is_recorded() {
    let server = common::server();

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, h("*"))
        .add_header(HeaderName::from_static("x-actor"), h("alice"))
        .json(&common::medium_cheese())
        .await;

    let body: Value = response.json();
    assert_eq!(body["status"]["actor"], "alice");
}

// =============================================================================
// Read
// =============================================================================

#[tokio::test]
async fn test_get_returns_order_and_etag() {
    let server = common::server();
    let created: Value = create(&server, "order-1").await.json();

    let response = server.get("/v1/orders/order-1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body, created);
    assert_eq!(etag_of(&response), created["eTag"].as_str().unwrap());
}

#[tokio::test]
async fn test_get_missing_order_is_404() {
    let server = common::server();

    let response = server.get("/v1/orders/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "ResourceNotFound");
}

#[tokio::test]
async fn test_blank_order_id_is_invalid_parameter() {
    let server = common::server();

    let response = server.get("/v1/orders/%20%20").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidRequestParameter");
    assert_eq!(body["innerError"]["code"], "InvalidId");
}

// =============================================================================
// List
// =============================================================================

#[tokio::test]
async fn test_empty_listing() {
    let server = common::server();

    for path in ["/v1/orders", "/v1/orders/"] {
        let response = server.get(path).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "value": [] }));
    }
}

#[tokio::test]
async fn test_listing_follows_next_link() {
    let server = common::paged_server(2);
    for i in 0..5 {
        create(&server, &format!("order-{}", i)).await;
    }

    let mut seen = Vec::new();
    let mut path = "/v1/orders".to_string();
    let mut pages = 0;
    loop {
        let body: Value = server.get(&path).await.json();
        pages += 1;
        for order in body["value"].as_array().unwrap() {
            assert!(order["eTag"].is_string());
            seen.push(order["orderId"].as_str().unwrap().to_string());
        }
        match body.get("nextLink").and_then(Value::as_str) {
            Some(next) => {
                assert!(next.starts_with("/v1/orders?continuationToken="));
                path = next.to_string();
            }
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(seen, vec!["order-0", "order-1", "order-2", "order-3", "order-4"]);
}

#[tokio::test]
async fn test_listing_with_garbage_continuation_token_is_400() {
    let server = common::server();
    create(&server, "order-1").await;

    let response = server.get("/v1/orders?continuationToken=garbage").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidRequestParameter");
    assert_eq!(body["innerError"]["code"], "InvalidContinuationToken");
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_put_with_if_match_replaces_pizzas() {
    let server = common::server();
    let etag = etag_of(&create(&server, "order-1").await);

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(&etag))
        .json(&json!({ "pizzas": [{ "size": "large" }, { "size": "small" }] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["pizzas"].as_array().unwrap().len(), 2);
    assert_eq!(body["pizzas"][0]["size"], "Large");
    assert_eq!(body["status"]["name"], "Created");
    assert_ne!(body["eTag"], etag.as_str());
}

#[tokio::test]
async fn test_put_with_stale_etag_is_412() {
    let server = common::server();
    let etag = etag_of(&create(&server, "order-1").await);

    for expected in [StatusCode::OK, StatusCode::PRECONDITION_FAILED] {
        let response = server
            .put("/v1/orders/order-1")
            .add_header(header::IF_MATCH, h(&etag))
            .json(&common::medium_cheese())
            .await;
        response.assert_status(expected);
    }

    let body: Value = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(&etag))
        .json(&common::medium_cheese())
        .await
        .json();
    assert_eq!(body["code"], "ETagMismatch");
}

#[tokio::test]
async fn test_put_update_of_missing_order_is_404() {
    let server = common::server();

    let response = server
        .put("/v1/orders/nope")
        .add_header(header::IF_MATCH, h("\"v1\""))
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_body_id_must_match_path() {
    let server = common::server();
    let mut body = common::medium_cheese();
    body["orderId"] = json!("other");

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, h("*"))
        .json(&body)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidRequestBody");
}

// =============================================================================
// Conditional headers
// =============================================================================

#[tokio::test]
async fn test_put_without_conditional_header_is_428() {
    let server = common::server();

    let response = server
        .put("/v1/orders/order-1")
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::PRECONDITION_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidConditionalHeader");
}

#[tokio::test]
async fn test_put_with_both_headers_is_400() {
    let server = common::server();

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h("\"v1\""))
        .add_header(header::IF_NONE_MATCH, h("*"))
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidConditionalHeader");
}

#[tokio::test]
async fn test_put_with_non_wildcard_if_none_match_is_400() {
    let server = common::server();

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, h("\"v1\""))
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// Cancel
// =============================================================================

#[tokio::test]
async fn test_delete_cancels_order() {
    let server = common::server();
    let created: Value = create(&server, "order-1").await.json();
    let etag = created["eTag"].as_str().unwrap();

    let response = server
        .delete("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(etag))
        .add_header(HeaderName::from_static("x-actor"), h("bob"))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let body: Value = server.get("/v1/orders/order-1").await.json();
    assert_eq!(body["status"]["name"], "Cancelled");
    assert_eq!(body["status"]["actor"], "bob");
    assert_eq!(body["pizzas"], created["pizzas"]);
    assert_eq!(etag_of(&response), body["eTag"].as_str().unwrap());
}

#[tokio::test]
async fn test_delete_requires_if_match() {
    let server = common::server();
    create(&server, "order-1").await;

    let response = server.delete("/v1/orders/order-1").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidConditionalHeader");
}

#[tokio::test]
async fn test_delete_with_stale_etag_is_412() {
    let server = common::server();
    let etag = etag_of(&create(&server, "order-1").await);

    server
        .put("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(&etag))
        .json(&common::medium_cheese())
        .await
        .assert_status_ok();

    let response = server
        .delete("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(&etag))
        .await;
    response.assert_status(StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn test_delete_missing_order_is_404() {
    let server = common::server();

    let response = server
        .delete("/v1/orders/nope")
        .add_header(header::IF_MATCH, h("\"v1\""))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancelled_order_cannot_change() {
    let server = common::server();
    create(&server, "order-1").await;
    let current: Value = server.get("/v1/orders/order-1").await.json();

    let cancel = server
        .delete("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(current["eTag"].as_str().unwrap()))
        .await;
    let etag = etag_of(&cancel);

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_MATCH, h(&etag))
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidRequestBody");
    assert_eq!(body["innerError"]["code"], "OrderCancelled");
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_empty_pizzas_is_rejected() {
    let server = common::server();

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, h("*"))
        .json(&json!({ "pizzas": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidRequestBody");
    assert_eq!(body["innerError"]["code"], "InvalidJsonBody");
    assert!(body["message"].as_str().unwrap().contains("pizza"));
}

#[tokio::test]
async fn test_all_validation_errors_are_reported() {
    let server = common::server();

    let response = server
        .post("/v1/orders")
        .json(&json!({ "pizzas": [
            { "size": "Huge" },
            { "size": "Small", "toppings": [{ "kind": "Anchovy", "amount": "Light" }] }
        ]}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["message"], "Multiple errors occurred.");

    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["target"], "pizzas[0].size");
    assert!(details[0]["message"].as_str().unwrap().contains("'Huge'"));
    assert_eq!(details[1]["target"], "pizzas[1].toppings[0].kind");
    assert!(details[1]["message"].as_str().unwrap().contains("'Anchovy'"));
}

#[tokio::test]
async fn test_malformed_json_is_invalid_body() {
    let server = common::server();

    let response = server
        .post("/v1/orders")
        .add_header(header::CONTENT_TYPE, h("application/json"))
        .bytes("{ not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "InvalidRequestBody");
}
