//! Status-code mapping of the document store adapter
//!
//! A scripted transport plays the part of Cosmos DB so every status the
//! store can answer with is covered, including the ones the in-memory
//! emulator never produces.

mod common;

use axum::http::{HeaderValue, StatusCode, header};
use common::ScriptedTransport;
use futures::TryStreamExt;
use pizza_orders::ordering::{ContinuationToken, CosmosId, ETag};
use pizza_orders::storage::{
    DocumentRequest, DocumentResponse, DocumentStore, PatchOperation, Precondition, SqlQuery,
    StoreError, TransportError,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn store(transport: &ScriptedTransport) -> DocumentStore {
    DocumentStore::new(Arc::new(transport.clone()))
}

fn etag(value: &str) -> ETag {
    ETag::new(value).unwrap()
}

fn page(documents: Value, continuation: Option<&str>) -> DocumentResponse {
    DocumentResponse::new(StatusCode::OK, json!({ "Documents": documents }))
        .with_continuation(continuation.and_then(|c| ContinuationToken::new(c)))
}

// =============================================================================
// create_record
// =============================================================================

#[tokio::test]
async fn test_create_success_returns_document_and_etag() {
    let transport = ScriptedTransport::new()
        .respond(StatusCode::CREATED, json!({ "id": "a", "_etag": "\"v1\"" }));

    let created = store(&transport)
        .create_record(json!({ "id": "a" }), "o-1")
        .await
        .unwrap();

    assert_eq!(created.etag, etag("\"v1\""));
    assert_eq!(created.document["id"], "a");

    match &transport.requests()[0] {
        DocumentRequest::Create {
            partition_key,
            precondition,
            ..
        } => {
            assert_eq!(partition_key, "o-1");
            assert_eq!(precondition, &Precondition::IfNoneMatchAny);
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[tokio::test]
async fn test_create_conflict_and_precondition_failure_are_already_exists() {
    for status in [StatusCode::CONFLICT, StatusCode::PRECONDITION_FAILED] {
        let transport = ScriptedTransport::new().respond(status, json!({ "code": "Conflict" }));
        let err = store(&transport)
            .create_record(json!({ "id": "a" }), "o-1")
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists, "status {}", status);
    }
}

#[tokio::test]
async fn test_create_other_failure_is_unexpected() {
    let transport = ScriptedTransport::new().respond(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "code": "TooManyRequests", "message": "slow down" }),
    );

    let err = store(&transport)
        .create_record(json!({ "id": "a" }), "o-1")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::Unexpected {
            status: 429,
            message: "slow down".to_string()
        }
    );
}

#[tokio::test]
async fn test_create_success_without_etag_is_invalid_response() {
    let transport = ScriptedTransport::new().respond(StatusCode::CREATED, json!({ "id": "a" }));

    let err = store(&transport)
        .create_record(json!({ "id": "a" }), "o-1")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidResponse(_)));
}

// =============================================================================
// patch_record
// =============================================================================

async fn patch(transport: &ScriptedTransport) -> Result<(), StoreError> {
    store(transport)
        .patch_record(
            &CosmosId::new("a"),
            "o-1",
            vec![PatchOperation::set("/status", json!({ "name": "Cancelled" }))],
            &etag("\"v1\""),
        )
        .await
        .map(|_| ())
}

#[tokio::test]
async fn test_patch_sends_if_match() {
    let transport =
        ScriptedTransport::new().respond(StatusCode::OK, json!({ "id": "a", "_etag": "\"v2\"" }));

    patch(&transport).await.unwrap();

    match &transport.requests()[0] {
        DocumentRequest::Patch {
            id,
            precondition,
            operations,
            ..
        } => {
            assert_eq!(id.as_str(), "a");
            assert_eq!(precondition, &Precondition::IfMatch(etag("\"v1\"")));
            assert_eq!(operations[0].path, "/status");
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[tokio::test]
async fn test_patch_status_mapping() {
    let cases = [
        (StatusCode::PRECONDITION_FAILED, StoreError::ETagMismatch),
        (StatusCode::NOT_FOUND, StoreError::NotFound),
    ];

    for (status, expected) in cases {
        let transport = ScriptedTransport::new().respond(status, json!({}));
        assert_eq!(patch(&transport).await.unwrap_err(), expected);
    }

    let transport = ScriptedTransport::new().respond(StatusCode::BAD_REQUEST, json!({}));
    assert!(matches!(
        patch(&transport).await.unwrap_err(),
        StoreError::Unexpected { status: 400, .. }
    ));
}

#[tokio::test]
async fn test_transport_failures() {
    let transport = ScriptedTransport::new().fail(TransportError::Timeout);
    assert_eq!(patch(&transport).await.unwrap_err(), StoreError::Cancelled);

    let transport =
        ScriptedTransport::new().fail(TransportError::Connection("refused".to_string()));
    assert_eq!(
        patch(&transport).await.unwrap_err(),
        StoreError::Transport("refused".to_string())
    );
}

// =============================================================================
// query
// =============================================================================

#[tokio::test]
async fn test_query_page_returns_first_page_only() {
    let transport = ScriptedTransport::new()
        .respond_with(page(json!([{ "id": "a" }, { "id": "b" }]), Some("next")));

    let result = store(&transport)
        .query_page(SqlQuery::new("SELECT * FROM c"), None, None)
        .await
        .unwrap();

    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.continuation, ContinuationToken::new("next"));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_query_accumulates_pages_in_order() {
    let transport = ScriptedTransport::new()
        .respond_with(page(json!([{ "id": "a" }]), Some("t1")))
        .respond_with(page(json!([{ "id": "b" }, { "id": "c" }]), Some("t2")))
        .respond_with(page(json!([]), None));

    let documents = store(&transport)
        .with_page_size(Some(2))
        .query(
            SqlQuery::new("SELECT * FROM c WHERE c.orderId = @orderId")
                .with_parameter("@orderId", "o-1"),
            None,
            Some("o-1"),
        )
        .await
        .unwrap();

    let ids: Vec<&str> = documents.iter().filter_map(|d| d["id"].as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let continuations: Vec<Option<String>> = transport
        .requests()
        .iter()
        .map(|r| match r {
            DocumentRequest::Query {
                continuation,
                partition_key,
                max_item_count,
                ..
            } => {
                assert_eq!(partition_key.as_deref(), Some("o-1"));
                assert_eq!(*max_item_count, Some(2));
                continuation.as_ref().map(|c| c.as_str().to_string())
            }
            other => panic!("unexpected request {:?}", other),
        })
        .collect();
    assert_eq!(
        continuations,
        vec![None, Some("t1".to_string()), Some("t2".to_string())]
    );
}

#[tokio::test]
async fn test_query_pages_stops_on_error() {
    let transport = ScriptedTransport::new()
        .respond_with(page(json!([{ "id": "a" }]), Some("t1")))
        .respond(StatusCode::SERVICE_UNAVAILABLE, json!({ "message": "busy" }));

    let result: Result<Vec<_>, _> = store(&transport)
        .query_pages(SqlQuery::new("SELECT * FROM c"), None, None)
        .try_collect()
        .await;

    assert!(matches!(result, Err(StoreError::Unexpected { status: 503, .. })));
}

#[tokio::test]
async fn test_rejected_continuation_is_invalid_continuation() {
    let transport = ScriptedTransport::new().respond(
        StatusCode::BAD_REQUEST,
        json!({ "message": "Invalid continuation token." }),
    );

    let err = store(&transport)
        .query_page(SqlQuery::new("SELECT * FROM c"), ContinuationToken::new("bogus"), None)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::InvalidContinuation("Invalid continuation token.".to_string())
    );
}

#[tokio::test]
async fn test_bad_request_without_continuation_is_unexpected() {
    let transport = ScriptedTransport::new().respond(StatusCode::BAD_REQUEST, json!({}));

    let err = store(&transport)
        .query_page(SqlQuery::new("SELECT * FROM c"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Unexpected { status: 400, .. }));
}

#[tokio::test]
async fn test_query_without_documents_is_invalid_response() {
    let transport = ScriptedTransport::new().respond(StatusCode::OK, json!({ "value": [] }));

    let err = store(&transport)
        .query_page(SqlQuery::new("SELECT * FROM c"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidResponse(_)));
}

// =============================================================================
// Through the HTTP boundary
// =============================================================================

#[tokio::test]
async fn test_store_conflict_surfaces_as_409() {
    let transport = ScriptedTransport::new().respond(StatusCode::CONFLICT, json!({}));
    let server = common::server_with(transport);

    let response = server
        .put("/v1/orders/order-1")
        .add_header(header::IF_NONE_MATCH, HeaderValue::from_static("*"))
        .json(&common::medium_cheese())
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["code"], "ResourceAlreadyExists");
}

#[tokio::test]
async fn test_store_412_on_patch_surfaces_as_412() {
    // lookup sees the client's ETag, then a concurrent writer wins the patch
    let transport = ScriptedTransport::new()
        .respond_with(page(json!([common::stored_document("order-1", "\"v1\"")]), None))
        .respond(StatusCode::PRECONDITION_FAILED, json!({}));
    let server = common::server_with(transport);

    let response = server
        .delete("/v1/orders/order-1")
        .add_header(header::IF_MATCH, HeaderValue::from_static("\"v1\""))
        .await;

    response.assert_status(StatusCode::PRECONDITION_FAILED);
    let body: Value = response.json();
    assert_eq!(body["code"], "ETagMismatch");
}

#[tokio::test]
async fn test_store_timeout_surfaces_as_503() {
    let transport = ScriptedTransport::new().fail(TransportError::Timeout);
    let server = common::server_with(transport);

    let response = server.get("/v1/orders/order-1").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "RequestCancelled");
}

#[tokio::test]
async fn test_unexpected_store_failure_is_500() {
    let transport = ScriptedTransport::new()
        .respond(StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": "boom" }));
    let server = common::server_with(transport);

    let response = server.get("/v1/orders").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "InternalServerError");
    assert!(!body["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_corrupt_stored_document_is_500() {
    let transport = ScriptedTransport::new()
        .respond_with(page(json!([{ "id": "x", "orderId": "order-1", "_etag": "\"v1\"" }]), None));
    let server = common::server_with(transport);

    let response = server.get("/v1/orders/order-1").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}
