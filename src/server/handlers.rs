//! HTTP handlers for order operations
//!
//! Handlers decode and validate the request, resolve conditional headers for
//! writes, make one repository call and encode the result. Every failure is
//! an [`ApiError`].

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::core::conditional::{ConditionalHeaders, WriteIntent};
use crate::core::error::ApiError;
use crate::core::json::JsonError;
use crate::core::query::{ListParams, next_link};
use crate::ordering::codec::{decode_order_request, encode_versioned};
use crate::ordering::{ETag, Order, OrderId, OrderRepository, Status, VersionedOrder};

/// Header naming who performs a status change
pub const ACTOR_HEADER: &str = "x-actor";

/// Path of the order collection
pub const ORDERS_PATH: &str = "/v1/orders";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: OrderRepository,
    /// Actor used when a request carries no `X-Actor` header
    pub default_actor: Arc<str>,
}

impl AppState {
    pub fn new(repository: OrderRepository, default_actor: impl Into<Arc<str>>) -> Self {
        Self {
            repository,
            default_actor: default_actor.into(),
        }
    }

    fn actor(&self, headers: &HeaderMap) -> String {
        headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&*self.default_actor)
            .to_string()
    }
}

/// Response for the list endpoint
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub value: Vec<Value>,
    #[serde(rename = "nextLink", skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// GET /v1/orders/{orderId}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_order_id(&order_id)?;
    let order = state.repository.get(&id).await?;
    order_response(StatusCode::OK, &order, false)
}

/// GET /v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let page = state.repository.list_page(params.continuation()).await?;

    Ok(Json(ListOrdersResponse {
        value: page.orders.iter().map(encode_versioned).collect(),
        next_link: page
            .continuation
            .as_ref()
            .map(|token| next_link(ORDERS_PATH, token)),
    }))
}

/// POST /v1/orders
///
/// Creates an order; the id is generated when the body has none.
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = decode_order_request(&read_body(body)?)?;
    let id = request.order_id.unwrap_or_else(OrderId::generate);

    let order = Order::new(id, Status::created(state.actor(&headers)), request.pizzas)?;
    let created = state.repository.create(&order).await?;
    order_response(StatusCode::CREATED, &created, true)
}

/// PUT /v1/orders/{orderId}
///
/// `If-None-Match: *` creates the order, `If-Match: <etag>` replaces its
/// pizzas.
pub async fn put_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_order_id(&order_id)?;
    let intent = ConditionalHeaders::from_headers(&headers)?.write_intent()?;
    let request = decode_order_request(&read_body(body)?)?;

    match &request.order_id {
        Some(body_id) if body_id != &id => {
            return Err(JsonError::new(format!(
                "Order id '{}' does not match the order id '{}' in the path.",
                body_id, id
            ))
            .at_property("orderId")
            .into());
        }
        _ => {}
    }

    match intent {
        WriteIntent::Create => {
            let order = Order::new(id, Status::created(state.actor(&headers)), request.pizzas)?;
            let created = state.repository.create(&order).await?;
            order_response(StatusCode::CREATED, &created, true)
        }
        WriteIntent::Update(etag) => {
            let updated = state
                .repository
                .replace_pizzas(&id, &request.pizzas, &etag)
                .await?;
            order_response(StatusCode::OK, &updated, false)
        }
    }
}

/// DELETE /v1/orders/{orderId}
///
/// Cancels the order. Only its status changes.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let id = parse_order_id(&order_id)?;
    let etag = ConditionalHeaders::from_headers(&headers)?.if_match()?;

    let cancelled = state
        .repository
        .cancel(&id, &state.actor(&headers), &etag)
        .await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::ETAG, etag_header(&cancelled.etag)?)],
    )
        .into_response())
}

fn parse_order_id(raw: &str) -> Result<OrderId, ApiError> {
    OrderId::new(raw).map_err(|e| ApiError::InvalidId {
        message: e.message(),
    })
}

fn read_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::MalformedJson {
            message: rejection.body_text(),
        })
}

fn etag_header(etag: &ETag) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(etag.as_str())
        .map_err(|e| ApiError::Internal(format!("ETag is not a valid header value: {}", e)))
}

/// `/v1/orders/<id>` with the id percent-encoded as a path segment
pub fn order_location(id: &OrderId) -> Result<String, ApiError> {
    let mut url = Url::parse("http://localhost")
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::Internal("base URL cannot hold a path".to_string()))?
        .pop_if_empty()
        .extend(["v1", "orders", id.as_str()]);
    Ok(url.path().to_string())
}

fn order_response(
    status: StatusCode,
    order: &VersionedOrder,
    with_location: bool,
) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ETAG, etag_header(&order.etag)?);
    if with_location {
        let location = order_location(order.order.id())?;
        headers.insert(
            header::LOCATION,
            HeaderValue::from_str(&location).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }

    Ok((status, headers, Json(encode_versioned(order))).into_response())
}
