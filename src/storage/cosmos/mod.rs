//! Cosmos DB REST transport
//!
//! Speaks the document endpoints of the Cosmos DB REST API directly over
//! `reqwest`, signing every request with the account master key.

pub mod auth;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use super::transport::{
    CosmosTransport, DocumentRequest, DocumentResponse, Precondition, TransportError,
};
use crate::config::CosmosConfig;
use crate::core::error::ConfigError;
use crate::ordering::{ContinuationToken, ETag};

pub use auth::{MasterKey, rfc1123};

const API_VERSION: &str = "2018-12-31";
const RESOURCE_TYPE: &str = "docs";

/// [`CosmosTransport`] over HTTPS
#[derive(Debug, Clone)]
pub struct HttpCosmosTransport {
    client: Client,
    endpoint: Url,
    key: MasterKey,
    database: String,
    container: String,
}

impl HttpCosmosTransport {
    pub fn new(
        endpoint: &str,
        key: MasterKey,
        database: impl Into<String>,
        container: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            field: "cosmos.endpoint".to_string(),
            value: endpoint.to_string(),
            message: e.to_string(),
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "cosmos.endpoint".to_string(),
                value: endpoint.to_string(),
                message: "endpoint must be an http(s) URL".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::IoError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            key,
            database: database.into(),
            container: container.into(),
        })
    }

    /// Build a transport from the `cosmos` configuration section
    pub fn from_config(config: &CosmosConfig) -> Result<Self, ConfigError> {
        let account = config.account()?;
        Self::new(
            &account.endpoint,
            MasterKey::from_base64(&account.key)?,
            &config.database,
            &config.container,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn collection_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database, self.container)
    }

    fn url(&self, resource_link: &str) -> Result<Url, TransportError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Connection("endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(resource_link.split('/'));
        Ok(url)
    }

    /// Start a signed request against `resource_link`
    ///
    /// Feed operations (create, query) are signed with the collection link;
    /// item operations with the document link.
    fn request(
        &self,
        method: Method,
        path: &str,
        signed_link: &str,
    ) -> Result<RequestBuilder, TransportError> {
        let date = rfc1123(Utc::now());
        let authorization = self
            .key
            .authorization(method.as_str(), RESOURCE_TYPE, signed_link, &date);

        Ok(self
            .client
            .request(method, self.url(path)?)
            .header("authorization", authorization)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .header("accept", "application/json"))
    }

    fn build(&self, request: DocumentRequest) -> Result<RequestBuilder, TransportError> {
        let collection = self.collection_link();
        let feed = format!("{}/docs", collection);

        match request {
            DocumentRequest::Create {
                partition_key,
                document,
                precondition,
            } => {
                let builder = self
                    .request(Method::POST, &feed, &collection)?
                    .header("x-ms-documentdb-partitionkey", partition_key_header(&partition_key))
                    .json(&document);
                Ok(with_precondition(builder, &precondition))
            }
            DocumentRequest::Patch {
                id,
                partition_key,
                operations,
                precondition,
            } => {
                let link = format!("{}/{}", feed, id);
                let body = serde_json::to_vec(&json!({ "operations": operations }))
                    .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
                let builder = self
                    .request(Method::PATCH, &link, &link)?
                    .header("x-ms-documentdb-partitionkey", partition_key_header(&partition_key))
                    .header("content-type", "application/json_patch+json")
                    .body(body);
                Ok(with_precondition(builder, &precondition))
            }
            DocumentRequest::Query {
                query,
                partition_key,
                continuation,
                max_item_count,
            } => {
                let body = serde_json::to_vec(&query)
                    .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
                let mut builder = self
                    .request(Method::POST, &feed, &collection)?
                    .header("content-type", "application/query+json")
                    .header("x-ms-documentdb-isquery", "True")
                    .body(body);

                builder = match partition_key {
                    Some(pk) => {
                        builder.header("x-ms-documentdb-partitionkey", partition_key_header(&pk))
                    }
                    None => builder.header("x-ms-documentdb-query-enablecrosspartition", "True"),
                };
                if let Some(token) = continuation {
                    builder = builder.header("x-ms-continuation", token.as_str());
                }
                if let Some(count) = max_item_count {
                    builder = builder.header("x-ms-max-item-count", count.to_string());
                }
                Ok(builder)
            }
        }
    }
}

#[async_trait]
impl CosmosTransport for HttpCosmosTransport {
    async fn execute(&self, request: DocumentRequest) -> Result<DocumentResponse, TransportError> {
        let builder = self.build(request)?;

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let etag = header(&response, "etag").and_then(|s| ETag::new(s));
        let continuation =
            header(&response, "x-ms-continuation").and_then(|s| ContinuationToken::new(s));

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| TransportError::InvalidResponse(e.to_string()))?
        };

        Ok(DocumentResponse::new(status, body)
            .with_etag(etag)
            .with_continuation(continuation))
    }
}

fn partition_key_header(partition_key: &str) -> String {
    json!([partition_key]).to_string()
}

fn with_precondition(builder: RequestBuilder, precondition: &Precondition) -> RequestBuilder {
    match precondition {
        Precondition::IfMatch(etag) => builder.header("if-match", etag.as_str()),
        Precondition::IfNoneMatchAny => builder.header("if-none-match", "*"),
    }
}

fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
