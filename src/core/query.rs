//! Query parameters of the order listing

use serde::Deserialize;

use crate::ordering::ContinuationToken;

/// Query parameters for client-driven pagination
///
/// # Example
/// ```text
/// GET /v1/orders
/// GET /v1/orders?continuationToken=%7B%22offset%22%3A100%7D
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ListParams {
    /// Token returned in the previous page's `nextLink`
    pub continuation_token: Option<String>,
}

impl ListParams {
    /// The continuation token, treating an empty value as absent
    pub fn continuation(&self) -> Option<ContinuationToken> {
        self.continuation_token
            .as_deref()
            .and_then(|s| ContinuationToken::new(s))
    }
}

/// Relative link to the page that starts at `token`
pub fn next_link(base: &str, token: &ContinuationToken) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_str().as_bytes()).collect();
    format!("{}?continuationToken={}", base, encoded)
}
