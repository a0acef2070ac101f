//! Master-key request signing for the Cosmos DB REST API

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::core::error::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Decoded account key
#[derive(Clone)]
pub struct MasterKey(Vec<u8>);

impl MasterKey {
    /// Decode a base64 account key
    pub fn from_base64(key: &str) -> Result<Self, ConfigError> {
        STANDARD
            .decode(key.trim())
            .map(Self)
            .map_err(|e| ConfigError::InvalidValue {
                field: "cosmos.key".to_string(),
                value: "<redacted>".to_string(),
                message: format!("account key is not valid base64: {}", e),
            })
    }

    /// Build the `authorization` header value for one request
    ///
    /// `resource_link` is the resource path without leading or trailing
    /// slashes, e.g. `dbs/orders/colls/orders` for a document feed or
    /// `dbs/orders/colls/orders/docs/<id>` for a single document.
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> String {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let signature = match HmacSha256::new_from_slice(&self.0) {
            Ok(mut mac) => {
                mac.update(payload.as_bytes());
                STANDARD.encode(mac.finalize().into_bytes())
            }
            // HMAC accepts keys of any length
            Err(_) => String::new(),
        };

        let token = format!("type=master&ver=1.0&sig={}", signature);
        url::form_urlencoded::byte_serialize(token.as_bytes()).collect()
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// `x-ms-date` value, RFC 1123 in GMT
pub fn rfc1123(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
