//! Configuration loading and management
//!
//! Configuration is read from YAML and then overridden by `PIZZA_*`
//! environment variables:
//!
//! ```yaml
//! server:
//!   bind_addr: "0.0.0.0:8080"
//!   cors_allowed_origins: ["https://portal.example.com"]
//!   default_actor: "portal"
//! store: cosmos
//! cosmos:
//!   connection_string: "AccountEndpoint=https://acct.documents.azure.com:443/;AccountKey=...;"
//!   database: pizza
//!   container: orders
//!   request_timeout_secs: 30
//!   page_size: 100
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::ConfigError;

pub const ENV_BIND_ADDR: &str = "PIZZA_BIND_ADDR";
pub const ENV_STORE: &str = "PIZZA_STORE";
pub const ENV_COSMOS_CONNECTION_STRING: &str = "PIZZA_COSMOS_CONNECTION_STRING";
pub const ENV_COSMOS_ENDPOINT: &str = "PIZZA_COSMOS_ENDPOINT";
pub const ENV_COSMOS_KEY: &str = "PIZZA_COSMOS_KEY";
pub const ENV_COSMOS_DATABASE: &str = "PIZZA_COSMOS_DATABASE";
pub const ENV_COSMOS_CONTAINER: &str = "PIZZA_COSMOS_CONTAINER";

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "127.0.0.1:8080")
    pub bind_addr: String,

    /// Origins allowed by CORS; empty disables CORS headers
    pub cors_allowed_origins: Vec<String>,

    /// Actor recorded on status changes when the request names none
    pub default_actor: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            cors_allowed_origins: Vec::new(),
            default_actor: "anonymous".to_string(),
        }
    }
}

/// Which document store backs the API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// In-process emulator; data is lost on restart
    #[default]
    InMemory,
    /// Azure Cosmos DB over its REST API
    Cosmos,
}

impl std::str::FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(StoreKind::InMemory),
            "cosmos" => Ok(StoreKind::Cosmos),
            other => Err(ConfigError::InvalidValue {
                field: "store".to_string(),
                value: other.to_string(),
                message: "expected 'in-memory' or 'cosmos'".to_string(),
            }),
        }
    }
}

/// Cosmos DB account and container settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CosmosConfig {
    /// `AccountEndpoint=...;AccountKey=...;`, takes precedence over endpoint + key
    pub connection_string: Option<String>,
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub database: String,
    pub container: String,
    pub request_timeout_secs: u64,
    /// Maximum documents per listing page; the store decides when unset
    pub page_size: Option<u32>,
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            endpoint: None,
            key: None,
            database: "pizza".to_string(),
            container: "orders".to_string(),
            request_timeout_secs: 30,
            page_size: None,
        }
    }
}

/// Resolved account credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosmosAccount {
    pub endpoint: String,
    pub key: String,
}

impl CosmosConfig {
    /// Resolve the account from the connection string, or endpoint + key
    pub fn account(&self) -> Result<CosmosAccount, ConfigError> {
        if let Some(connection_string) = &self.connection_string {
            return parse_connection_string(connection_string);
        }

        match (&self.endpoint, &self.key) {
            (Some(endpoint), Some(key)) => Ok(CosmosAccount {
                endpoint: endpoint.clone(),
                key: key.clone(),
            }),
            (None, _) => Err(ConfigError::MissingField {
                field: "endpoint".to_string(),
                context: "cosmos (or set connection_string)".to_string(),
            }),
            (_, None) => Err(ConfigError::MissingField {
                field: "key".to_string(),
                context: "cosmos (or set connection_string)".to_string(),
            }),
        }
    }
}

/// Parse `AccountEndpoint=...;AccountKey=...;`
///
/// Keys are case-insensitive; unknown keys are ignored. Values may contain
/// `=` (base64 padding).
pub fn parse_connection_string(value: &str) -> Result<CosmosAccount, ConfigError> {
    let mut endpoint = None;
    let mut key = None;

    for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((name, val)) = part.split_once('=') else {
            return Err(ConfigError::InvalidValue {
                field: "cosmos.connection_string".to_string(),
                value: "<redacted>".to_string(),
                message: format!("segment '{}' is not of the form Key=Value", name_only(part)),
            });
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "accountendpoint" => endpoint = Some(val.trim().to_string()),
            "accountkey" => key = Some(val.trim().to_string()),
            _ => {}
        }
    }

    let missing = |field: &str| ConfigError::MissingField {
        field: field.to_string(),
        context: "cosmos.connection_string".to_string(),
    };
    Ok(CosmosAccount {
        endpoint: endpoint.ok_or_else(|| missing("AccountEndpoint"))?,
        key: key.ok_or_else(|| missing("AccountKey"))?,
    })
}

fn name_only(segment: &str) -> &str {
    segment.split('=').next().unwrap_or(segment)
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreKind,
    pub cosmos: CosmosConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ConfigError::IoError {
                message: e.to_string(),
            },
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        Ok(self.with_overrides(|name| std::env::var(name).ok())?)
    }

    /// Apply `PIZZA_*` overrides read through `lookup`
    ///
    /// Empty values are ignored.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(store) = get(ENV_STORE) {
            self.store = store.parse()?;
        }
        if let Some(cs) = get(ENV_COSMOS_CONNECTION_STRING) {
            self.cosmos.connection_string = Some(cs);
        }
        if let Some(endpoint) = get(ENV_COSMOS_ENDPOINT) {
            self.cosmos.endpoint = Some(endpoint);
        }
        if let Some(key) = get(ENV_COSMOS_KEY) {
            self.cosmos.key = Some(key);
        }
        if let Some(database) = get(ENV_COSMOS_DATABASE) {
            self.cosmos.database = database;
        }
        if let Some(container) = get(ENV_COSMOS_CONTAINER) {
            self.cosmos.container = container;
        }

        Ok(self)
    }

    /// Defaults or `path`, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }
}
