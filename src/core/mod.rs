//! Core building blocks: JSON validation, conditional headers, errors

pub mod conditional;
pub mod error;
pub mod json;
pub mod query;

pub use conditional::{ConditionalHeaders, HeaderError, WriteIntent};
pub use error::{ApiError, ConfigError, ErrorResponse};
pub use json::{JsonError, JsonResult};
pub use query::ListParams;
