//! Conditional request headers
//!
//! Mutating order endpoints require exactly one of `If-Match` or
//! `If-None-Match`. Only the wildcard form of `If-None-Match` is accepted,
//! which restricts it to "create if absent".
//!
//! The resolvers here are pure functions over the raw header values; each
//! slice holds one entry per occurrence of the header in the request.

use axum::http::{HeaderMap, StatusCode, header};
use std::fmt;

use crate::ordering::ETag;

pub const IF_MATCH: &str = "If-Match";
pub const IF_NONE_MATCH: &str = "If-None-Match";

/// What a conditional write asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteIntent {
    /// `If-None-Match: *`
    Create,
    /// `If-Match: <etag>`
    Update(ETag),
}

/// Why the conditional headers were rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// Neither header was sent
    Missing,
    /// `If-Match` is required but was not sent
    MissingIfMatch,
    /// Both headers were sent
    Both,
    /// A header was sent more than once
    Repeated { header: &'static str },
    /// `If-None-Match` carried something other than `*`
    NoneMatchNotWildcard { value: String },
    /// `If-Match` was sent with an empty value
    EmptyIfMatch,
    /// A header value is not visible ASCII
    Unreadable { header: &'static str },
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::Missing => write!(
                f,
                "Request must specify the {} or {} header.",
                IF_MATCH, IF_NONE_MATCH
            ),
            HeaderError::MissingIfMatch => {
                write!(f, "Request must specify the {} header.", IF_MATCH)
            }
            HeaderError::Both => write!(
                f,
                "Request cannot specify both the {} and {} headers.",
                IF_MATCH, IF_NONE_MATCH
            ),
            HeaderError::Repeated { header } => {
                write!(f, "Request must specify exactly one {} header.", header)
            }
            HeaderError::NoneMatchNotWildcard { value } => write!(
                f,
                "{} header must be '*' but was '{}'.",
                IF_NONE_MATCH, value
            ),
            HeaderError::EmptyIfMatch => {
                write!(f, "{} header cannot be empty.", IF_MATCH)
            }
            HeaderError::Unreadable { header } => {
                write!(f, "{} header contains invalid characters.", header)
            }
        }
    }
}

impl std::error::Error for HeaderError {}

impl HeaderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HeaderError::Missing => StatusCode::PRECONDITION_REQUIRED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Classify a conditional PUT
pub fn resolve_write_intent(
    if_match: &[&str],
    if_none_match: &[&str],
) -> Result<WriteIntent, HeaderError> {
    match (if_match, if_none_match) {
        ([], []) => Err(HeaderError::Missing),
        ([_, ..], [_, ..]) => Err(HeaderError::Both),
        ([], [value]) => {
            if value.trim() == "*" {
                Ok(WriteIntent::Create)
            } else {
                Err(HeaderError::NoneMatchNotWildcard {
                    value: value.to_string(),
                })
            }
        }
        ([], _) => Err(HeaderError::Repeated {
            header: IF_NONE_MATCH,
        }),
        ([value], []) => parse_etag(value).map(WriteIntent::Update),
        (_, []) => Err(HeaderError::Repeated { header: IF_MATCH }),
    }
}

/// Resolve the `If-Match` header of a request that can only update
pub fn resolve_if_match(if_match: &[&str]) -> Result<ETag, HeaderError> {
    match if_match {
        [] => Err(HeaderError::MissingIfMatch),
        [value] => parse_etag(value),
        _ => Err(HeaderError::Repeated { header: IF_MATCH }),
    }
}

fn parse_etag(value: &str) -> Result<ETag, HeaderError> {
    ETag::new(value.trim()).ok_or(HeaderError::EmptyIfMatch)
}

/// Conditional header values as sent by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_match: Vec<String>,
    pub if_none_match: Vec<String>,
}

impl ConditionalHeaders {
    /// Collect every occurrence of both headers
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, HeaderError> {
        Ok(Self {
            if_match: values(headers, header::IF_MATCH, IF_MATCH)?,
            if_none_match: values(headers, header::IF_NONE_MATCH, IF_NONE_MATCH)?,
        })
    }

    pub fn write_intent(&self) -> Result<WriteIntent, HeaderError> {
        resolve_write_intent(&as_strs(&self.if_match), &as_strs(&self.if_none_match))
    }

    pub fn if_match(&self) -> Result<ETag, HeaderError> {
        resolve_if_match(&as_strs(&self.if_match))
    }
}

fn values(
    headers: &HeaderMap,
    name: header::HeaderName,
    display: &'static str,
) -> Result<Vec<String>, HeaderError> {
    headers
        .get_all(name)
        .iter()
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| HeaderError::Unreadable { header: display })
        })
        .collect()
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
