//! Functional JSON toolkit
//!
//! Decoding untyped `serde_json::Value`s into domain types goes through
//! [`JsonResult`]. Independent validations are combined with [`zip`],
//! [`zip3`] and [`traverse`], which *accumulate* failures instead of stopping
//! at the first one: combining two failures concatenates their issues.
//!
//! ```rust,ignore
//! use pizza_orders::core::json::{self, extract};
//!
//! let object = extract::as_object(&value)?;
//! let (id, pizzas) = json::zip(
//!     extract::non_empty_string_property(object, "orderId"),
//!     extract::array_property(object, "pizzas"),
//! )?;
//! ```

pub mod extract;

use serde_json::Value;
use std::fmt;

/// Message used when more than one issue is reported at once
pub const MULTIPLE_ERRORS_MESSAGE: &str = "Multiple errors occurred.";

/// A specialized Result type for JSON decoding
pub type JsonResult<T> = Result<T, JsonError>;

/// One step in the location of a JSON value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Property(String),
    Index(usize),
}

/// A single validation failure and where it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonIssue {
    path: Vec<PathSegment>,
    message: String,
}

impl JsonIssue {
    /// Location of the offending value, e.g. `pizzas[0].size`
    ///
    /// Returns `None` for issues about the root value.
    pub fn target(&self) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }

        let mut target = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Property(name) => {
                    if !target.is_empty() {
                        target.push('.');
                    }
                    target.push_str(name);
                }
                PathSegment::Index(index) => {
                    target.push_str(&format!("[{}]", index));
                }
            }
        }
        Some(target)
    }

    /// The message without its location
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for JsonIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{}: {}", target, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Non-empty collection of validation issues
///
/// Renders as the single issue when there is exactly one, and as
/// [`MULTIPLE_ERRORS_MESSAGE`] with [`details`](JsonError::details) otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonError {
    issues: Vec<JsonIssue>,
}

impl JsonError {
    /// Create an error with a single issue at the current location
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            issues: vec![JsonIssue {
                path: Vec::new(),
                message: message.into(),
            }],
        }
    }

    /// Concatenate the issues of two errors
    pub fn combine(mut self, other: JsonError) -> Self {
        self.issues.extend(other.issues);
        self
    }

    /// Nest every issue under the given property name
    pub fn at_property(self, name: &str) -> Self {
        self.prefixed(PathSegment::Property(name.to_string()))
    }

    /// Nest every issue under the given array index
    pub fn at_index(self, index: usize) -> Self {
        self.prefixed(PathSegment::Index(index))
    }

    fn prefixed(mut self, segment: PathSegment) -> Self {
        for issue in &mut self.issues {
            issue.path.insert(0, segment.clone());
        }
        self
    }

    /// All issues in the order they were found
    pub fn issues(&self) -> &[JsonIssue] {
        &self.issues
    }

    /// Top-level message
    pub fn message(&self) -> String {
        match self.issues.as_slice() {
            [single] => single.to_string(),
            _ => MULTIPLE_ERRORS_MESSAGE.to_string(),
        }
    }

    /// Nested issues; empty when exactly one issue was reported
    pub fn details(&self) -> &[JsonIssue] {
        if self.issues.len() > 1 {
            &self.issues
        } else {
            &[]
        }
    }
}

impl fmt::Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.len() == 1 {
            return write!(f, "{}", self.issues[0]);
        }

        let msgs: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{} {}", MULTIPLE_ERRORS_MESSAGE, msgs.join("; "))
    }
}

impl std::error::Error for JsonError {}

/// Attach location information to a failed [`JsonResult`]
pub trait JsonResultExt<T> {
    fn at_property(self, name: &str) -> JsonResult<T>;
    fn at_index(self, index: usize) -> JsonResult<T>;
}

impl<T> JsonResultExt<T> for JsonResult<T> {
    fn at_property(self, name: &str) -> JsonResult<T> {
        self.map_err(|e| e.at_property(name))
    }

    fn at_index(self, index: usize) -> JsonResult<T> {
        self.map_err(|e| e.at_index(index))
    }
}

/// Combine two independent results, accumulating both failures
pub fn zip<A, B>(a: JsonResult<A>, b: JsonResult<B>) -> JsonResult<(A, B)> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(x), Err(y)) => Err(x.combine(y)),
        (Err(x), Ok(_)) | (Ok(_), Err(x)) => Err(x),
    }
}

/// Combine three independent results, accumulating every failure
pub fn zip3<A, B, C>(
    a: JsonResult<A>,
    b: JsonResult<B>,
    c: JsonResult<C>,
) -> JsonResult<(A, B, C)> {
    zip(zip(a, b), c).map(|((a, b), c)| (a, b, c))
}

/// Validate every element independently, collecting all failures
///
/// Failures are nested under the element index.
pub fn traverse<'a, T, F>(items: &'a [Value], mut f: F) -> JsonResult<Vec<T>>
where
    F: FnMut(&'a Value) -> JsonResult<T>,
{
    let mut values = Vec::with_capacity(items.len());
    let mut failure: Option<JsonError> = None;

    for (index, item) in items.iter().enumerate() {
        match f(item).at_index(index) {
            Ok(value) => values.push(value),
            Err(e) => {
                failure = Some(match failure {
                    Some(existing) => existing.combine(e),
                    None => e,
                });
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(values),
    }
}

/// JSON value kinds, used in type mismatch messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "a boolean",
            JsonKind::Number => "a number",
            JsonKind::String => "a string",
            JsonKind::Array => "an array",
            JsonKind::Object => "an object",
        };
        write!(f, "{}", name)
    }
}
