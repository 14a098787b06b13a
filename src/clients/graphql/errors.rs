//! Structured GraphQL error types.
//!
//! A reachable server that answers with HTTP 2xx may still reject an
//! operation by returning an `errors` array in the response body. Those
//! errors are surfaced as a [`GqlErrorList`], never folded into transport
//! errors, so callers can tell "the server said no" apart from "the server
//! could not be reached".
//!
//! [`ErrorResponse`] is the tagged projection of a failed call into either a
//! network (status) error or a GraphQL error list.
//!
//! # Example
//!
//! ```rust
//! use gql_transport::clients::graphql::GqlErrorList;
//!
//! let body = br#"{"errors":[{"message":"not authorized","path":["viewer"]}]}"#;
//! let list: GqlErrorList = serde_json::from_slice(body).unwrap();
//!
//! assert_eq!(list.len(), 1);
//! assert_eq!(list.errors[0].message, "not authorized");
//! assert_eq!(list.to_string(), "viewer: not authorized");
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::clients::errors::HttpStatusError;

/// Location of an error within the query document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GqlErrorLocation {
    /// Line number in the query (1-based).
    pub line: u32,
    /// Column number in the query (1-based).
    pub column: u32,
}

/// A single segment of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GqlPathSegment {
    /// Field name.
    Key(String),
    /// List index.
    Index(i64),
}

impl fmt::Display for GqlPathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A structured GraphQL error (message, locations, path, extensions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GqlError {
    /// Human-readable error message.
    pub message: String,
    /// Location(s) within the query.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub locations: Vec<GqlErrorLocation>,
    /// Path within the response where the error occurred.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub path: Vec<GqlPathSegment>,
    /// Extensions metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

// Servers send `null` for absent locations and paths as often as they omit them.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl fmt::Display for GqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(ToString::to_string).collect();
            write!(f, "{}: ", path.join("."))?;
        }
        f.write_str(&self.message)
    }
}

/// The standard GraphQL error response: an ordered list of errors.
///
/// Deserializes from a full response body (`{"errors": [...], ...}`); any
/// other top-level fields, including `data`, are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GqlErrorList {
    /// The errors, in the order the server reported them.
    pub errors: Vec<GqlError>,
}

impl GqlErrorList {
    /// Creates a list from individual errors.
    #[must_use]
    pub const fn new(errors: Vec<GqlError>) -> Self {
        Self { errors }
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if the list holds no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterates over the error messages.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.message.as_str())
    }
}

impl fmt::Display for GqlErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GqlErrorList {}

/// A handled error, projected into its network or GraphQL half.
///
/// At most one half is ever populated; [`ErrorResponse::Empty`] stands for
/// "no error of either kind" (for example a build or decode failure).
///
/// The `Display` output is the JSON form
/// `{"networkErrors":{"code":..,"message":..}}` or
/// `{"graphqlErrors":[...]}` (or `{}` when empty).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ErrorResponse {
    /// Neither a status error nor GraphQL errors.
    #[default]
    Empty,
    /// The HTTP status code was not 2xx.
    Network(HttpStatusError),
    /// The status was 2xx but the server returned at least one GraphQL error.
    Graphql(GqlErrorList),
}

impl ErrorResponse {
    /// Returns `true` when at least one error is declared.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    /// Returns the status error, if any.
    #[must_use]
    pub const fn network_error(&self) -> Option<&HttpStatusError> {
        match self {
            Self::Network(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the GraphQL errors, if any.
    #[must_use]
    pub const fn graphql_errors(&self) -> Option<&GqlErrorList> {
        match self {
            Self::Graphql(list) => Some(list),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Empty => serde_json::json!({}),
            Self::Network(error) => serde_json::json!({ "networkErrors": error }),
            Self::Graphql(list) => serde_json::json!({ "graphqlErrors": list.errors }),
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
