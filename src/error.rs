//! Configuration error types for the GraphQL transport client.
//!
//! This module contains the error type returned while building client and
//! subscription configuration. Errors raised while executing operations live
//! in [`crate::clients`].
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use gql_transport::{ConfigError, EndpointUrl};
//!
//! let result = EndpointUrl::new("not a url");
//! assert!(matches!(result, Err(ConfigError::InvalidEndpointUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while configuring a client.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The endpoint URL could not be parsed or has no host.
    #[error("Invalid endpoint URL '{url}'. Please provide an absolute URL with scheme and host (e.g., 'https://api.example.com/graphql').")]
    InvalidEndpointUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// The endpoint URL uses a scheme the client cannot speak.
    #[error("Unsupported scheme in endpoint URL '{url}'. Expected one of: {expected}.")]
    UnsupportedScheme {
        /// The URL that was provided.
        url: String,
        /// The schemes accepted in this position.
        expected: &'static str,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A static header has an invalid name or value.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// The header name that was provided.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// The retry policy is inconsistent.
    #[error("Invalid retry policy: {reason}")]
    InvalidRetryPolicy {
        /// Why the policy was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_endpoint_url_error_message() {
        let error = ConfigError::InvalidEndpointUrl {
            url: "bad url!".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("bad url!"));
        assert!(message.contains("absolute URL"));
    }

    #[test]
    fn test_unsupported_scheme_lists_expected_schemes() {
        let error = ConfigError::UnsupportedScheme {
            url: "ftp://example.com".to_string(),
            expected: "http, https",
        };
        let message = error.to_string();
        assert!(message.contains("ftp://example.com"));
        assert!(message.contains("http, https"));
    }

    #[test]
    fn test_missing_required_field_error_message() {
        let error = ConfigError::MissingRequiredField { field: "endpoint" };
        let message = error.to_string();
        assert!(message.contains("endpoint"));
        assert!(message.contains("must be set"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::InvalidRetryPolicy {
            reason: "max_attempts must be at least 1".to_string(),
        };
        let _: &dyn std::error::Error = &error;
    }
}
