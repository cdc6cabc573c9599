//! Error types for resource translation and lifecycle operations.

use std::path::PathBuf;

use miette::Diagnostic;
use signalform_client::ApiResponse;
use thiserror::Error;

/// Result type alias using the provider error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating, translating or applying resources.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Transport, URL or decoding failure in the API client.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] signalform_client::Error),

    /// The API answered with an unexpected status.
    #[error("SignalFx API returned {status} for {url}: {body}")]
    #[diagnostic(code(signalform::api_error))]
    Api {
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// A configuration value failed validation.
    #[error("Invalid value for `{field}`: {message}")]
    #[diagnostic(code(signalform::validation))]
    Validation {
        /// Attribute path
        field: String,
        /// What was wrong
        message: String,
    },

    /// A compact notification string could not be parsed.
    #[error("Invalid notification '{value}': {message}")]
    #[diagnostic(
        code(signalform::invalid_notification),
        help("Use the form Type,field,... e.g. \"Email,oncall@example.com\" or \"Slack,CREDID,alerts\"")
    )]
    InvalidNotification {
        /// The raw string
        value: String,
        /// What was wrong
        message: String,
    },

    /// No resource is registered under this type name.
    #[error("Unknown resource type: {type_name}")]
    #[diagnostic(code(signalform::unknown_resource_type))]
    UnknownResourceType {
        /// Requested type name
        type_name: String,
    },

    /// An operation that needs a tracked ID was called without one.
    #[error("{type_name} has no ID; create or import it first")]
    #[diagnostic(code(signalform::missing_id))]
    MissingId {
        /// Resource type name
        type_name: &'static str,
    },

    /// The API response lacked a field the lifecycle relies on.
    #[error("Unexpected API response: {message}")]
    #[diagnostic(code(signalform::unexpected_response))]
    UnexpectedResponse {
        /// What was missing or malformed
        message: String,
    },

    /// Provider configuration could not be assembled.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(signalform::config),
        help("Set SFX_AUTH_TOKEN or add auth_token to ~/.signalfx.conf")
    )]
    Config {
        /// What was wrong
        message: String,
        /// Config file involved, if any
        path: Option<PathBuf>,
    },

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(signalform::serialization))]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(signalform::io))]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a notification parse error.
    pub fn notification(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNotification {
            value: value.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Wraps a non-success API response.
    #[must_use]
    pub fn api(response: &ApiResponse) -> Self {
        Self::Api {
            url: response.url.clone(),
            status: response.status.as_u16(),
            body: response.text(),
        }
    }

    /// Creates an unexpected-response error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }
}
