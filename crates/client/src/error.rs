//! Error types for the SignalFx API client.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using the client error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the SignalFx API.
///
/// Non-2xx responses are not errors at this layer; they are returned to the
/// caller as an [`ApiResponse`](crate::ApiResponse) so that resources can decide
/// how to treat a 404.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The request could not be sent or the response body could not be read.
    #[error("HTTP request to {url} failed: {source}")]
    #[diagnostic(
        code(signalform::client::http),
        help("Check network connectivity and the api_url setting")
    )]
    Http {
        /// Target URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// A base URL or path could not be turned into a valid URL.
    #[error("Invalid URL '{url}': {source}")]
    #[diagnostic(code(signalform::client::invalid_url))]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },

    /// The response body was not the JSON we expected.
    #[error("Failed to decode response from {url}: {source}")]
    #[diagnostic(code(signalform::client::decode))]
    Decode {
        /// URL the body came from
        url: String,
        /// JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The request payload could not be serialized.
    #[error("Failed to encode request payload: {0}")]
    #[diagnostic(code(signalform::client::encode))]
    Encode(#[source] serde_json::Error),

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(
        code(signalform::client::build),
        help("TLS backend initialization failed; this is an environment issue")
    )]
    Build(#[source] reqwest::Error),
}
