//! CLI error types, reported through miette.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific error types with diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Failed to {operation} {}", path.display())]
    #[diagnostic(
        code(signalform::cli::file_error),
        help("Check file permissions and ensure the path exists")
    )]
    FileError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid document: {message}", path.display())]
    #[diagnostic(
        code(signalform::cli::invalid_document),
        help("Expected JSON of the form {{\"type\": \"signalform_detector\", \"state\": {{...}}}}")
    )]
    InvalidDocument { path: PathBuf, message: String },

    #[error("{type_name} {id} does not exist")]
    #[diagnostic(code(signalform::cli::not_found))]
    NotFound { type_name: String, id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] signalform_provider::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(signalform::cli::output))]
    Output(#[from] serde_json::Error),

    #[error("Tracing initialization failed: {message}")]
    #[diagnostic(
        code(signalform::cli::tracing_error),
        help("Check the RUST_LOG environment variable")
    )]
    TracingError { message: String },
}

impl CliError {
    pub fn file(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileError {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn tracing(message: impl Into<String>) -> Self {
        Self::TracingError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_names_path() {
        let err = CliError::file(
            "read",
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "Failed to read /tmp/missing.json");
    }

    #[test]
    fn test_provider_errors_pass_through() {
        let err: CliError = signalform_provider::Error::validation("name", "is required").into();
        assert_eq!(err.to_string(), "Invalid value for `name`: is required");
    }
}
