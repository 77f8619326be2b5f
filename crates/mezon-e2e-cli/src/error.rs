//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("Suite failed: {message}")]
    SuiteFailed {
        /// Run summary
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error(transparent)]
    E2e(#[from] mezon_e2e::E2eError),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a suite failure
    #[must_use]
    pub fn suite_failed(message: impl Into<String>) -> Self {
        Self::SuiteFailed {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("no accounts file");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("no accounts file"));
    }

    #[test]
    fn test_suite_failed_error() {
        let err = CliError::suite_failed("2 failed");
        assert_eq!(err.to_string(), "Suite failed: 2 failed");
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("unknown feature");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_library_error_is_transparent() {
        let err: CliError = mezon_e2e::E2eError::config("E2E_WORKERS: expected a number").into();
        assert!(err.to_string().contains("E2E_WORKERS"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }
}
