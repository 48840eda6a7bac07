//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// One or more scenarios failed
    #[error("{failed} of {total} scenario(s) failed")]
    ScenariosFailed {
        /// Failing scenarios
        failed: usize,
        /// Scenarios run
        total: usize,
    },

    /// Real-browser run requested from a build without browser support
    #[error("Browser support not enabled. Rebuild with --features browser, or pass --fake")]
    BrowserUnavailable,

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Suite library error
    #[error("{0}")]
    Store(#[from] storefront_e2e::StoreError),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl CliError {
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
    fn test_invalid_argument() {
        let err = CliError::invalid_argument("unknown scenario \"checkout\"");
        assert!(err.to_string().contains("checkout"));
    }

    #[test]
    fn test_scenarios_failed_message() {
        let err = CliError::ScenariosFailed {
            failed: 2,
            total: 8,
        };
        assert_eq!(err.to_string(), "2 of 8 scenario(s) failed");
    }

    #[test]
    fn test_store_error_passes_through() {
        let err: CliError = storefront_e2e::StoreError::assertion("subtotal off by $ 0.01").into();
        assert!(err.to_string().contains("subtotal off"));
    }

    #[test]
    fn test_browser_unavailable_names_feature() {
        assert!(CliError::BrowserUnavailable
            .to_string()
            .contains("--features browser"));
    }
}
