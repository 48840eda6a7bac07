//! Result and error types for storefront-e2e.

use regex::RegexBuilder;
use std::time::Duration;
use thiserror::Error;

/// Result type for storefront-e2e operations
pub type StoreResult<T> = Result<T, StoreError>;

/// How a failed interaction should be treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Structural failure caused by a re-render; re-locate and try again
    Retryable,
    /// Anything else; propagate immediately
    Fatal,
}

/// Errors that can occur while driving the storefront
#[derive(Debug, Error)]
pub enum StoreError {
    /// Text read from the page did not match the expected pattern
    #[error("Could not parse {what} from {text:?}")]
    Parse {
        /// What was being parsed (money, quantity, found label, ...)
        what: String,
        /// Raw text as read from the page
        text: String,
    },

    /// A poll or wait deadline elapsed
    #[error("Timed out after {}ms waiting for {what}; last observed: {last_observed}", elapsed.as_millis())]
    Timeout {
        /// Condition that was awaited
        what: String,
        /// Last value seen before the deadline
        last_observed: String,
        /// Time spent waiting
        elapsed: Duration,
    },

    /// A locator matched zero or several elements where exactly one was required
    #[error("Element not found: {target} (matched {matched})")]
    ElementNotFound {
        /// Logical target or selector description
        target: String,
        /// Number of elements actually matched
        matched: usize,
    },

    /// Element handle no longer attached to the document
    #[error("Element is not attached to the DOM: {target}")]
    StaleElement {
        /// Handle or target description
        target: String,
    },

    /// Execution context was torn down mid-action (navigation, reload)
    #[error("Execution context was destroyed: {message}")]
    ContextDestroyed {
        /// Driver message
        message: String,
    },

    /// Another element intercepted the pointer event
    #[error("Click on {target} intercepted: {message}")]
    Intercepted {
        /// Handle or target description
        target: String,
        /// Driver message
        message: String,
    },

    /// Retry budget exhausted on structural failures
    #[error("Interaction with {target} failed after {attempts} attempt(s): {last}")]
    Interaction {
        /// Logical target
        target: String,
        /// Attempts made
        attempts: u32,
        /// Last retryable failure
        last: Box<StoreError>,
    },

    /// Final state did not match the expectation
    #[error("Assertion failed: {message}")]
    Assertion {
        /// Error message including expected and actual
        message: String,
    },

    /// Driver-level failure that is not structural
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl StoreError {
    /// Create a parse error
    #[must_use]
    pub fn parse(what: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            text: text.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(target: impl Into<String>, matched: usize) -> Self {
        Self::ElementNotFound {
            target: target.into(),
            matched,
        }
    }

    /// Map a raw browser error message onto the taxonomy.
    ///
    /// Detached nodes, torn-down execution contexts and intercepted pointer
    /// events become their structural variants; anything else is a
    /// [`StoreError::Driver`].
    #[must_use]
    pub fn from_driver_message(target: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let has = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_or(false, |re| re.is_match(&message))
        };
        if has(r"execution context was destroyed|cannot find context with specified id") {
            Self::ContextDestroyed { message }
        } else if has(r"detached|not attached|could not find node|no node with given id|node is not an element") {
            Self::StaleElement {
                target: target.to_string(),
            }
        } else if has(r"intercepts pointer events|intercepted") {
            Self::Intercepted {
                target: target.to_string(),
                message,
            }
        } else {
            Self::Driver { message }
        }
    }

    /// Classify this error for the retry policy
    #[must_use]
    pub const fn failure_class(&self) -> FailureClass {
        match self {
            Self::StaleElement { .. } | Self::ContextDestroyed { .. } | Self::Intercepted { .. } => {
                FailureClass::Retryable
            }
            _ => FailureClass::Fatal,
        }
    }

    /// Whether a poll may swallow this error and read again
    ///
    /// Structural failures plus "not there yet" conditions: a label that has
    /// not rendered, text that does not parse yet.
    #[must_use]
    pub const fn is_transient_read(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::ElementNotFound { .. }
                | Self::StaleElement { .. }
                | Self::ContextDestroyed { .. }
                | Self::Intercepted { .. }
        )
    }
}
