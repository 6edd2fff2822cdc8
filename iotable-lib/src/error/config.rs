//! Configuration error types

/// Errors raised while validating or loading grid options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Server mode was configured without an endpoint.
    #[error("Url setting must be a non-empty string in server mode")]
    MissingUrl,

    /// The endpoint could not be parsed.
    #[error("Invalid url '{url}': {reason}")]
    InvalidUrl {
        /// The rejected url.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Page size is neither positive nor the ALL marker (-1).
    #[error("Invalid page size {0}; expected a positive number or -1")]
    InvalidPageSize(i64),

    /// Server mode was started outside a Tokio runtime.
    #[error("Server mode requires a running Tokio runtime")]
    NoRuntime,

    /// Options file could not be parsed.
    #[error("Options parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Options file could not be read.
    #[error("Options read error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a new invalid url error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
