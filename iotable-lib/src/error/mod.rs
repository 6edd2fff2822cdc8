//! Error types

mod config;
mod transport;

pub use config::*;
pub use transport::*;

/// Top-level error for grid construction and commands.
///
/// Most structurally disallowed operations (selecting without an identifier
/// column, appending a duplicate, removing an unknown id) are silent no-ops
/// and never produce an error. Only misconfiguration and failed seeds are
/// fatal, and transport failures are reported to the host without stopping
/// the grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// Invalid grid configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Remote data retrieval failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A column id was looked up that is not registered.
    #[error("Column '{id}' not found")]
    ColumnNotFound {
        /// The missing column id.
        id: String,
    },

    /// The seed column/row set is malformed.
    #[error("Invalid seed: {0}")]
    Seed(String),
}

impl GridError {
    /// Creates a new column-not-found error.
    pub fn column_not_found(id: impl Into<String>) -> Self {
        Self::ColumnNotFound { id: id.into() }
    }
}
