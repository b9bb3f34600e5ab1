//! Federation error types.
//!
//! ## NIST 800-53 Rev5: SI-11 (Error Handling)
//!
//! Directory failures keep their original cause as the error source so the
//! host can log the full chain, while the display message stays generic.

use thiserror::Error;

/// Boxed cause of a directory failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during federation operations.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The external directory could not serve a data operation.
    ///
    /// Covers transport failures, permission denials and rejected
    /// application credentials. Never retried by the federation layer.
    #[error("Directory access failed during {operation}")]
    DirectoryAccess {
        /// Operation that was being performed.
        operation: String,
        /// Original failure reported by the directory client.
        #[source]
        source: BoxError,
    },

    /// Provider is read-only.
    #[error("Provider is read-only: cannot {0}")]
    ReadOnly(String),

    /// The directory reported a cyclic group hierarchy.
    #[error("Cyclic group hierarchy detected at group '{group}'")]
    HierarchyCycle {
        /// Group at which the cycle closed.
        group: String,
    },
}

impl FederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wraps a directory failure.
    #[must_use]
    pub fn directory_access(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::DirectoryAccess {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Creates a read-only error.
    #[must_use]
    pub fn read_only(operation: impl Into<String>) -> Self {
        Self::ReadOnly(operation.into())
    }

    /// Checks if this is a read-only violation.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly(_))
    }

    /// Checks if this is a directory access error.
    #[must_use]
    pub const fn is_directory_access(&self) -> bool {
        matches!(self, Self::DirectoryAccess { .. })
    }

    /// Checks if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;
