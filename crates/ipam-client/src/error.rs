//! Errors reported by the inventory facade.

use ipam_common::{EntityKind, IpamError, Operation};
use thiserror::Error;

/// Result type for facade operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure reported by an [`InventoryClient`](crate::InventoryClient) call.
///
/// The detail text is opaque to the engine and surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport, authentication or remote-side validation failure.
    #[error("{0}")]
    Failed(String),
}

impl RemoteError {
    /// Creates a not found error.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound(detail.into())
    }

    /// Creates a generic failure.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed(detail.into())
    }

    /// Returns the remote detail text.
    pub fn detail(&self) -> &str {
        match self {
            RemoteError::NotFound(detail) | RemoteError::Failed(detail) => detail,
        }
    }

    /// Attaches entity kind, operation and lookup key, producing an engine error.
    pub fn into_ipam(self, kind: EntityKind, operation: Operation, key: impl ToString) -> IpamError {
        match self {
            RemoteError::NotFound(detail) => IpamError::not_found(kind, key, detail),
            RemoteError::Failed(detail) => IpamError::remote(kind, operation, detail),
        }
    }
}
