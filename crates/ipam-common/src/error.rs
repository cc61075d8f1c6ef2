//! Error types for address-space operations.
//!
//! Every reconciler operation returns [`IpamResult`]. Local validation
//! failures (`InvalidPrefixLength`, `InvalidNetwork`, `InvalidIdentity`) are
//! raised before any remote call; the remaining variants carry enough context
//! to name the entity kind, the attempted operation and the remote detail.

use thiserror::Error;

use crate::kind::{EntityKind, Operation, RemoteId};

/// Result type alias for address-space operations.
pub type IpamResult<T> = Result<T, IpamError>;

/// Errors that can occur while deriving or reconciling address-space state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpamError {
    /// Prefix length outside 0-32.
    #[error("Invalid prefix length {prefix_len}: must be between 0 and 32")]
    InvalidPrefixLength {
        /// The rejected prefix length.
        prefix_len: i64,
    },

    /// Network or address string is not a valid IPv4 network/prefix pair.
    #[error("Invalid network '{network}': {reason}")]
    InvalidNetwork {
        /// The rejected input.
        network: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Resource handle text is not a positive decimal id.
    #[error("Invalid remote identity '{value}'")]
    InvalidIdentity {
        /// The rejected handle text.
        value: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A facade operation failed (transport, authentication or remote validation).
    #[error("Remote {operation} of {kind} failed: {detail}")]
    RemoteCallFailed {
        /// Entity kind being reconciled.
        kind: EntityKind,
        /// The facade operation that failed.
        operation: Operation,
        /// Remote error detail, verbatim.
        detail: String,
    },

    /// The remote service reports the entity does not exist.
    #[error("{kind} '{key}' not found: {detail}")]
    NotFound {
        /// Entity kind being looked up.
        kind: EntityKind,
        /// Id or name used for the lookup.
        key: String,
        /// Remote error detail, verbatim.
        detail: String,
    },

    /// Allocation succeeded remotely but the follow-up persist step failed.
    ///
    /// The reservation is left in place on the remote service.
    #[error(
        "Partial allocation of {kind} {allocation} (id {}): allocated but not persisted: {detail}",
        display_id(.allocated_id)
    )]
    PartialAllocation {
        /// Entity kind being allocated.
        kind: EntityKind,
        /// Remote id of the reservation, if the service assigned one.
        allocated_id: Option<RemoteId>,
        /// The allocated network or address.
        allocation: String,
        /// Why the persist step failed.
        detail: String,
    },
}

fn display_id(id: &Option<RemoteId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "unassigned".to_string(),
    }
}

impl IpamError {
    /// Creates an invalid prefix length error.
    pub fn invalid_prefix_length(prefix_len: impl Into<i64>) -> Self {
        Self::InvalidPrefixLength {
            prefix_len: prefix_len.into(),
        }
    }

    /// Creates an invalid network error.
    pub fn invalid_network(network: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNetwork {
            network: network.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a remote call failure.
    pub fn remote(kind: EntityKind, operation: Operation, detail: impl Into<String>) -> Self {
        Self::RemoteCallFailed {
            kind,
            operation,
            detail: detail.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(kind: EntityKind, key: impl ToString, detail: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
            detail: detail.into(),
        }
    }

    /// Returns true if the remote service reported the entity as absent.
    ///
    /// Callers deleting a resource may treat this as already-deleted.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IpamError::NotFound { .. })
    }

    /// Returns true if this error was raised before any remote call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            IpamError::InvalidPrefixLength { .. }
                | IpamError::InvalidNetwork { .. }
                | IpamError::InvalidIdentity { .. }
                | IpamError::InvalidConfig { .. }
        )
    }
}
