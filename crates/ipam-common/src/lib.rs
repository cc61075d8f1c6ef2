//! Common infrastructure for the address-space reconciliation engine.
//!
//! This crate provides the pieces every reconciler shares:
//!
//! - [`cidr`]: prefix-length/mask conversion, network validation, gateway convention
//! - [`fingerprint`]: synthetic identity for list results
//! - [`Reconciler`]: the set/read/delete/list contract, one implementation per entity kind
//! - [`error`]: error types for local validation and remote failures
//! - [`config`]: reconciler settings loaded from YAML or the environment
//!
//! # Architecture
//!
//! Reconcilers follow this pattern:
//!
//! 1. Validate desired attributes locally (prefix lengths, networks)
//! 2. Issue sequential calls against the inventory facade
//! 3. Derive the values the remote service does not compute (masks, gateways)
//! 4. Return normalized state keyed by the remote id
//!
//! # Example
//!
//! ```
//! use ipam_common::cidr::{derive_gateway, mask_bits_to_dotted_mask};
//!
//! assert_eq!(mask_bits_to_dotted_mask(24).unwrap(), "255.255.255.0");
//! assert_eq!(derive_gateway("10.1.0.0").unwrap(), "10.1.0.1");
//! ```

pub mod cidr;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod kind;
pub mod reconciler;

// Re-export commonly used items at crate root
pub use config::ReconcileConfig;
pub use error::{IpamError, IpamResult};
pub use fingerprint::{fingerprint, fingerprint_with, FingerprintOrder};
pub use kind::{EntityKind, Operation, RemoteId};
pub use reconciler::{Collection, Identified, Reconciler};
