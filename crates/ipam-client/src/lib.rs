//! Inventory facade contract for the address-space engine.
//!
//! This crate defines what the engine needs from the external inventory
//! service, without committing to a transport:
//!
//! - [`InventoryClient`]: async CRUD, list and suggest operations per entity kind
//! - [`records`]: record shapes exchanged with the service
//! - [`SubnetFilter`] / [`IpFilter`]: list query filters
//! - [`RemoteError`]: facade failures, converted to engine errors by the reconcilers
//!
//! # Example
//!
//! ```ignore
//! use ipam_client::{InventoryClient, SubnetFilter};
//! use ipam_common::RemoteId;
//!
//! async fn children<C: InventoryClient>(client: &C, parent: RemoteId) {
//!     let subnets = client.list_subnets(&SubnetFilter::by_parent(parent)).await?;
//!     for s in subnets {
//!         tracing::debug!("child subnet {}", s.cidr());
//!     }
//! }
//! ```

mod client;
mod error;
pub mod records;

pub use client::{InventoryClient, IpFilter, SubnetFilter};
pub use error::{RemoteError, RemoteResult};
pub use records::{Building, IpAddress, Subnet, Vlan, VrfGroup};
