//! Resource reconcilers for the address-space engine
//!
//! One reconciler per entity kind, each driving an [`ipam_client::InventoryClient`]
//! with sequential calls:
//!
//! - [`BuildingReconciler`], [`VlanReconciler`], [`IpReconciler`]: plain upserts
//! - [`VrfGroupReconciler`]: translates member building ids and names
//! - [`SubnetReconciler`]: upsert plus a second upsert persisting the derived gateway
//! - [`DynamicSubnetReconciler`], [`DynamicIpReconciler`]: suggest then persist,
//!   exposed as separate [`Allocation`] phases
//!
//! [`Resource`] wraps any reconciler with the identity bookkeeping a
//! declarative front-end needs.

mod allocation;
mod building;
mod dynamic_ip;
mod dynamic_subnet;
mod ip;
mod remote;
mod resource;
mod subnet;
mod types;
mod vlan;
mod vrf_group;

pub use allocation::Allocation;
pub use building::BuildingReconciler;
pub use dynamic_ip::DynamicIpReconciler;
pub use dynamic_subnet::DynamicSubnetReconciler;
pub use ip::IpReconciler;
pub use resource::Resource;
pub use subnet::SubnetReconciler;
pub use types::*;
pub use vlan::VlanReconciler;
pub use vrf_group::VrfGroupReconciler;
