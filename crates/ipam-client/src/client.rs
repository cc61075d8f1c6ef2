//! The inventory facade the reconcilers drive.

use async_trait::async_trait;
use ipam_common::RemoteId;

use crate::error::RemoteResult;
use crate::records::{Building, IpAddress, Subnet, Vlan, VrfGroup};

/// Filter for subnet list queries. Both criteria are optional and combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubnetFilter {
    /// Only subnets in this VRF group.
    pub vrf_group_id: Option<RemoteId>,
    /// Only subnets carved out of this parent.
    pub parent_subnet_id: Option<RemoteId>,
}

impl SubnetFilter {
    /// Matches every subnet.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches subnets in a VRF group.
    pub fn by_vrf_group(vrf_group_id: RemoteId) -> Self {
        Self {
            vrf_group_id: Some(vrf_group_id),
            parent_subnet_id: None,
        }
    }

    /// Matches subnets carved out of a parent.
    pub fn by_parent(parent_subnet_id: RemoteId) -> Self {
        Self {
            vrf_group_id: None,
            parent_subnet_id: Some(parent_subnet_id),
        }
    }

    /// Adds a parent-subnet criterion.
    pub fn with_parent(mut self, parent_subnet_id: RemoteId) -> Self {
        self.parent_subnet_id = Some(parent_subnet_id);
        self
    }

    /// Returns true if the subnet satisfies every set criterion.
    pub fn matches(&self, subnet: &Subnet) -> bool {
        self.vrf_group_id
            .map_or(true, |id| subnet.vrf_group_id == Some(id))
            && self
                .parent_subnet_id
                .map_or(true, |id| subnet.parent_subnet_id == Some(id))
    }
}

/// Filter for IP list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpFilter {
    /// Only addresses in this subnet.
    pub subnet_id: Option<RemoteId>,
}

impl IpFilter {
    /// Matches every address.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches addresses in a subnet.
    pub fn by_subnet(subnet_id: RemoteId) -> Self {
        Self {
            subnet_id: Some(subnet_id),
        }
    }

    /// Returns true if the address satisfies the filter.
    pub fn matches(&self, ip: &IpAddress) -> bool {
        self.subnet_id.map_or(true, |id| ip.subnet_id == Some(id))
    }
}

/// Operations the engine requires from the external inventory service.
///
/// Upserts create when the record carries no id and update otherwise. The
/// engine never retries a failed call; deadlines and retries belong to the
/// transport behind an implementation.
///
/// Implementations are passed explicitly to every reconciler constructor, so
/// tests substitute an in-memory fake per case.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    // Buildings
    async fn get_building(&self, id: RemoteId) -> RemoteResult<Building>;
    async fn get_building_by_name(&self, name: &str) -> RemoteResult<Building>;
    async fn list_buildings(&self) -> RemoteResult<Vec<Building>>;
    async fn upsert_building(&self, building: &Building) -> RemoteResult<Building>;
    async fn delete_building(&self, id: RemoteId) -> RemoteResult<()>;

    // VRF groups
    async fn get_vrf_group(&self, id: RemoteId) -> RemoteResult<VrfGroup>;
    async fn get_vrf_group_by_name(&self, name: &str) -> RemoteResult<VrfGroup>;
    async fn list_vrf_groups(&self) -> RemoteResult<Vec<VrfGroup>>;
    async fn upsert_vrf_group(&self, group: &VrfGroup) -> RemoteResult<VrfGroup>;
    async fn delete_vrf_group(&self, id: RemoteId) -> RemoteResult<()>;

    // Subnets
    async fn get_subnet(&self, id: RemoteId) -> RemoteResult<Subnet>;
    async fn get_subnet_by_name_and_network(
        &self,
        name: &str,
        network: &str,
    ) -> RemoteResult<Subnet>;
    async fn get_subnet_by_name_and_vrf_group(
        &self,
        name: &str,
        vrf_group_id: Option<RemoteId>,
    ) -> RemoteResult<Subnet>;
    async fn list_subnets(&self, filter: &SubnetFilter) -> RemoteResult<Vec<Subnet>>;
    async fn upsert_subnet(&self, subnet: &Subnet) -> RemoteResult<Subnet>;
    async fn delete_subnet(&self, id: RemoteId) -> RemoteResult<()>;

    /// Suggests the next free block of `mask_bits` inside a parent subnet.
    ///
    /// With `mark_allocated` the service reserves the block and assigns it an id.
    async fn suggest_subnet(
        &self,
        parent_subnet_id: RemoteId,
        mask_bits: u8,
        name: &str,
        mark_allocated: bool,
    ) -> RemoteResult<Subnet>;

    // VLANs
    async fn get_vlan(&self, id: RemoteId) -> RemoteResult<Vlan>;
    async fn get_vlan_by_name(&self, name: &str) -> RemoteResult<Vlan>;
    async fn list_vlans(&self) -> RemoteResult<Vec<Vlan>>;
    async fn upsert_vlan(&self, vlan: &Vlan) -> RemoteResult<Vlan>;
    async fn delete_vlan(&self, id: RemoteId) -> RemoteResult<()>;

    // IP addresses
    async fn get_ip(&self, id: RemoteId) -> RemoteResult<IpAddress>;
    async fn get_ip_by_address(&self, address: &str, subnet_id: RemoteId)
        -> RemoteResult<IpAddress>;
    async fn list_ips(&self, filter: &IpFilter) -> RemoteResult<Vec<IpAddress>>;
    async fn upsert_ip(&self, ip: &IpAddress) -> RemoteResult<IpAddress>;
    async fn delete_ip(&self, id: RemoteId) -> RemoteResult<()>;

    /// Suggests the next free address in a subnet, scoped by VRF group.
    ///
    /// With `mark_allocated` the service reserves the address and assigns it an id.
    async fn suggest_ip(
        &self,
        vrf_group_id: Option<RemoteId>,
        subnet_id: Option<RemoteId>,
        mask_bits: u8,
        mark_allocated: bool,
    ) -> RemoteResult<IpAddress>;
}
