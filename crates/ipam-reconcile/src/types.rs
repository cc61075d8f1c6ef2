//! Desired and normalized state for every entity kind

use ipam_client::{Building, IpAddress, Subnet, Vlan};
use ipam_common::cidr::mask_bits_to_dotted_mask;
use ipam_common::{EntityKind, Identified, IpamError, IpamResult, Operation, RemoteId};
use serde::{Deserialize, Serialize};

/// Returns the id a remote record must carry once stored.
pub(crate) fn require_id(
    kind: EntityKind,
    operation: Operation,
    id: Option<RemoteId>,
) -> IpamResult<RemoteId> {
    id.ok_or_else(|| IpamError::remote(kind, operation, "response carried no id"))
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Desired building attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingSpec {
    pub name: String,
    pub address: String,
    pub notes: String,
}

impl BuildingSpec {
    /// Create a new BuildingSpec with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Stored building
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildingState {
    pub id: RemoteId,
    pub name: String,
    pub address: String,
    pub notes: String,
}

impl BuildingState {
    pub(crate) fn from_record(record: Building, operation: Operation) -> IpamResult<Self> {
        Ok(Self {
            id: require_id(EntityKind::Building, operation, record.id)?,
            name: record.name,
            address: record.address,
            notes: record.notes,
        })
    }
}

impl Identified for BuildingState {
    fn remote_id(&self) -> RemoteId {
        self.id
    }
}

/// Building lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingQuery {
    Id(RemoteId),
    Name(String),
}

// ---------------------------------------------------------------------------
// VRF group
// ---------------------------------------------------------------------------

/// Desired VRF group attributes
///
/// Buildings are named by id locally; the remote service stores names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VrfGroupSpec {
    pub name: String,
    pub description: String,
    /// Member buildings, in the order the group should list them
    pub building_ids: Vec<RemoteId>,
}

/// Stored VRF group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VrfGroupState {
    pub id: RemoteId,
    pub name: String,
    pub description: String,
    /// Member building ids, parallel to `buildings`
    pub building_ids: Vec<RemoteId>,
    /// Member building names as stored remotely
    pub buildings: Vec<String>,
}

impl Identified for VrfGroupState {
    fn remote_id(&self) -> RemoteId {
        self.id
    }
}

/// VRF group lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VrfGroupQuery {
    Id(RemoteId),
    Name(String),
}

// ---------------------------------------------------------------------------
// Subnets
// ---------------------------------------------------------------------------

/// Desired static subnet attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubnetSpec {
    pub name: String,
    /// Network address, e.g. `10.1.0.0`
    pub network: String,
    /// Prefix length; validated to 0-32 before any remote call
    pub mask_bits: i32,
    pub vrf_group_id: Option<RemoteId>,
    /// Supernets keep whatever gateway the remote service holds
    pub is_supernet: bool,
    pub tags: Vec<String>,
}

/// Desired dynamically-carved subnet attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSubnetSpec {
    #[serde(default)]
    pub name: String,
    /// Pool the block is carved out of
    pub parent_subnet_id: RemoteId,
    /// Prefix length of the carved block, independent of the parent's
    pub mask_bits: i32,
    #[serde(default)]
    pub is_supernet: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Normalized subnet, shared by static and dynamic subnets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetState {
    pub id: RemoteId,
    pub name: String,
    pub network: String,
    pub mask_bits: u8,
    /// Dotted mask, always derived from `mask_bits`
    pub mask: String,
    /// Gateway address; empty when none is recorded
    pub gateway: String,
    pub vrf_group_id: Option<RemoteId>,
    pub parent_subnet_id: Option<RemoteId>,
    pub is_supernet: bool,
    pub tags: Vec<String>,
    /// Associated VLAN number as display text; empty when none
    pub vlan: String,
}

impl SubnetState {
    /// Normalizes a remote subnet record.
    pub(crate) fn from_record(
        kind: EntityKind,
        operation: Operation,
        record: Subnet,
    ) -> IpamResult<Self> {
        let id = require_id(kind, operation, record.id)?;
        let mask = mask_bits_to_dotted_mask(i32::from(record.mask_bits))?;
        Ok(Self {
            id,
            name: record.name,
            network: record.network,
            mask_bits: record.mask_bits,
            mask,
            gateway: record.gateway,
            vrf_group_id: record.vrf_group_id,
            parent_subnet_id: record.parent_subnet_id,
            is_supernet: record.is_supernet,
            tags: record.tags,
            vlan: record
                .parent_vlan_number
                .map(|number| number.to_string())
                .unwrap_or_default(),
        })
    }

    /// Returns the `network/mask_bits` text.
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network, self.mask_bits)
    }
}

impl Identified for SubnetState {
    fn remote_id(&self) -> RemoteId {
        self.id
    }
}

/// Subnet lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubnetQuery {
    Id(RemoteId),
    NameAndNetwork { name: String, network: String },
    NameAndVrfGroup { name: String, vrf_group_id: Option<RemoteId> },
}

// ---------------------------------------------------------------------------
// VLAN
// ---------------------------------------------------------------------------

/// Desired VLAN attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VlanSpec {
    pub name: String,
    pub number: u16,
    pub tags: Vec<String>,
}

/// Stored VLAN
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VlanState {
    pub id: RemoteId,
    pub name: String,
    pub number: u16,
    pub tags: Vec<String>,
}

impl VlanState {
    pub(crate) fn from_record(record: Vlan, operation: Operation) -> IpamResult<Self> {
        Ok(Self {
            id: require_id(EntityKind::Vlan, operation, record.id)?,
            name: record.name,
            number: record.number,
            tags: record.tags,
        })
    }
}

impl Identified for VlanState {
    fn remote_id(&self) -> RemoteId {
        self.id
    }
}

/// VLAN lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VlanQuery {
    Id(RemoteId),
    Name(String),
}

// ---------------------------------------------------------------------------
// IP addresses
// ---------------------------------------------------------------------------

/// Desired static IP attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSpec {
    /// Dotted address, e.g. `10.1.0.10`
    pub address: String,
    #[serde(default)]
    pub label: String,
    pub subnet_id: RemoteId,
}

/// Desired dynamically-suggested IP attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicIpSpec {
    pub vrf_group_id: Option<RemoteId>,
    pub subnet_id: Option<RemoteId>,
    pub mask_bits: i32,
}

/// Normalized IP address, shared by static and dynamic IPs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpState {
    pub id: RemoteId,
    pub address: String,
    pub label: String,
    pub mac_address: String,
    pub subnet_id: Option<RemoteId>,
    /// Owning subnet CIDR, e.g. `10.1.0.0/24`
    pub subnet: String,
    pub vrf_group: String,
    pub vrf_group_id: Option<RemoteId>,
}

impl IpState {
    pub(crate) fn from_record(
        kind: EntityKind,
        operation: Operation,
        record: IpAddress,
    ) -> IpamResult<Self> {
        Ok(Self {
            id: require_id(kind, operation, record.id)?,
            address: record.address,
            label: record.label,
            mac_address: record.mac_address,
            subnet_id: record.subnet_id,
            subnet: record.subnet,
            vrf_group: record.vrf_group,
            vrf_group_id: record.vrf_group_id,
        })
    }
}

impl Identified for IpState {
    fn remote_id(&self) -> RemoteId {
        self.id
    }
}

/// IP lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpQuery {
    Id(RemoteId),
    AddressInSubnet { address: String, subnet_id: RemoteId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subnet_state_derives_mask() {
        let mut record = Subnet::new("lab", "10.1.0.0", 24);
        record.id = Some(RemoteId::new(3));
        record.parent_vlan_number = Some(120);

        let state = SubnetState::from_record(EntityKind::Subnet, Operation::Get, record).unwrap();
        assert_eq!(state.mask, "255.255.255.0");
        assert_eq!(state.vlan, "120");
        assert_eq!(state.cidr(), "10.1.0.0/24");
    }

    #[test]
    fn test_subnet_state_without_vlan() {
        let mut record = Subnet::new("lab", "10.1.0.0", 16);
        record.id = Some(RemoteId::new(3));

        let state = SubnetState::from_record(EntityKind::Subnet, Operation::Get, record).unwrap();
        assert_eq!(state.mask, "255.255.0.0");
        assert_eq!(state.vlan, "");
    }

    #[test]
    fn test_subnet_state_rejects_bad_mask_bits() {
        let mut record = Subnet::new("lab", "10.1.0.0", 40);
        record.id = Some(RemoteId::new(3));

        let err = SubnetState::from_record(EntityKind::Subnet, Operation::Get, record).unwrap_err();
        assert_eq!(err, IpamError::invalid_prefix_length(40));
    }

    #[test]
    fn test_record_without_id() {
        let err = BuildingState::from_record(Building::new("HQ"), Operation::Upsert).unwrap_err();
        assert!(matches!(
            err,
            IpamError::RemoteCallFailed {
                kind: EntityKind::Building,
                operation: Operation::Upsert,
                ..
            }
        ));
    }

    #[test]
    fn test_dynamic_subnet_spec_deserialize() {
        let spec: DynamicSubnetSpec =
            serde_json::from_str(r#"{"parent_subnet_id": 42, "mask_bits": 28}"#).unwrap();
        assert_eq!(spec.parent_subnet_id, RemoteId::new(42));
        assert_eq!(spec.mask_bits, 28);
        assert!(!spec.is_supernet);
        assert!(spec.tags.is_empty());
    }
}
