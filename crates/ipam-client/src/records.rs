//! Record shapes exchanged with the inventory service.
//!
//! Field names follow the remote schema. An absent `id` on an upsert asks the
//! service to create; a present one asks it to update.

use ipam_common::RemoteId;
use serde::{Deserialize, Serialize};

/// Building record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Remote id, absent until created.
    #[serde(rename = "building_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    /// Unique building name.
    pub name: String,
    /// Street address.
    #[serde(default)]
    pub address: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

impl Building {
    /// Create a new Building with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// VRF group record. Membership is stored by building name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Building names, in caller order.
    #[serde(default)]
    pub buildings: Vec<String>,
}

impl VrfGroup {
    /// Create a new VrfGroup with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Subnet record.
///
/// The dotted mask is not stored remotely; it is always derived from
/// `mask_bits`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Remote id, absent until created.
    #[serde(rename = "subnet_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub name: String,
    /// Network address, e.g. `10.1.0.0`.
    pub network: String,
    /// Prefix length.
    pub mask_bits: u8,
    /// Gateway address; empty when none is recorded.
    #[serde(default)]
    pub gateway: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf_group_id: Option<RemoteId>,
    /// Set on subnets carved out of a parent pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_subnet_id: Option<RemoteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_vlan_number: Option<u16>,
    #[serde(default)]
    pub is_supernet: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Subnet {
    /// Create a new Subnet
    pub fn new(name: impl Into<String>, network: impl Into<String>, mask_bits: u8) -> Self {
        Self {
            name: name.into(),
            network: network.into(),
            mask_bits,
            ..Default::default()
        }
    }

    /// Returns the `network/mask_bits` text.
    pub fn cidr(&self) -> String {
        format!("{}/{}", self.network, self.mask_bits)
    }
}

/// VLAN record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    #[serde(rename = "vlan_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    #[serde(default)]
    pub name: String,
    pub number: u16,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Vlan {
    /// Create a new Vlan
    pub fn new(name: impl Into<String>, number: u16) -> Self {
        Self {
            name: name.into(),
            number,
            ..Default::default()
        }
    }
}

/// IP address record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RemoteId>,
    /// Dotted address, e.g. `10.1.0.10`.
    #[serde(rename = "ip")]
    pub address: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<RemoteId>,
    /// CIDR text of the owning subnet, e.g. `10.1.0.0/24`.
    #[serde(default)]
    pub subnet: String,
    /// Name of the VRF group the subnet belongs to.
    #[serde(default)]
    pub vrf_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf_group_id: Option<RemoteId>,
}

impl IpAddress {
    /// Create a new IpAddress in a subnet
    pub fn new(address: impl Into<String>, subnet_id: RemoteId) -> Self {
        Self {
            address: address.into(),
            subnet_id: Some(subnet_id),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subnet_new() {
        let subnet = Subnet::new("lab", "10.1.0.0", 24);
        assert_eq!(subnet.id, None);
        assert_eq!(subnet.cidr(), "10.1.0.0/24");
        assert_eq!(subnet.gateway, "");
        assert!(!subnet.is_supernet);
    }

    #[test]
    fn test_subnet_remote_field_names() {
        let mut subnet = Subnet::new("lab", "10.1.0.0", 24);
        subnet.id = Some(RemoteId::new(7));

        let json = serde_json::to_value(&subnet).unwrap();
        assert_eq!(json["subnet_id"], 7);
        assert_eq!(json["mask_bits"], 24);
        assert!(json.get("vrf_group_id").is_none());
    }

    #[test]
    fn test_subnet_without_id_omits_it() {
        let json = serde_json::to_value(Subnet::new("lab", "10.1.0.0", 24)).unwrap();
        assert!(json.get("subnet_id").is_none());
    }

    #[test]
    fn test_ip_address_deserialize_defaults() {
        let ip: IpAddress =
            serde_json::from_str(r#"{"id": 3, "ip": "10.1.0.10", "subnet_id": 9}"#).unwrap();
        assert_eq!(ip.id, Some(RemoteId::new(3)));
        assert_eq!(ip.address, "10.1.0.10");
        assert_eq!(ip.subnet_id, Some(RemoteId::new(9)));
        assert_eq!(ip.label, "");
        assert_eq!(ip.vrf_group_id, None);
    }

    #[test]
    fn test_subnet_zero_parent_rejected() {
        let parsed = serde_json::from_str::<Subnet>(
            r#"{"network": "10.0.0.0", "mask_bits": 28, "parent_subnet_id": 0}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_building_new() {
        let b = Building::new("HQ");
        assert_eq!(b.name, "HQ");
        assert_eq!(b.id, None);
        assert_eq!(b.address, "");
    }

    #[test]
    fn test_vlan_and_vrf_group_new() {
        let vlan = Vlan::new("users", 100);
        assert_eq!(vlan.number, 100);
        assert!(vlan.tags.is_empty());

        let group = VrfGroup::new("prod");
        assert_eq!(group.name, "prod");
        assert!(group.buildings.is_empty());
    }
}
