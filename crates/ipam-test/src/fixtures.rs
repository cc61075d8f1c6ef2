//! Seed records for common inventory layouts
//!
//! Builders return records with fixed ids so tests can refer to them
//! directly. Fixed ids stay well below the ids [`FakeInventory`] assigns.
//!
//! [`FakeInventory`]: crate::FakeInventory

use ipam_client::{Building, IpAddress, Subnet, Vlan, VrfGroup};
use ipam_common::RemoteId;

/// Building with a fixed id.
pub fn building(id: u64, name: &str) -> Building {
    Building {
        id: Some(RemoteId::new(id)),
        name: name.to_string(),
        ..Default::default()
    }
}

/// VRF group spanning the named buildings.
pub fn vrf_group(id: u64, name: &str, buildings: &[&str]) -> VrfGroup {
    VrfGroup {
        id: Some(RemoteId::new(id)),
        name: name.to_string(),
        description: String::new(),
        buildings: buildings.iter().map(|b| b.to_string()).collect(),
    }
}

/// Subnet with a fixed id and no VRF group.
pub fn subnet(id: u64, name: &str, network: &str, mask_bits: u8) -> Subnet {
    let mut subnet = Subnet::new(name, network, mask_bits);
    subnet.id = Some(RemoteId::new(id));
    subnet
}

/// Subnet inside a VRF group.
pub fn subnet_in_vrf(id: u64, name: &str, network: &str, mask_bits: u8, vrf_group_id: u64) -> Subnet {
    let mut subnet = subnet(id, name, network, mask_bits);
    subnet.vrf_group_id = Some(RemoteId::new(vrf_group_id));
    subnet
}

/// Supernet used as an allocation pool.
pub fn pool(id: u64, network: &str, mask_bits: u8) -> Subnet {
    let mut pool = subnet(id, &format!("pool-{}", id), network, mask_bits);
    pool.is_supernet = true;
    pool
}

/// VLAN with a fixed id.
pub fn vlan(id: u64, name: &str, number: u16) -> Vlan {
    let mut vlan = Vlan::new(name, number);
    vlan.id = Some(RemoteId::new(id));
    vlan
}

/// IP address with a fixed id.
pub fn ip(id: u64, address: &str, subnet_id: u64) -> IpAddress {
    let mut ip = IpAddress::new(address, RemoteId::new(subnet_id));
    ip.id = Some(RemoteId::new(id));
    ip
}

/// Campus layout: two buildings, one VRF group spanning both, a /16 pool
/// and a /24 lab subnet inside the group.
pub mod campus {
    use super::*;
    use crate::FakeInventory;

    pub const HQ: u64 = 1;
    pub const DC1: u64 = 2;
    pub const VRF_PROD: u64 = 7;
    pub const POOL: u64 = 42;
    pub const LAB: u64 = 50;

    /// Seeds the campus layout into `fake`.
    pub fn seed(fake: &FakeInventory) {
        fake.seed_building(building(HQ, "HQ"));
        fake.seed_building(building(DC1, "DC1"));
        fake.seed_vrf_group(vrf_group(VRF_PROD, "prod", &["HQ", "DC1"]));

        let mut pool = pool(POOL, "10.0.0.0", 16);
        pool.vrf_group_id = Some(RemoteId::new(VRF_PROD));
        fake.seed_subnet(pool);

        let mut lab = subnet_in_vrf(LAB, "lab", "10.9.0.0", 24, VRF_PROD);
        lab.gateway = "10.9.0.1".to_string();
        fake.seed_subnet(lab);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_is_supernet() {
        let p = pool(42, "10.0.0.0", 16);
        assert!(p.is_supernet);
        assert_eq!(p.name, "pool-42");
        assert_eq!(p.cidr(), "10.0.0.0/16");
    }

    #[test]
    fn test_vrf_group_building_order() {
        let g = vrf_group(7, "prod", &["DC1", "HQ"]);
        assert_eq!(g.buildings, vec!["DC1".to_string(), "HQ".to_string()]);
    }
}
