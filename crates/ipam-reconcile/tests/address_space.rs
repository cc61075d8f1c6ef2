//! End-to-end reconciliation scenarios
//!
//! Each scenario drives reconcilers against an in-memory inventory and checks
//! both the returned state and the calls the inventory received.

use std::sync::Arc;

use ipam_client::{RemoteError, SubnetFilter};
use ipam_common::{
    fingerprint, EntityKind, IpamError, ReconcileConfig, Reconciler, RemoteId,
};
use ipam_reconcile::{
    BuildingReconciler, BuildingSpec, DynamicIpReconciler, DynamicIpSpec,
    DynamicSubnetReconciler, DynamicSubnetSpec, Resource, SubnetReconciler, SubnetSpec,
    VrfGroupReconciler, VrfGroupSpec,
};
use ipam_test::{fixtures, CallLogVerifier, FakeInventory};
use pretty_assertions::assert_eq;

fn ids(raw: &[u64]) -> Vec<RemoteId> {
    raw.iter().copied().map(RemoteId::new).collect()
}

/// Scenario:
/// 1. Create a non-supernet /24
/// 2. Verify the gateway is persisted by a second upsert
/// 3. Read it back with mask and gateway derived
#[tokio::test]
async fn test_static_subnet_lifecycle() {
    let fake = Arc::new(FakeInventory::new());
    let subnets = SubnetReconciler::new(fake.clone(), ReconcileConfig::default());
    let spec = SubnetSpec {
        name: "lab".to_string(),
        network: "10.1.0.0".to_string(),
        mask_bits: 24,
        ..Default::default()
    };

    let created = subnets.set(None, &spec).await.unwrap();

    let verifier = CallLogVerifier::new(fake.calls());
    verifier.assert_call_count("upsert_subnet", 2).unwrap();
    verifier.assert_total_calls(2).unwrap();
    assert_eq!(fake.subnet_upserts()[1].gateway, "10.1.0.1");

    let read = subnets.read(created.id).await.unwrap();
    assert_eq!(read.mask, "255.255.255.0");
    assert_eq!(read.gateway, "10.1.0.1");
    assert_eq!(read, created);
}

/// Scenario:
/// 1. Carve a /28 out of pool 42 (a /16)
/// 2. Verify exactly one suggest with mark_allocated and one persist
/// 3. Stored mask bits are 28, not the parent's 16
#[tokio::test]
async fn test_dynamic_subnet_from_pool() {
    let fake = Arc::new(FakeInventory::new());
    fake.seed_subnet(fixtures::pool(42, "10.0.0.0", 16));
    let dynamic = DynamicSubnetReconciler::new(fake.clone(), ReconcileConfig::default());
    let spec = DynamicSubnetSpec {
        name: "edge".to_string(),
        parent_subnet_id: RemoteId::new(42),
        mask_bits: 28,
        is_supernet: false,
        tags: Vec::new(),
    };

    let state = dynamic.set(None, &spec).await.unwrap();

    let verifier = CallLogVerifier::new(fake.calls());
    verifier.assert_call_count("suggest_subnet", 1).unwrap();
    verifier.assert_called("mark=true").unwrap();
    verifier.assert_call_count("upsert_subnet", 1).unwrap();
    assert_eq!(state.mask_bits, 28);
    assert_eq!(state.mask, "255.255.255.240");
    assert_eq!(state.gateway, "10.0.0.1");

    // A second carve lands in the next free block.
    let next = dynamic.set(None, &spec).await.unwrap();
    assert_eq!(next.cidr(), "10.0.0.16/28");
    assert_eq!(next.gateway, "10.0.0.17");
}

/// Scenario:
/// 1. Seed subnets 11, 22, 33 in VRF group 7 and one elsewhere
/// 2. List by VRF group 7
/// 3. Identity is the fingerprint of [11, 22, 33]; every mask matches its bits
#[tokio::test]
async fn test_list_subnets_by_vrf_group() {
    let fake = Arc::new(FakeInventory::new());
    fake.seed_subnet(fixtures::subnet_in_vrf(11, "a", "10.1.0.0", 24, 7));
    fake.seed_subnet(fixtures::subnet_in_vrf(22, "b", "10.2.0.0", 23, 7));
    fake.seed_subnet(fixtures::subnet_in_vrf(44, "x", "10.4.0.0", 24, 8));
    fake.seed_subnet(fixtures::subnet_in_vrf(33, "c", "10.3.0.0", 30, 7));
    let subnets = SubnetReconciler::new(fake.clone(), ReconcileConfig::default());

    let listed = subnets
        .list(&SubnetFilter::by_vrf_group(RemoteId::new(7)))
        .await
        .unwrap();

    assert_eq!(listed.ids(), ids(&[11, 22, 33]));
    assert_eq!(listed.id, fingerprint(ids(&[11, 22, 33])));
    let masks: Vec<&str> = listed.items.iter().map(|s| s.mask.as_str()).collect();
    assert_eq!(masks, vec!["255.255.255.0", "255.255.254.0", "255.255.255.252"]);
}

/// Scenario:
/// 1. List children of pool 42 within VRF group 7
/// 2. Only carved children in the group are returned
#[tokio::test]
async fn test_list_subnets_by_parent_and_vrf_group() {
    let fake = Arc::new(FakeInventory::new());
    fixtures::campus::seed(&fake);
    let dynamic = DynamicSubnetReconciler::new(fake.clone(), ReconcileConfig::default());
    let spec = DynamicSubnetSpec {
        name: "edge".to_string(),
        parent_subnet_id: RemoteId::new(fixtures::campus::POOL),
        mask_bits: 24,
        is_supernet: false,
        tags: Vec::new(),
    };
    let a = dynamic.set(None, &spec).await.unwrap();
    let b = dynamic.set(None, &spec).await.unwrap();

    let filter = SubnetFilter::by_vrf_group(RemoteId::new(fixtures::campus::VRF_PROD))
        .with_parent(RemoteId::new(fixtures::campus::POOL));
    let children = dynamic.list(&filter).await.unwrap();

    assert_eq!(children.ids(), vec![a.id, b.id]);
    assert!(children
        .items
        .iter()
        .all(|s| s.vrf_group_id == Some(RemoteId::new(fixtures::campus::VRF_PROD))));
}

/// Scenario:
/// 1. Restore a building handle with id 5
/// 2. The inventory reports not-found on delete
/// 3. NotFound surfaces and the handle keeps its identity
#[tokio::test]
async fn test_delete_building_not_found_keeps_identity() {
    let fake = Arc::new(FakeInventory::new());
    let buildings = BuildingReconciler::new(fake.clone(), ReconcileConfig::default());
    let mut handle = Resource::from_id_text(buildings, "5").unwrap();

    let err = handle.destroy().await.unwrap_err();

    assert_eq!(
        err,
        IpamError::not_found(EntityKind::Building, 5, "building 5 does not exist")
    );
    assert_eq!(handle.id_text(), "5");
}

/// Scenario:
/// 1. Persist of a carved subnet fails after the suggest succeeded
/// 2. PartialAllocation carries the reserved id; nothing is released
/// 3. The reservation is still visible in the parent pool
#[tokio::test]
async fn test_partial_allocation_is_not_compensated() {
    let fake = Arc::new(FakeInventory::new());
    fake.seed_subnet(fixtures::pool(42, "10.0.0.0", 16));
    fake.fail_next("upsert_subnet", RemoteError::failed("HTTP 504"));
    let dynamic = DynamicSubnetReconciler::new(fake.clone(), ReconcileConfig::default());
    let spec = DynamicSubnetSpec {
        name: "edge".to_string(),
        parent_subnet_id: RemoteId::new(42),
        mask_bits: 28,
        is_supernet: false,
        tags: Vec::new(),
    };

    let err = dynamic.set(None, &spec).await.unwrap_err();

    let allocated_id = match err {
        IpamError::PartialAllocation { allocated_id, .. } => allocated_id,
        other => panic!("expected PartialAllocation, got {:?}", other),
    };
    let reserved = allocated_id.and_then(|id| fake.subnet(id)).unwrap();
    assert_eq!(reserved.cidr(), "10.0.0.0/28");

    CallLogVerifier::new(fake.calls())
        .assert_not_called("delete_subnet")
        .unwrap();
}

/// Scenario:
/// 1. Seed three buildings
/// 2. Create a VRF group naming them in a non-sorted order
/// 3. Resolution is sequential and the stored names keep that order
#[tokio::test]
async fn test_vrf_group_building_order() {
    let fake = Arc::new(FakeInventory::new());
    fake.seed_building(fixtures::building(1, "HQ"));
    fake.seed_building(fixtures::building(2, "DC1"));
    fake.seed_building(fixtures::building(3, "DC2"));
    let groups = VrfGroupReconciler::new(fake.clone(), ReconcileConfig::default());
    let spec = VrfGroupSpec {
        name: "prod".to_string(),
        description: "production".to_string(),
        building_ids: ids(&[2, 3, 1]),
    };

    let state = groups.set(None, &spec).await.unwrap();

    assert_eq!(state.buildings, vec!["DC1", "DC2", "HQ"]);
    assert_eq!(state.building_ids, ids(&[2, 3, 1]));
    let verifier = CallLogVerifier::new(fake.calls());
    verifier.assert_order("get_building 2", "get_building 3").unwrap();
    verifier.assert_order("get_building 3", "get_building 1").unwrap();
}

/// Scenario:
/// 1. Allocate an address in the campus lab subnet through a resource handle
/// 2. Refresh and destroy it
#[tokio::test]
async fn test_dynamic_ip_handle_lifecycle() {
    let fake = Arc::new(FakeInventory::new());
    fixtures::campus::seed(&fake);
    let ips = DynamicIpReconciler::new(fake.clone(), ReconcileConfig::default());
    let mut handle = Resource::new(ips);
    let spec = DynamicIpSpec {
        vrf_group_id: Some(RemoteId::new(fixtures::campus::VRF_PROD)),
        subnet_id: Some(RemoteId::new(fixtures::campus::LAB)),
        mask_bits: 24,
    };

    let address = handle.apply(&spec).await.unwrap().address.clone();
    let refreshed = handle.refresh().await.unwrap();
    assert_eq!(refreshed.address, address);

    let attrs = handle.attributes().unwrap();
    assert_eq!(attrs["subnet"], "10.9.0.0/24");

    handle.destroy().await.unwrap();
    assert_eq!(handle.id(), None);
    assert_eq!(fake.call_count("delete_ip"), 1);
}

/// Scenario:
/// 1. Apply a building twice through one handle
/// 2. The second apply updates in place
#[tokio::test]
async fn test_reapply_is_idempotent() {
    let fake = Arc::new(FakeInventory::new());
    let mut handle = Resource::new(BuildingReconciler::new(
        fake.clone(),
        ReconcileConfig::default(),
    ));
    let spec = BuildingSpec::new("HQ");

    let first = handle.apply(&spec).await.unwrap().id;
    let second = handle.apply(&spec).await.unwrap().id;

    assert_eq!(first, second);
    let verifier = CallLogVerifier::new(fake.calls());
    verifier.assert_called("upsert_building none").unwrap();
    verifier
        .assert_called(&format!("upsert_building {}", first))
        .unwrap();
}
