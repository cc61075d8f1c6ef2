//! Dynamic subnet reconciler
//!
//! The first set carves a block out of a parent pool in two phases:
//!
//! 1. `suggest_subnet(parent, mask_bits, name, true)` reserves the next free
//!    block remotely ([`Allocation::Allocated`])
//! 2. the caller's name, tags and supernet flag plus the derived gateway are
//!    written back with an upsert ([`Allocation::Persisted`])
//!
//! A failure in phase 2 surfaces as `PartialAllocation`; the reservation is
//! left in place. Later sets re-read the reserved block and re-persist the
//! metadata without suggesting again.

use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{InventoryClient, Subnet, SubnetFilter};
use ipam_common::cidr::{derive_gateway, validate_mask_bits};
use ipam_common::{
    Collection, EntityKind, IpamError, IpamResult, Operation, ReconcileConfig, Reconciler,
    RemoteId,
};
use tracing::{debug, info, instrument, warn};

use crate::allocation::Allocation;
use crate::remote::RemoteContext;
use crate::subnet::{list_subnets, lookup_subnet};
use crate::types::{DynamicSubnetSpec, SubnetQuery, SubnetState};

const KIND: EntityKind = EntityKind::DynamicSubnet;

/// Writes the caller's metadata and the conventional gateway onto a record.
fn merge(record: &mut Subnet, desired: &DynamicSubnetSpec) -> IpamResult<()> {
    if !desired.name.is_empty() {
        record.name = desired.name.clone();
    }
    record.tags = desired.tags.clone();
    record.is_supernet = desired.is_supernet;
    if !desired.is_supernet {
        record.gateway = derive_gateway(&record.network)?;
        debug!("Derived gateway {} for {}", record.gateway, record.cidr());
    }
    Ok(())
}

/// Reconciles subnets carved out of a parent pool
pub struct DynamicSubnetReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> DynamicSubnetReconciler<C> {
    /// Create a new DynamicSubnetReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Reserves the next free block of the requested size in the parent pool.
    #[instrument(skip(self, desired), fields(parent = %desired.parent_subnet_id))]
    pub async fn allocate(&self, desired: &DynamicSubnetSpec) -> IpamResult<Allocation<Subnet>> {
        let mask_bits = validate_mask_bits(desired.mask_bits)?;

        let mut record = self
            .client
            .suggest_subnet(desired.parent_subnet_id, mask_bits, &desired.name, true)
            .await
            .context(KIND, Operation::SuggestSubnet, desired.parent_subnet_id)?;
        debug!("suggested subnet: {:?}", record);

        // Stored mask bits follow the request, not the parent's prefix.
        record.mask_bits = mask_bits;
        record.parent_subnet_id = Some(desired.parent_subnet_id);

        info!(
            "Allocated {} from parent subnet {}",
            record.cidr(),
            desired.parent_subnet_id
        );
        Ok(Allocation::Allocated(record))
    }

    /// Persists the caller's metadata onto a freshly allocated block.
    ///
    /// Any failure here leaves the reservation in place and is reported as
    /// `PartialAllocation`. Already-persisted allocations are returned as is.
    #[instrument(skip(self, allocation, desired))]
    pub async fn persist(
        &self,
        allocation: Allocation<Subnet>,
        desired: &DynamicSubnetSpec,
    ) -> IpamResult<Allocation<Subnet>> {
        let mut record = match allocation {
            Allocation::Allocated(record) => record,
            persisted @ Allocation::Persisted(_) => return Ok(persisted),
        };

        let partial = |record: &Subnet, detail: String| {
            warn!(
                "Subnet {} allocated but not persisted: {}",
                record.cidr(),
                detail
            );
            IpamError::PartialAllocation {
                kind: KIND,
                allocated_id: record.id,
                allocation: record.cidr(),
                detail,
            }
        };

        if let Err(e) = merge(&mut record, desired) {
            return Err(partial(&record, e.to_string()));
        }

        match self.client.upsert_subnet(&record).await {
            Ok(stored) => {
                debug!("subnet: {:?}", stored);
                Ok(Allocation::Persisted(stored))
            }
            Err(e) => Err(partial(&record, e.to_string())),
        }
    }

    /// Fetches a dynamic subnet by any supported key.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &SubnetQuery) -> IpamResult<SubnetState> {
        lookup_subnet(self.client.as_ref(), KIND, query).await
    }

    /// Re-persists metadata onto an existing block without a new suggest.
    async fn update(&self, id: RemoteId, desired: &DynamicSubnetSpec) -> IpamResult<Subnet> {
        validate_mask_bits(desired.mask_bits)?;

        let mut record = self
            .client
            .get_subnet(id)
            .await
            .context(KIND, Operation::Get, id)?;
        if i32::from(record.mask_bits) != desired.mask_bits {
            debug!(
                "subnet {} keeps /{}; requested /{} applies only to new allocations",
                id, record.mask_bits, desired.mask_bits
            );
        }

        merge(&mut record, desired)?;
        let stored = self
            .client
            .upsert_subnet(&record)
            .await
            .context(KIND, Operation::Upsert, id)?;
        debug!("subnet: {:?}", stored);
        Ok(stored)
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for DynamicSubnetReconciler<C> {
    type Desired = DynamicSubnetSpec;
    type Stored = SubnetState;
    type Filter = SubnetFilter;

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self, desired), fields(name = %desired.name))]
    async fn set(
        &self,
        id: Option<RemoteId>,
        desired: &DynamicSubnetSpec,
    ) -> IpamResult<SubnetState> {
        let stored = match id {
            Some(id) => self.update(id, desired).await?,
            None => {
                let allocation = self.allocate(desired).await?;
                self.persist(allocation, desired).await?.into_inner()
            }
        };
        SubnetState::from_record(KIND, Operation::Upsert, stored)
    }

    #[instrument(skip(self))]
    async fn read(&self, id: RemoteId) -> IpamResult<SubnetState> {
        self.lookup(&SubnetQuery::Id(id)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RemoteId) -> IpamResult<()> {
        self.client
            .delete_subnet(id)
            .await
            .context(KIND, Operation::Delete, id)?;
        info!("Released dynamic subnet {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &SubnetFilter) -> IpamResult<Collection<SubnetState>> {
        list_subnets(self.client.as_ref(), KIND, &self.config, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipam_client::RemoteError;
    use ipam_test::{fixtures, CallLogVerifier, FakeInventory};
    use pretty_assertions::assert_eq;

    fn with_pool() -> (Arc<FakeInventory>, DynamicSubnetReconciler<FakeInventory>) {
        let fake = Arc::new(FakeInventory::new());
        fake.seed_subnet(fixtures::pool(42, "10.0.0.0", 16));
        let r = DynamicSubnetReconciler::new(fake.clone(), ReconcileConfig::default());
        (fake, r)
    }

    fn spec(mask_bits: i32) -> DynamicSubnetSpec {
        DynamicSubnetSpec {
            name: "edge".to_string(),
            parent_subnet_id: RemoteId::new(42),
            mask_bits,
            is_supernet: false,
            tags: vec!["team-a".to_string()],
        }
    }

    #[tokio::test]
    async fn test_first_set_suggests_then_persists() {
        let (fake, r) = with_pool();

        let state = r.set(None, &spec(28)).await.unwrap();

        assert_eq!(state.mask_bits, 28);
        assert_eq!(state.mask, "255.255.255.240");
        assert_eq!(state.gateway, "10.0.0.1");
        assert_eq!(state.parent_subnet_id, Some(RemoteId::new(42)));
        assert_eq!(state.tags, vec!["team-a".to_string()]);

        let verifier = CallLogVerifier::new(fake.calls());
        verifier.assert_call_count("suggest_subnet", 1).unwrap();
        verifier.assert_called("parent=42 mask=28 mark=true").unwrap();
        verifier.assert_call_count("upsert_subnet", 1).unwrap();
        verifier.assert_order("suggest_subnet", "upsert_subnet").unwrap();
    }

    #[tokio::test]
    async fn test_allocate_and_persist_phases() {
        let (_fake, r) = with_pool();

        let allocation = r.allocate(&spec(24)).await.unwrap();
        assert!(!allocation.is_persisted());
        assert_eq!(allocation.record().gateway, "");

        let persisted = r.persist(allocation, &spec(24)).await.unwrap();
        assert!(persisted.is_persisted());
        assert_eq!(persisted.record().gateway, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_persist_failure_is_partial_allocation() {
        let (fake, r) = with_pool();
        fake.fail_next("upsert_subnet", RemoteError::failed("HTTP 502"));

        let err = r.set(None, &spec(28)).await.unwrap_err();

        match err {
            IpamError::PartialAllocation {
                kind,
                allocated_id,
                allocation,
                detail,
            } => {
                assert_eq!(kind, KIND);
                assert!(allocated_id.is_some());
                assert_eq!(allocation, "10.0.0.0/28");
                assert_eq!(detail, "HTTP 502");
            }
            other => panic!("expected PartialAllocation, got {:?}", other),
        }
        assert_eq!(fake.call_count("delete_subnet"), 0);
    }

    #[tokio::test]
    async fn test_suggest_failure_is_remote_failure() {
        let (fake, r) = with_pool();
        fake.fail_next("suggest_subnet", RemoteError::failed("pool exhausted"));

        let err = r.set(None, &spec(28)).await.unwrap_err();
        assert_eq!(
            err,
            IpamError::remote(KIND, Operation::SuggestSubnet, "pool exhausted")
        );
        assert_eq!(fake.call_count("upsert_subnet"), 0);
    }

    #[tokio::test]
    async fn test_invalid_mask_makes_no_remote_call() {
        let (fake, r) = with_pool();
        let err = r.set(None, &spec(33)).await.unwrap_err();
        assert_eq!(err, IpamError::invalid_prefix_length(33));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_with_id_does_not_suggest_again() {
        let (fake, r) = with_pool();
        let created = r.set(None, &spec(28)).await.unwrap();
        fake.clear_calls();

        let mut desired = spec(28);
        desired.tags.push("team-b".to_string());
        let updated = r.set(Some(created.id), &desired).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.cidr(), created.cidr());
        assert_eq!(updated.tags.len(), 2);
        assert_eq!(fake.call_count("suggest_subnet"), 0);
    }

    #[tokio::test]
    async fn test_supernet_keeps_empty_gateway() {
        let (_fake, r) = with_pool();
        let mut desired = spec(20);
        desired.is_supernet = true;

        let state = r.set(None, &desired).await.unwrap();
        assert_eq!(state.gateway, "");
        assert!(state.is_supernet);
    }
}
