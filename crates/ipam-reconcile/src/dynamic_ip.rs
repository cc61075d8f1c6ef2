//! Dynamic IP reconciler
//!
//! Same two phases as dynamic subnets: `suggest_ip(.., true)` reserves the
//! next free address, then an upsert writes the caller's VRF group and subnet
//! association onto it.

use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{InventoryClient, IpAddress, IpFilter};
use ipam_common::cidr::validate_mask_bits;
use ipam_common::{
    Collection, EntityKind, IpamError, IpamResult, Operation, ReconcileConfig, Reconciler,
    RemoteId,
};
use tracing::{debug, info, instrument, warn};

use crate::allocation::Allocation;
use crate::ip::{list_ips, lookup_ip};
use crate::remote::RemoteContext;
use crate::types::{DynamicIpSpec, IpQuery, IpState};

const KIND: EntityKind = EntityKind::DynamicIp;

fn merge(record: &mut IpAddress, desired: &DynamicIpSpec) {
    if desired.vrf_group_id.is_some() {
        record.vrf_group_id = desired.vrf_group_id;
    }
    if desired.subnet_id.is_some() {
        record.subnet_id = desired.subnet_id;
    }
}

/// Reconciles addresses suggested by the remote service
pub struct DynamicIpReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> DynamicIpReconciler<C> {
    /// Create a new DynamicIpReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Reserves the next free address.
    #[instrument(skip(self))]
    pub async fn allocate(&self, desired: &DynamicIpSpec) -> IpamResult<Allocation<IpAddress>> {
        let mask_bits = validate_mask_bits(desired.mask_bits)?;

        let key = desired
            .subnet_id
            .map_or_else(|| "*".to_string(), |id| id.to_string());
        let record = self
            .client
            .suggest_ip(desired.vrf_group_id, desired.subnet_id, mask_bits, true)
            .await
            .context(KIND, Operation::SuggestIp, key)?;
        debug!("suggested ip: {:?}", record);

        info!("Allocated address {} in {}", record.address, record.subnet);
        Ok(Allocation::Allocated(record))
    }

    /// Persists the caller's association onto a freshly allocated address.
    #[instrument(skip(self, allocation))]
    pub async fn persist(
        &self,
        allocation: Allocation<IpAddress>,
        desired: &DynamicIpSpec,
    ) -> IpamResult<Allocation<IpAddress>> {
        let mut record = match allocation {
            Allocation::Allocated(record) => record,
            persisted @ Allocation::Persisted(_) => return Ok(persisted),
        };
        merge(&mut record, desired);

        match self.client.upsert_ip(&record).await {
            Ok(stored) => {
                debug!("ip: {:?}", stored);
                Ok(Allocation::Persisted(stored))
            }
            Err(e) => {
                warn!(
                    "Address {} allocated but not persisted: {}",
                    record.address, e
                );
                Err(IpamError::PartialAllocation {
                    kind: KIND,
                    allocated_id: record.id,
                    allocation: record.address,
                    detail: e.to_string(),
                })
            }
        }
    }

    /// Fetches a dynamic IP by id or by address within a subnet.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &IpQuery) -> IpamResult<IpState> {
        lookup_ip(self.client.as_ref(), KIND, query).await
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for DynamicIpReconciler<C> {
    type Desired = DynamicIpSpec;
    type Stored = IpState;
    type Filter = IpFilter;

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn set(&self, id: Option<RemoteId>, desired: &DynamicIpSpec) -> IpamResult<IpState> {
        let stored = match id {
            Some(id) => {
                validate_mask_bits(desired.mask_bits)?;
                let mut record = self
                    .client
                    .get_ip(id)
                    .await
                    .context(KIND, Operation::Get, id)?;
                merge(&mut record, desired);
                self.client
                    .upsert_ip(&record)
                    .await
                    .context(KIND, Operation::Upsert, id)?
            }
            None => {
                let allocation = self.allocate(desired).await?;
                self.persist(allocation, desired).await?.into_inner()
            }
        };
        IpState::from_record(KIND, Operation::Upsert, stored)
    }

    #[instrument(skip(self))]
    async fn read(&self, id: RemoteId) -> IpamResult<IpState> {
        self.lookup(&IpQuery::Id(id)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RemoteId) -> IpamResult<()> {
        self.client
            .delete_ip(id)
            .await
            .context(KIND, Operation::Delete, id)?;
        info!("Released dynamic ip {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &IpFilter) -> IpamResult<Collection<IpState>> {
        list_ips(self.client.as_ref(), KIND, &self.config, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipam_client::RemoteError;
    use ipam_test::{fixtures, FakeInventory};
    use pretty_assertions::assert_eq;

    fn campus() -> (Arc<FakeInventory>, DynamicIpReconciler<FakeInventory>) {
        let fake = Arc::new(FakeInventory::new());
        fixtures::campus::seed(&fake);
        let r = DynamicIpReconciler::new(fake.clone(), ReconcileConfig::default());
        (fake, r)
    }

    fn spec() -> DynamicIpSpec {
        DynamicIpSpec {
            vrf_group_id: Some(RemoteId::new(fixtures::campus::VRF_PROD)),
            subnet_id: Some(RemoteId::new(fixtures::campus::LAB)),
            mask_bits: 24,
        }
    }

    #[tokio::test]
    async fn test_first_set_suggests_then_persists() {
        let (fake, r) = campus();

        let state = r.set(None, &spec()).await.unwrap();

        // .1 is the lab gateway
        assert_eq!(state.address, "10.9.0.2");
        assert_eq!(state.subnet, "10.9.0.0/24");
        assert_eq!(state.vrf_group, "prod");
        assert_eq!(state.vrf_group_id, Some(RemoteId::new(fixtures::campus::VRF_PROD)));
        assert_eq!(fake.call_count("suggest_ip"), 1);
        assert_eq!(fake.call_count("upsert_ip"), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_partial_allocation() {
        let (fake, r) = campus();
        fake.fail_next("upsert_ip", RemoteError::failed("HTTP 500"));

        let err = r.set(None, &spec()).await.unwrap_err();

        assert!(matches!(
            err,
            IpamError::PartialAllocation {
                kind: KIND,
                allocated_id: Some(_),
                ..
            }
        ));
        assert!(err.to_string().contains("10.9.0.2"));
    }

    #[tokio::test]
    async fn test_set_with_id_does_not_suggest_again() {
        let (fake, r) = campus();
        let created = r.set(None, &spec()).await.unwrap();

        let updated = r.set(Some(created.id), &spec()).await.unwrap();

        assert_eq!(updated.address, created.address);
        assert_eq!(fake.call_count("suggest_ip"), 1);
        assert_eq!(fake.call_count("upsert_ip"), 2);
    }

    #[tokio::test]
    async fn test_invalid_mask_makes_no_remote_call() {
        let (fake, r) = campus();
        let desired = DynamicIpSpec {
            mask_bits: -1,
            ..spec()
        };

        let err = r.set(None, &desired).await.unwrap_err();
        assert_eq!(err, IpamError::invalid_prefix_length(-1));
        assert!(fake.calls().is_empty());
    }
}
