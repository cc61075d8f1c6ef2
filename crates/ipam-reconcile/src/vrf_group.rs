//! VRF group reconciler
//!
//! The remote service records group membership by building name while callers
//! refer to buildings by id. Every write resolves ids to names and every read
//! resolves names back to ids, one call per building, in member order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{InventoryClient, VrfGroup};
use ipam_common::{
    Collection, EntityKind, IpamError, IpamResult, Operation, ReconcileConfig, Reconciler,
    RemoteId,
};
use tracing::{debug, info, instrument};

use crate::remote::RemoteContext;
use crate::types::{require_id, VrfGroupQuery, VrfGroupSpec, VrfGroupState};

const KIND: EntityKind = EntityKind::VrfGroup;

/// Reconciles VRF groups, translating member building ids and names
pub struct VrfGroupReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> VrfGroupReconciler<C> {
    /// Create a new VrfGroupReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Fetches a VRF group by id or by name.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &VrfGroupQuery) -> IpamResult<VrfGroupState> {
        let record = match query {
            VrfGroupQuery::Id(id) => self.client.get_vrf_group(*id).await.context(
                KIND,
                Operation::Get,
                id,
            )?,
            VrfGroupQuery::Name(name) => self
                .client
                .get_vrf_group_by_name(name)
                .await
                .context(KIND, Operation::GetByName, name)?,
        };
        debug!("vrf group: {:?}", record);
        self.normalize(record, Operation::Get).await
    }

    /// Resolves building ids to names, sequentially and in order.
    async fn building_names(&self, ids: &[RemoteId]) -> IpamResult<Vec<String>> {
        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            let building = self
                .client
                .get_building(*id)
                .await
                .context(EntityKind::Building, Operation::Get, id)?;
            names.push(building.name);
        }
        Ok(names)
    }

    /// Resolves building names to ids, sequentially and in order.
    async fn building_ids(&self, names: &[String]) -> IpamResult<Vec<RemoteId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let building = self
                .client
                .get_building_by_name(name)
                .await
                .context(EntityKind::Building, Operation::GetByName, name)?;
            ids.push(require_id(
                EntityKind::Building,
                Operation::GetByName,
                building.id,
            )?);
        }
        Ok(ids)
    }

    async fn normalize(&self, record: VrfGroup, operation: Operation) -> IpamResult<VrfGroupState> {
        let id = require_id(KIND, operation, record.id)?;
        let building_ids = self.building_ids(&record.buildings).await?;
        Ok(VrfGroupState {
            id,
            name: record.name,
            description: record.description,
            building_ids,
            buildings: record.buildings,
        })
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for VrfGroupReconciler<C> {
    type Desired = VrfGroupSpec;
    type Stored = VrfGroupState;
    type Filter = ();

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self, desired), fields(name = %desired.name))]
    async fn set(&self, id: Option<RemoteId>, desired: &VrfGroupSpec) -> IpamResult<VrfGroupState> {
        let buildings = self.building_names(&desired.building_ids).await?;
        debug!("vrf group {} spans {:?}", desired.name, buildings);

        let record = VrfGroup {
            id,
            name: desired.name.clone(),
            description: desired.description.clone(),
            buildings,
        };
        let stored = self
            .client
            .upsert_vrf_group(&record)
            .await
            .context(KIND, Operation::Upsert, &desired.name)?;
        debug!("vrf group: {:?}", stored);

        let state = self.normalize(stored, Operation::Upsert).await?;
        if id.is_none() {
            info!("Created vrf group {} with id {}", state.name, state.id);
        }
        Ok(state)
    }

    #[instrument(skip(self))]
    async fn read(&self, id: RemoteId) -> IpamResult<VrfGroupState> {
        self.lookup(&VrfGroupQuery::Id(id)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RemoteId) -> IpamResult<()> {
        self.client
            .delete_vrf_group(id)
            .await
            .context(KIND, Operation::Delete, id)?;
        info!("Deleted vrf group {}", id);
        Ok(())
    }

    /// Lists every group, resolving member names with a single building listing.
    #[instrument(skip(self, _filter))]
    async fn list(&self, _filter: &()) -> IpamResult<Collection<VrfGroupState>> {
        let records = self
            .client
            .list_vrf_groups()
            .await
            .context(KIND, Operation::List, "*")?;
        let buildings = self
            .client
            .list_buildings()
            .await
            .context(EntityKind::Building, Operation::List, "*")?;
        debug!("{} vrf groups over {} buildings", records.len(), buildings.len());

        let by_name: HashMap<String, Option<RemoteId>> =
            buildings.into_iter().map(|b| (b.name, b.id)).collect();

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let id = require_id(KIND, Operation::List, record.id)?;
            let building_ids = record
                .buildings
                .iter()
                .map(|name| match by_name.get(name) {
                    Some(id) => require_id(EntityKind::Building, Operation::List, *id),
                    None => Err(IpamError::not_found(
                        EntityKind::Building,
                        name,
                        format!("member of vrf group {}", record.name),
                    )),
                })
                .collect::<IpamResult<Vec<_>>>()?;
            items.push(VrfGroupState {
                id,
                name: record.name,
                description: record.description,
                building_ids,
                buildings: record.buildings,
            });
        }
        Ok(Collection::new(items, self.config.fingerprint_order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipam_client::RemoteError;
    use ipam_test::{fixtures, CallLogVerifier, FakeInventory};
    use pretty_assertions::assert_eq;

    fn seeded() -> (Arc<FakeInventory>, VrfGroupReconciler<FakeInventory>) {
        let fake = Arc::new(FakeInventory::new());
        fake.seed_building(fixtures::building(1, "HQ"));
        fake.seed_building(fixtures::building(2, "DC1"));
        fake.seed_building(fixtures::building(3, "DC2"));
        let r = VrfGroupReconciler::new(fake.clone(), ReconcileConfig::default());
        (fake, r)
    }

    #[tokio::test]
    async fn test_set_resolves_building_names_in_order() {
        let (fake, r) = seeded();
        let spec = VrfGroupSpec {
            name: "prod".to_string(),
            description: String::new(),
            building_ids: vec![RemoteId::new(3), RemoteId::new(1)],
        };

        let state = r.set(None, &spec).await.unwrap();

        assert_eq!(state.buildings, vec!["DC2".to_string(), "HQ".to_string()]);
        assert_eq!(state.building_ids, vec![RemoteId::new(3), RemoteId::new(1)]);

        let verifier = CallLogVerifier::new(fake.calls());
        verifier.assert_order("get_building 3", "get_building 1").unwrap();
        verifier.assert_order("get_building 1", "upsert_vrf_group").unwrap();
    }

    #[tokio::test]
    async fn test_unknown_building_stops_before_upsert() {
        let (fake, r) = seeded();
        let spec = VrfGroupSpec {
            name: "prod".to_string(),
            description: String::new(),
            building_ids: vec![RemoteId::new(1), RemoteId::new(99)],
        };

        let err = r.set(None, &spec).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(fake.call_count("upsert_vrf_group"), 0);
    }

    #[tokio::test]
    async fn test_read_resolves_names_to_ids() {
        let (fake, r) = seeded();
        fake.seed_vrf_group(fixtures::vrf_group(7, "prod", &["DC1", "HQ"]));

        let state = r.read(RemoteId::new(7)).await.unwrap();
        assert_eq!(state.building_ids, vec![RemoteId::new(2), RemoteId::new(1)]);
        assert_eq!(fake.call_count("get_building_by_name"), 2);
    }

    #[tokio::test]
    async fn test_list_uses_one_building_listing() {
        let (fake, r) = seeded();
        fake.seed_vrf_group(fixtures::vrf_group(7, "prod", &["HQ"]));
        fake.seed_vrf_group(fixtures::vrf_group(8, "lab", &["DC1", "DC2"]));

        let groups = r.list(&()).await.unwrap();

        assert_eq!(groups.ids(), vec![RemoteId::new(7), RemoteId::new(8)]);
        assert_eq!(groups.items[1].building_ids, vec![RemoteId::new(2), RemoteId::new(3)]);
        assert_eq!(fake.call_count("list_buildings"), 1);
        assert_eq!(fake.call_count("get_building_by_name"), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_surfaces() {
        let (fake, r) = seeded();
        fake.fail_next("delete_vrf_group", RemoteError::failed("HTTP 409"));

        let err = r.delete(RemoteId::new(7)).await.unwrap_err();
        assert_eq!(err, IpamError::remote(KIND, Operation::Delete, "HTTP 409"));
    }
}
