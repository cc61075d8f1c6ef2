//! Building reconciler

use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{Building, InventoryClient};
use ipam_common::{
    Collection, EntityKind, IpamResult, Operation, ReconcileConfig, Reconciler, RemoteId,
};
use tracing::{debug, info, instrument};

use crate::remote::RemoteContext;
use crate::types::{BuildingQuery, BuildingSpec, BuildingState};

const KIND: EntityKind = EntityKind::Building;

/// Reconciles buildings with plain upserts
pub struct BuildingReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> BuildingReconciler<C> {
    /// Create a new BuildingReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Fetches a building by id or by name.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &BuildingQuery) -> IpamResult<BuildingState> {
        let record = match query {
            BuildingQuery::Id(id) => self.client.get_building(*id).await.context(
                KIND,
                Operation::Get,
                id,
            )?,
            BuildingQuery::Name(name) => self
                .client
                .get_building_by_name(name)
                .await
                .context(KIND, Operation::GetByName, name)?,
        };
        debug!("building: {:?}", record);
        BuildingState::from_record(record, Operation::Get)
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for BuildingReconciler<C> {
    type Desired = BuildingSpec;
    type Stored = BuildingState;
    type Filter = ();

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self, desired), fields(name = %desired.name))]
    async fn set(&self, id: Option<RemoteId>, desired: &BuildingSpec) -> IpamResult<BuildingState> {
        let record = Building {
            id,
            name: desired.name.clone(),
            address: desired.address.clone(),
            notes: desired.notes.clone(),
        };

        let stored = self
            .client
            .upsert_building(&record)
            .await
            .context(KIND, Operation::Upsert, &desired.name)?;
        debug!("building: {:?}", stored);

        let state = BuildingState::from_record(stored, Operation::Upsert)?;
        if id.is_none() {
            info!("Created building {} with id {}", state.name, state.id);
        }
        Ok(state)
    }

    #[instrument(skip(self))]
    async fn read(&self, id: RemoteId) -> IpamResult<BuildingState> {
        self.lookup(&BuildingQuery::Id(id)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RemoteId) -> IpamResult<()> {
        self.client
            .delete_building(id)
            .await
            .context(KIND, Operation::Delete, id)?;
        info!("Deleted building {}", id);
        Ok(())
    }

    #[instrument(skip(self, _filter))]
    async fn list(&self, _filter: &()) -> IpamResult<Collection<BuildingState>> {
        let records = self
            .client
            .list_buildings()
            .await
            .context(KIND, Operation::List, "*")?;
        debug!("{} buildings", records.len());

        let items = records
            .into_iter()
            .map(|record| BuildingState::from_record(record, Operation::List))
            .collect::<IpamResult<Vec<_>>>()?;
        Ok(Collection::new(items, self.config.fingerprint_order))
    }
}
