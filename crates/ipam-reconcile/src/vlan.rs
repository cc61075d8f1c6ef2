//! VLAN reconciler

use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{InventoryClient, Vlan};
use ipam_common::{
    Collection, EntityKind, IpamResult, Operation, ReconcileConfig, Reconciler, RemoteId,
};
use tracing::{debug, info, instrument};

use crate::remote::RemoteContext;
use crate::types::{VlanQuery, VlanSpec, VlanState};

const KIND: EntityKind = EntityKind::Vlan;

pub struct VlanReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> VlanReconciler<C> {
    /// Create a new VlanReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &VlanQuery) -> IpamResult<VlanState> {
        let record = match query {
            VlanQuery::Id(id) => self
                .client
                .get_vlan(*id)
                .await
                .context(KIND, Operation::Get, id)?,
            VlanQuery::Name(name) => self
                .client
                .get_vlan_by_name(name)
                .await
                .context(KIND, Operation::GetByName, name)?,
        };
        debug!("vlan: {:?}", record);
        VlanState::from_record(record, Operation::Get)
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for VlanReconciler<C> {
    type Desired = VlanSpec;
    type Stored = VlanState;
    type Filter = ();

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn set(&self, id: Option<RemoteId>, desired: &VlanSpec) -> IpamResult<VlanState> {
        let record = Vlan {
            id,
            name: desired.name.clone(),
            number: desired.number,
            tags: desired.tags.clone(),
        };
        let stored = self
            .client
            .upsert_vlan(&record)
            .await
            .context(KIND, Operation::Upsert, desired.number)?;
        debug!("vlan: {:?}", stored);

        let state = VlanState::from_record(stored, Operation::Upsert)?;
        if id.is_none() {
            info!("Created vlan {} ({}) with id {}", state.number, state.name, state.id);
        }
        Ok(state)
    }

    #[instrument(skip(self))]
    async fn read(&self, id: RemoteId) -> IpamResult<VlanState> {
        self.lookup(&VlanQuery::Id(id)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: RemoteId) -> IpamResult<()> {
        self.client
            .delete_vlan(id)
            .await
            .context(KIND, Operation::Delete, id)?;
        info!("Deleted vlan {}", id);
        Ok(())
    }

    #[instrument(skip(self, _filter))]
    async fn list(&self, _filter: &()) -> IpamResult<Collection<VlanState>> {
        let records = self
            .client
            .list_vlans()
            .await
            .context(KIND, Operation::List, "*")?;
        let items = records
            .into_iter()
            .map(|record| VlanState::from_record(record, Operation::List))
            .collect::<IpamResult<Vec<_>>>()?;
        Ok(Collection::new(items, self.config.fingerprint_order))
    }
}
