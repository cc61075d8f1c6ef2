//! Static IP reconciler

use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{InventoryClient, IpAddress, IpFilter};
use ipam_common::{
    Collection, EntityKind, IpamError, IpamResult, Operation, ReconcileConfig, Reconciler,
    RemoteId,
};
use tracing::{debug, info, instrument};

use crate::remote::RemoteContext;
use crate::types::{IpQuery, IpSpec, IpState};

const KIND: EntityKind = EntityKind::Ip;

pub(crate) async fn lookup_ip<C: InventoryClient>(
    client: &C,
    kind: EntityKind,
    query: &IpQuery,
) -> IpamResult<IpState> {
    let record = match query {
        IpQuery::Id(id) => client.get_ip(*id).await.context(kind, Operation::Get, id)?,
        IpQuery::AddressInSubnet { address, subnet_id } => client
            .get_ip_by_address(address, *subnet_id)
            .await
            .context(kind, Operation::GetByName, format!("{}@{}", address, subnet_id))?,
    };
    debug!("ip: {:?}", record);
    IpState::from_record(kind, Operation::Get, record)
}

pub(crate) async fn list_ips<C: InventoryClient>(
    client: &C,
    kind: EntityKind,
    config: &ReconcileConfig,
    filter: &IpFilter,
) -> IpamResult<Collection<IpState>> {
    let records = client
        .list_ips(filter)
        .await
        .context(kind, Operation::List, format!("{:?}", filter))?;
    debug!("{} ips match {:?}", records.len(), filter);

    let items = records
        .into_iter()
        .map(|record| IpState::from_record(kind, Operation::List, record))
        .collect::<IpamResult<Vec<_>>>()?;
    Ok(Collection::new(items, config.fingerprint_order))
}

/// Reconciles statically-assigned IP addresses
pub struct IpReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> IpReconciler<C> {
    /// Create a new IpReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Fetches an IP by id or by address within a subnet.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &IpQuery) -> IpamResult<IpState> {
        lookup_ip(self.client.as_ref(), KIND, query).await
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for IpReconciler<C> {
    type Desired = IpSpec;
    type Stored = IpState;
    type Filter = IpFilter;

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn set(&self, id: Option<RemoteId>, desired: &IpSpec) -> IpamResult<IpState> {
        desired
            .address
            .parse::<Ipv4Addr>()
            .map_err(|e| IpamError::invalid_network(&desired.address, e.to_string()))?;

        let record = IpAddress {
            id,
            address: desired.address.clone(),
            label: desired.label.clone(),
            subnet_id: Some(desired.subnet_id),
            ..Default::default()
        };
        let stored = self
            .client
            .upsert_ip(&record)
            .await
            .context(KIND, Operation::Upsert, &desired.address)?;
        debug!("ip: {:?}", stored);

        let state = IpState::from_record(KIND, Operation::Upsert, stored)?;
        if id.is_none() {
            info!("Created ip {} with id {}", state.address, state.id);
        }
        Ok(state)
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
        info!("Deleted ip {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &IpFilter) -> IpamResult<Collection<IpState>> {
        list_ips(self.client.as_ref(), KIND, &self.config, filter).await
    }
}
