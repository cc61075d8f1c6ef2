//! Static subnet reconciler
//!
//! A non-supernet subnet takes two round trips on every set: the first upsert
//! stores the network, the second persists the gateway derived from the
//! network the service returned. Supernets keep the remote gateway.

use std::sync::Arc;

use async_trait::async_trait;
use ipam_client::{InventoryClient, Subnet, SubnetFilter};
use ipam_common::cidr::{derive_gateway, parse_network, validate_mask_bits};
use ipam_common::{
    Collection, EntityKind, IpamResult, Operation, ReconcileConfig, Reconciler, RemoteId,
};
use tracing::{debug, info, instrument};

use crate::remote::RemoteContext;
use crate::types::{SubnetQuery, SubnetSpec, SubnetState};

const KIND: EntityKind = EntityKind::Subnet;

/// Fetches one subnet by any supported key.
pub(crate) async fn lookup_subnet<C: InventoryClient>(
    client: &C,
    kind: EntityKind,
    query: &SubnetQuery,
) -> IpamResult<SubnetState> {
    let record = match query {
        SubnetQuery::Id(id) => client
            .get_subnet(*id)
            .await
            .context(kind, Operation::Get, id)?,
        SubnetQuery::NameAndNetwork { name, network } => client
            .get_subnet_by_name_and_network(name, network)
            .await
            .context(kind, Operation::GetByName, format!("{}@{}", name, network))?,
        SubnetQuery::NameAndVrfGroup { name, vrf_group_id } => client
            .get_subnet_by_name_and_vrf_group(name, *vrf_group_id)
            .await
            .context(kind, Operation::GetByName, name)?,
    };
    debug!("subnet: {:?}", record);
    SubnetState::from_record(kind, Operation::Get, record)
}

/// Lists subnets matching `filter` and fingerprints the result.
pub(crate) async fn list_subnets<C: InventoryClient>(
    client: &C,
    kind: EntityKind,
    config: &ReconcileConfig,
    filter: &SubnetFilter,
) -> IpamResult<Collection<SubnetState>> {
    let records = client
        .list_subnets(filter)
        .await
        .context(kind, Operation::List, format!("{:?}", filter))?;
    debug!("{} subnets match {:?}", records.len(), filter);

    let items = records
        .into_iter()
        .map(|record| SubnetState::from_record(kind, Operation::List, record))
        .collect::<IpamResult<Vec<_>>>()?;
    Ok(Collection::new(items, config.fingerprint_order))
}

/// Reconciles statically-addressed subnets
pub struct SubnetReconciler<C> {
    client: Arc<C>,
    config: ReconcileConfig,
}

impl<C: InventoryClient> SubnetReconciler<C> {
    /// Create a new SubnetReconciler
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self { client, config }
    }

    /// Fetches a subnet by id, name and network, or name and VRF group.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &SubnetQuery) -> IpamResult<SubnetState> {
        lookup_subnet(self.client.as_ref(), KIND, query).await
    }
}

#[async_trait]
impl<C: InventoryClient> Reconciler for SubnetReconciler<C> {
    type Desired = SubnetSpec;
    type Stored = SubnetState;
    type Filter = SubnetFilter;

    fn kind(&self) -> EntityKind {
        KIND
    }

    #[instrument(skip(self, desired), fields(name = %desired.name, network = %desired.network))]
    async fn set(&self, id: Option<RemoteId>, desired: &SubnetSpec) -> IpamResult<SubnetState> {
        let mask_bits = validate_mask_bits(desired.mask_bits)?;
        parse_network(&desired.network, desired.mask_bits)?;

        // Updates merge onto the stored record; service-owned fields must survive.
        let mut record = match id {
            Some(id) => {
                let current = self
                    .client
                    .get_subnet(id)
                    .await
                    .context(KIND, Operation::Get, id)?;
                debug!("subnet: {:?}", current);
                current
            }
            None => Subnet::default(),
        };
        record.name = desired.name.clone();
        record.network = desired.network.clone();
        record.mask_bits = mask_bits;
        record.vrf_group_id = desired.vrf_group_id;
        record.is_supernet = desired.is_supernet;
        record.tags = desired.tags.clone();
        let mut stored = self
            .client
            .upsert_subnet(&record)
            .await
            .context(KIND, Operation::Upsert, &desired.name)?;
        debug!("subnet: {:?}", stored);

        if !desired.is_supernet {
            stored.gateway = derive_gateway(&stored.network)?;
            info!("Derived gateway {} for subnet {}", stored.gateway, stored.cidr());
            stored = self
                .client
                .upsert_subnet(&stored)
                .await
                .context(KIND, Operation::Upsert, &desired.name)?;
            debug!("subnet: {:?}", stored);
        }

        let state = SubnetState::from_record(KIND, Operation::Upsert, stored)?;
        if id.is_none() {
            info!("Created subnet {} ({}) with id {}", state.name, state.cidr(), state.id);
        }
        Ok(state)
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
        info!("Deleted subnet {}", id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, filter: &SubnetFilter) -> IpamResult<Collection<SubnetState>> {
        list_subnets(self.client.as_ref(), KIND, &self.config, filter).await
    }
}
