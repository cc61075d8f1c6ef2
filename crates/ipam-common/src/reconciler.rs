//! Reconciler trait and list-result collection.
//!
//! Every entity kind exposes the same capability set (set, read, delete,
//! list) over its own desired/stored payloads. Concrete reconcilers live in
//! `ipam-reconcile`; this module only fixes the contract.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::IpamResult;
use crate::fingerprint::{fingerprint_with, FingerprintOrder};
use crate::kind::{EntityKind, RemoteId};

/// Stored state that carries its remote identity.
pub trait Identified {
    /// Returns the remote id of this record.
    fn remote_id(&self) -> RemoteId;
}

/// Normalized list result plus its synthetic identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection<T> {
    /// Fingerprint over the member ids.
    pub id: String,
    /// Members in the order the facade returned them.
    pub items: Vec<T>,
}

impl<T: Identified> Collection<T> {
    /// Builds a collection, fingerprinting member ids under `order`.
    pub fn new(items: Vec<T>, order: FingerprintOrder) -> Self {
        let id = fingerprint_with(order, items.iter().map(Identified::remote_id));
        Self { id, items }
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the collection has no members.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the member ids in collection order.
    pub fn ids(&self) -> Vec<RemoteId> {
        self.items.iter().map(Identified::remote_id).collect()
    }
}

/// Reconciles one entity kind against the remote inventory.
///
/// Each call is self-contained: implementations hold no mutable state between
/// calls and issue their remote calls sequentially.
///
/// # Example
///
/// ```ignore
/// use ipam_common::{Reconciler, RemoteId};
///
/// async fn ensure<R: Reconciler>(r: &R, id: Option<RemoteId>, desired: &R::Desired) {
///     match r.set(id, desired).await {
///         Ok(_) => tracing::info!("{} reconciled", r.kind()),
///         Err(e) => tracing::error!("{} failed: {}", r.kind(), e),
///     }
/// }
/// ```
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Desired attribute set supplied by the caller.
    type Desired: Send + Sync;

    /// Normalized state returned to the caller.
    type Stored: Identified + Send;

    /// Filter accepted by [`Reconciler::list`].
    type Filter: Send + Sync;

    /// Entity kind handled by this reconciler.
    fn kind(&self) -> EntityKind;

    /// Creates or updates the entity.
    ///
    /// `id` is absent on the first call and present on every later one.
    async fn set(&self, id: Option<RemoteId>, desired: &Self::Desired)
        -> IpamResult<Self::Stored>;

    /// Fetches the entity by remote id.
    async fn read(&self, id: RemoteId) -> IpamResult<Self::Stored>;

    /// Deletes the entity by remote id.
    async fn delete(&self, id: RemoteId) -> IpamResult<()>;

    /// Fetches a filtered collection and fingerprints it.
    async fn list(&self, filter: &Self::Filter) -> IpamResult<Collection<Self::Stored>>;
}
