//! Caller-side resource handle
//!
//! A declarative front-end tracks each resource as an opaque decimal id plus
//! a flat attribute map. `Resource` holds that identity across apply,
//! refresh and destroy so the front-end never handles `RemoteId` directly.

use ipam_common::{IpamError, IpamResult, Identified, Reconciler, RemoteId};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// One managed resource and its last known remote state
pub struct Resource<R: Reconciler> {
    reconciler: R,
    id: Option<RemoteId>,
    state: Option<R::Stored>,
}

impl<R: Reconciler> Resource<R> {
    /// Creates a handle for a resource that does not exist yet.
    pub fn new(reconciler: R) -> Self {
        Self {
            reconciler,
            id: None,
            state: None,
        }
    }

    /// Restores a handle from its decimal identity text.
    ///
    /// Empty text means the resource was never created. Anything else must be
    /// a positive decimal integer.
    pub fn from_id_text(reconciler: R, text: &str) -> IpamResult<Self> {
        let id = if text.trim().is_empty() {
            None
        } else {
            Some(text.parse::<RemoteId>()?)
        };
        Ok(Self {
            reconciler,
            id,
            state: None,
        })
    }

    /// Returns the remote identity, if the resource exists.
    pub fn id(&self) -> Option<RemoteId> {
        self.id
    }

    /// Returns the identity as decimal text, empty when unset.
    pub fn id_text(&self) -> String {
        self.id.map(|id| id.to_string()).unwrap_or_default()
    }

    /// Returns the last state seen by apply or refresh.
    pub fn state(&self) -> Option<&R::Stored> {
        self.state.as_ref()
    }

    /// Returns the reconciler backing this handle.
    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    /// Creates or updates the resource and records its identity.
    #[instrument(skip(self, desired), fields(kind = %self.reconciler.kind(), id = %self.id_text()))]
    pub async fn apply(&mut self, desired: &R::Desired) -> IpamResult<&R::Stored> {
        let stored = self.reconciler.set(self.id, desired).await?;
        self.id = Some(stored.remote_id());
        Ok(self.state.insert(stored))
    }

    /// Re-reads the resource from the remote service.
    #[instrument(skip(self), fields(kind = %self.reconciler.kind(), id = %self.id_text()))]
    pub async fn refresh(&mut self) -> IpamResult<&R::Stored> {
        let id = self.require_id()?;
        let stored = self.reconciler.read(id).await?;
        Ok(self.state.insert(stored))
    }

    /// Deletes the resource.
    ///
    /// The identity is cleared only on success. On any error, including
    /// not-found, it is kept and the caller decides what to do.
    #[instrument(skip(self), fields(kind = %self.reconciler.kind(), id = %self.id_text()))]
    pub async fn destroy(&mut self) -> IpamResult<()> {
        let id = self.require_id()?;
        self.reconciler.delete(id).await?;
        debug!("cleared identity {}", id);
        self.id = None;
        self.state = None;
        Ok(())
    }

    fn require_id(&self) -> IpamResult<RemoteId> {
        self.id.ok_or_else(|| IpamError::InvalidIdentity {
            value: String::new(),
        })
    }
}

impl<R> Resource<R>
where
    R: Reconciler,
    R::Stored: Serialize,
{
    /// Returns the last known state as a flat attribute map.
    pub fn attributes(&self) -> serde_json::Result<Map<String, Value>> {
        let Some(state) = &self.state else {
            return Ok(Map::new());
        };
        match serde_json::to_value(state)? {
            Value::Object(map) => Ok(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Ok(map)
            }
        }
    }
}
