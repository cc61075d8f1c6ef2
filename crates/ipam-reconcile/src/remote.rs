//! Facade error context

use ipam_client::RemoteResult;
use ipam_common::{EntityKind, IpamResult, Operation};

/// Attaches entity kind, operation and lookup key to a facade result.
pub(crate) trait RemoteContext<T> {
    fn context(self, kind: EntityKind, operation: Operation, key: impl ToString)
        -> IpamResult<T>;
}

impl<T> RemoteContext<T> for RemoteResult<T> {
    fn context(
        self,
        kind: EntityKind,
        operation: Operation,
        key: impl ToString,
    ) -> IpamResult<T> {
        self.map_err(|e| e.into_ipam(kind, operation, key))
    }
}
