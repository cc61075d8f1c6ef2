//! Two-phase allocation result for dynamic subnets and IPs

/// Outcome of a dynamic allocation.
///
/// The remote service first reserves a block or address (`Allocated`), then
/// the reconciler writes the caller's metadata onto it (`Persisted`). Keeping
/// the phases apart lets a caller see exactly what was reserved when the
/// persist step fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation<T> {
    /// Reserved remotely, metadata not yet written
    Allocated(T),
    /// Reserved and persisted
    Persisted(T),
}

impl<T> Allocation<T> {
    /// Returns the record regardless of phase.
    pub fn record(&self) -> &T {
        match self {
            Allocation::Allocated(record) | Allocation::Persisted(record) => record,
        }
    }

    /// Consumes the allocation, returning the record.
    pub fn into_inner(self) -> T {
        match self {
            Allocation::Allocated(record) | Allocation::Persisted(record) => record,
        }
    }

    /// Returns true once the record has been written back.
    pub fn is_persisted(&self) -> bool {
        matches!(self, Allocation::Persisted(_))
    }
}
