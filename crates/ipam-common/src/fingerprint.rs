//! Synthetic identity for list results.
//!
//! A list query has no remote id of its own, so its handle is a digest of the
//! member ids. The digest is only an identity; nothing relies on it for
//! integrity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::kind::RemoteId;

/// How member ids are ordered before hashing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintOrder {
    /// Hash ids in the order the facade returned them.
    ///
    /// The same set enumerated in a different order yields a different value.
    #[default]
    AsReturned,
    /// Sort ids ascending before hashing, making the value order-independent.
    Sorted,
}

impl FingerprintOrder {
    /// Returns the configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintOrder::AsReturned => "as_returned",
            FingerprintOrder::Sorted => "sorted",
        }
    }
}

/// Fingerprints ids in iteration order.
///
/// Concatenates the decimal text of every id and renders the SHA-256 digest
/// as lowercase hex.
pub fn fingerprint<I>(ids: I) -> String
where
    I: IntoIterator<Item = RemoteId>,
{
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Fingerprints ids using the given ordering policy.
pub fn fingerprint_with<I>(order: FingerprintOrder, ids: I) -> String
where
    I: IntoIterator<Item = RemoteId>,
{
    match order {
        FingerprintOrder::AsReturned => fingerprint(ids),
        FingerprintOrder::Sorted => {
            let mut sorted: Vec<RemoteId> = ids.into_iter().collect();
            sorted.sort_unstable();
            fingerprint(sorted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<RemoteId> {
        raw.iter().copied().map(RemoteId::new).collect()
    }

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(fingerprint(ids(&[5, 3, 9])), fingerprint(ids(&[5, 3, 9])));
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(ids(&[11, 22, 33]));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_tracks_membership() {
        assert_ne!(fingerprint(ids(&[11, 22, 33])), fingerprint(ids(&[11, 22])));
    }

    #[test]
    fn test_empty_collection() {
        // SHA-256 of the empty string
        assert_eq!(
            fingerprint(Vec::new()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sorted_order_is_order_independent() {
        assert_eq!(
            fingerprint_with(FingerprintOrder::Sorted, ids(&[5, 3, 9])),
            fingerprint_with(FingerprintOrder::Sorted, ids(&[9, 3, 5]))
        );
        assert_eq!(
            fingerprint_with(FingerprintOrder::Sorted, ids(&[9, 3, 5])),
            fingerprint(ids(&[3, 5, 9]))
        );
    }

    #[test]
    fn test_as_returned_matches_plain_fingerprint() {
        assert_eq!(
            fingerprint_with(FingerprintOrder::AsReturned, ids(&[9, 3, 5])),
            fingerprint(ids(&[9, 3, 5]))
        );
    }
}
