//! Entity kinds, facade operations and remote identity.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::IpamError;

/// Entity kinds handled by the reconcilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Physical building referenced by VRF groups.
    Building,
    /// Named routing/addressing scope.
    VrfGroup,
    /// Explicitly described subnet.
    Subnet,
    /// Subnet carved out of a parent pool by the remote service.
    DynamicSubnet,
    /// VLAN record.
    Vlan,
    /// Explicitly described IP address.
    Ip,
    /// IP address suggested by the remote service.
    DynamicIp,
}

impl EntityKind {
    /// Returns the kind name as used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Building => "building",
            EntityKind::VrfGroup => "vrf_group",
            EntityKind::Subnet => "subnet",
            EntityKind::DynamicSubnet => "dynamic_subnet",
            EntityKind::Vlan => "vlan",
            EntityKind::Ip => "ip",
            EntityKind::DynamicIp => "dynamic_ip",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facade operations, named in errors so a failure identifies the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Fetch by remote id.
    Get,
    /// Fetch by name (or another natural key).
    GetByName,
    /// Fetch a filtered collection.
    List,
    /// Create-or-update.
    Upsert,
    /// Delete by remote id.
    Delete,
    /// Ask the remote service for the next free subnet.
    SuggestSubnet,
    /// Ask the remote service for the next free address.
    SuggestIp,
}

impl Operation {
    /// Returns the operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::GetByName => "get-by-name",
            Operation::List => "list",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::SuggestSubnet => "suggest-subnet",
            Operation::SuggestIp => "suggest-ip",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable numeric id assigned by the remote service on first creation.
///
/// Never zero. The resource handle form is the decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteId(u64);

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u64::deserialize(deserializer)? {
            0 => Err(de::Error::invalid_value(
                de::Unexpected::Unsigned(0),
                &"a non-zero remote id",
            )),
            id => Ok(Self(id)),
        }
    }
}

impl RemoteId {
    /// Wraps a raw remote id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(IpamError::InvalidIdentity {
                value: s.to_string(),
            }),
            Ok(id) => Ok(Self(id)),
        }
    }
}

impl From<u64> for RemoteId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_names() {
        assert_eq!(EntityKind::VrfGroup.as_str(), "vrf_group");
        assert_eq!(EntityKind::DynamicIp.to_string(), "dynamic_ip");
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::SuggestSubnet.as_str(), "suggest-subnet");
        assert_eq!(Operation::GetByName.to_string(), "get-by-name");
    }

    #[test]
    fn test_remote_id_parse() {
        assert_eq!("42".parse::<RemoteId>().unwrap(), RemoteId::new(42));
        assert_eq!(RemoteId::new(42).to_string(), "42");
    }

    #[test]
    fn test_remote_id_rejects_zero_and_garbage() {
        assert!(matches!(
            "0".parse::<RemoteId>(),
            Err(IpamError::InvalidIdentity { .. })
        ));
        assert!("abc".parse::<RemoteId>().is_err());
        assert!("".parse::<RemoteId>().is_err());
        assert!("-3".parse::<RemoteId>().is_err());
    }

    #[test]
    fn test_remote_id_deserialize_rejects_zero() {
        assert_eq!(serde_yaml::from_str::<RemoteId>("42").unwrap(), RemoteId::new(42));
        assert!(serde_yaml::from_str::<RemoteId>("0").is_err());
        assert!(serde_yaml::from_str::<Option<RemoteId>>("0").is_err());
        assert_eq!(serde_yaml::from_str::<Option<RemoteId>>("~").unwrap(), None);
    }
}
