//! Prefix (CIDR block) data model.

use super::{IpNetwork, LocationId, NamespaceId, PrefixId};
use crate::error::{IpamError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a prefix is used; drives utilization and address reservation rules.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrefixType {
    /// Pure grouping, not a usable network.
    Container,
    #[default]
    Network,
    /// Whole range usable, network and broadcast included (e.g. NAT pools).
    Pool,
}

impl fmt::Display for PrefixType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixType::Container => write!(f, "container"),
            PrefixType::Network => write!(f, "network"),
            PrefixType::Pool => write!(f, "pool"),
        }
    }
}

impl FromStr for PrefixType {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" => Ok(PrefixType::Container),
            "network" => Ok(PrefixType::Network),
            "pool" => Ok(PrefixType::Pool),
            other => Err(IpamError::Parse(format!("unknown prefix type '{other}'"))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PrefixStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
}

/// A CIDR block in the containment tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    pub id: PrefixId,
    /// Canonical network (host bits zeroed).
    #[serde(with = "super::network::packed")]
    pub prefix: IpNetwork,
    #[serde(rename = "type")]
    pub prefix_type: PrefixType,
    pub status: PrefixStatus,
    pub namespace: NamespaceId,
    pub location: Option<LocationId>,
    /// Smallest enclosing prefix in the namespace, maintained by the tree.
    pub parent: Option<PrefixId>,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix)
    }
}

/// Caller-settable prefix attributes for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixAttrs {
    pub prefix: IpNetwork,
    pub prefix_type: PrefixType,
    pub status: PrefixStatus,
    /// `None` selects the default namespace.
    pub namespace: Option<NamespaceId>,
    pub location: Option<LocationId>,
    pub description: String,
}

impl PrefixAttrs {
    pub fn new(prefix: IpNetwork) -> Self {
        PrefixAttrs {
            prefix,
            prefix_type: PrefixType::default(),
            status: PrefixStatus::default(),
            namespace: None,
            location: None,
            description: String::new(),
        }
    }

    /// Parse a CIDR string into attributes with default type and status.
    pub fn parse(cidr: &str) -> Result<Self> {
        Ok(PrefixAttrs::new(cidr.parse()?))
    }

    pub fn with_type(mut self, prefix_type: PrefixType) -> Self {
        self.prefix_type = prefix_type;
        self
    }

    pub fn with_status(mut self, status: PrefixStatus) -> Self {
        self.status = status;
        self
    }

    pub fn in_namespace(mut self, namespace: NamespaceId) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn at_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }
}

impl From<&Prefix> for PrefixAttrs {
    fn from(p: &Prefix) -> Self {
        PrefixAttrs {
            prefix: p.prefix,
            prefix_type: p.prefix_type,
            status: p.status,
            namespace: Some(p.namespace),
            location: p.location,
            description: p.description.clone(),
        }
    }
}
