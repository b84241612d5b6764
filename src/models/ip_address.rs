//! Individual IP address data model.

use super::{EndpointId, IpAddressId, IpNetwork, NamespaceId, PrefixId};
use crate::error::{IpamError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Functional role of an address. Duplicates are allowed only across roles.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IpAddressRole {
    Loopback,
    Secondary,
    Anycast,
    Vip,
    Vrrp,
    Hsrp,
    Glbp,
    Carp,
}

impl FromStr for IpAddressRole {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loopback" => Ok(IpAddressRole::Loopback),
            "secondary" => Ok(IpAddressRole::Secondary),
            "anycast" => Ok(IpAddressRole::Anycast),
            "vip" => Ok(IpAddressRole::Vip),
            "vrrp" => Ok(IpAddressRole::Vrrp),
            "hsrp" => Ok(IpAddressRole::Hsrp),
            "glbp" => Ok(IpAddressRole::Glbp),
            "carp" => Ok(IpAddressRole::Carp),
            other => Err(IpamError::Parse(format!("unknown address role '{other}'"))),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IpAddressStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
    Dhcp,
    Slaac,
}

/// A host address. `address` keeps its host bits and the mask length of its subnet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IpAddress {
    pub id: IpAddressId,
    #[serde(with = "super::network::packed")]
    pub address: IpNetwork,
    pub namespace: NamespaceId,
    /// Smallest prefix containing the host, maintained by the tree.
    pub parent: Option<PrefixId>,
    pub role: Option<IpAddressRole>,
    pub status: IpAddressStatus,
    pub endpoint: Option<EndpointId>,
    /// Outside (NAT) addresses owned by this inside address, in creation order.
    #[serde(default)]
    pub nat_outside: Vec<IpAddressId>,
    #[serde(default)]
    pub dns_name: String,
    #[serde(default)]
    pub description: String,
    pub created: DateTime<Utc>,
}

impl IpAddress {
    /// The host as a full-length network (/32 or /128).
    pub fn host(&self) -> IpNetwork {
        IpNetwork::host(self.address.addr())
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Caller-settable address attributes for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpAddressAttrs {
    pub address: IpNetwork,
    /// `None` selects the default namespace.
    pub namespace: Option<NamespaceId>,
    pub role: Option<IpAddressRole>,
    pub status: IpAddressStatus,
    pub endpoint: Option<EndpointId>,
    /// Inside address this one is a NAT outside of.
    pub nat_inside: Option<IpAddressId>,
    pub dns_name: String,
    pub description: String,
}

impl IpAddressAttrs {
    pub fn new(address: IpNetwork) -> Self {
        IpAddressAttrs {
            address,
            namespace: None,
            role: None,
            status: IpAddressStatus::default(),
            endpoint: None,
            nat_inside: None,
            dns_name: String::new(),
            description: String::new(),
        }
    }

    pub fn parse(address: &str) -> Result<Self> {
        Ok(IpAddressAttrs::new(address.parse()?))
    }

    pub fn with_role(mut self, role: IpAddressRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_status(mut self, status: IpAddressStatus) -> Self {
        self.status = status;
        self
    }

    pub fn in_namespace(mut self, namespace: NamespaceId) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn assigned_to(mut self, endpoint: EndpointId) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn nat_inside(mut self, inside: IpAddressId) -> Self {
        self.nat_inside = Some(inside);
        self
    }
}
