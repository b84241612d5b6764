//! Domain models for the IPAM engine.
//!
//! This module contains the core data structures used throughout the engine:
//! - [`IpNetwork`] - IPv4/IPv6 address or prefix with CIDR notation support
//! - [`IpRangeSet`] - set of addresses with union/difference and CIDR decomposition
//! - [`Prefix`] and [`IpAddress`] - the records kept in the containment tree
//! - [`VlanGroup`] and [`Vlan`] - flat VLAN records
//! - [`LocationType`], [`Location`] and [`Namespace`] - scoping records

mod ip_address;
mod location;
mod namespace;
mod network;
mod prefix;
mod range_set;
mod vlan;

/// Declare a numeric record identifier.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            serde::Serialize,
            serde::Deserialize,
            Debug,
            Copy,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(NamespaceId);
entity_id!(LocationTypeId);
entity_id!(LocationId);
entity_id!(PrefixId);
entity_id!(IpAddressId);
entity_id!(VlanGroupId);
entity_id!(VlanId);
entity_id!(
    /// External interface (device or VM interface) an address is assigned to.
    EndpointId
);

// Re-export public types
pub use ip_address::{IpAddress, IpAddressAttrs, IpAddressRole, IpAddressStatus};
pub use location::{ContentKind, Location, LocationAttrs, LocationType, LocationTypeAttrs};
pub use namespace::Namespace;
pub use network::{IpNetwork, IpVersion};
pub use prefix::{Prefix, PrefixAttrs, PrefixStatus, PrefixType};
pub use range_set::IpRangeSet;
pub use vlan::{slugify, Vlan, VlanAttrs, VlanGroup, VlanGroupAttrs, VlanStatus};
