//! In-memory state of the engine and its derived indexes.
//!
//! This module holds the committed records:
//! - [`IpamState`] - every record, keyed by id, plus the id counter
//! - [`TreeIndex`] - per-namespace ordered maps used for containment lookups
//! - [`snapshot`] - JSON persistence of the state

mod snapshot;

pub use snapshot::{load_snapshot, save_snapshot};

use crate::error::{IpamError, Result};
use crate::models::{
    IpAddress, IpAddressId, IpNetwork, Location, LocationId, LocationType, LocationTypeId,
    Namespace, NamespaceId, Prefix, PrefixId, Vlan, VlanGroup, VlanGroupId, VlanId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Ordered lookups by network value, one tree per namespace.
///
/// Prefix keys are canonical networks. Address keys are full-length host values, so
/// every address inside a prefix is found with one range scan.
#[derive(Debug, Clone, Default)]
pub struct TreeIndex {
    pub(crate) prefixes: HashMap<NamespaceId, BTreeMap<IpNetwork, PrefixId>>,
    pub(crate) addresses: HashMap<NamespaceId, BTreeMap<IpNetwork, BTreeSet<IpAddressId>>>,
}

impl TreeIndex {
    pub(crate) fn prefix_at(&self, namespace: NamespaceId, network: &IpNetwork) -> Option<PrefixId> {
        self.prefixes.get(&namespace)?.get(network).copied()
    }

    pub(crate) fn insert_prefix(&mut self, prefix: &Prefix) {
        self.prefixes
            .entry(prefix.namespace)
            .or_default()
            .insert(prefix.prefix, prefix.id);
    }

    pub(crate) fn remove_prefix(&mut self, prefix: &Prefix) {
        if let Some(tree) = self.prefixes.get_mut(&prefix.namespace) {
            tree.remove(&prefix.prefix);
        }
    }

    pub(crate) fn insert_address(&mut self, address: &IpAddress) {
        self.addresses
            .entry(address.namespace)
            .or_default()
            .entry(address.host())
            .or_default()
            .insert(address.id);
    }

    pub(crate) fn remove_address(&mut self, address: &IpAddress) {
        if let Some(tree) = self.addresses.get_mut(&address.namespace) {
            let host = address.host();
            if let Some(ids) = tree.get_mut(&host) {
                ids.remove(&address.id);
                if ids.is_empty() {
                    tree.remove(&host);
                }
            }
        }
    }

    /// Ids of prefixes strictly inside `network`, in tree pre-order.
    pub(crate) fn prefixes_within(
        &self,
        namespace: NamespaceId,
        network: &IpNetwork,
    ) -> Vec<PrefixId> {
        let Some(tree) = self.prefixes.get(&namespace) else {
            return Vec::new();
        };
        let upper = IpNetwork::host_bits_of(network.version(), network.hi());
        tree.range(*network..=upper)
            .filter(|(key, _)| *key != network && network.contains(key))
            .map(|(_, id)| *id)
            .collect()
    }

    /// Ids of addresses whose host lies inside `network`, in address order.
    pub(crate) fn addresses_within(
        &self,
        namespace: NamespaceId,
        network: &IpNetwork,
    ) -> Vec<IpAddressId> {
        let Some(tree) = self.addresses.get(&namespace) else {
            return Vec::new();
        };
        let lower = IpNetwork::host_bits_of(network.version(), network.lo());
        let upper = IpNetwork::host_bits_of(network.version(), network.hi());
        tree.range(lower..=upper)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    pub(crate) fn addresses_at(&self, namespace: NamespaceId, host: &IpNetwork) -> Vec<IpAddressId> {
        self.addresses
            .get(&namespace)
            .and_then(|tree| tree.get(host))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// All committed records. Cloning the state is how a transaction checkpoints.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IpamState {
    pub(crate) next_id: u64,
    pub(crate) default_namespace: NamespaceId,
    pub(crate) namespaces: BTreeMap<NamespaceId, Namespace>,
    #[serde(default)]
    pub(crate) location_types: BTreeMap<LocationTypeId, LocationType>,
    #[serde(default)]
    pub(crate) locations: BTreeMap<LocationId, Location>,
    #[serde(default)]
    pub(crate) prefixes: BTreeMap<PrefixId, Prefix>,
    #[serde(default)]
    pub(crate) ip_addresses: BTreeMap<IpAddressId, IpAddress>,
    #[serde(default)]
    pub(crate) vlan_groups: BTreeMap<VlanGroupId, VlanGroup>,
    #[serde(default)]
    pub(crate) vlans: BTreeMap<VlanId, Vlan>,
    #[serde(skip)]
    pub(crate) index: TreeIndex,
}

impl IpamState {
    /// Empty state holding only the default namespace.
    pub fn new(default_namespace: &str) -> Self {
        let id = NamespaceId(1);
        let mut namespaces = BTreeMap::new();
        namespaces.insert(
            id,
            Namespace {
                id,
                name: default_namespace.to_string(),
                description: String::new(),
            },
        );
        IpamState {
            next_id: 2,
            default_namespace: id,
            namespaces,
            location_types: BTreeMap::new(),
            locations: BTreeMap::new(),
            prefixes: BTreeMap::new(),
            ip_addresses: BTreeMap::new(),
            vlan_groups: BTreeMap::new(),
            vlans: BTreeMap::new(),
            index: TreeIndex::default(),
        }
    }

    pub(crate) fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(crate) fn namespace(&self, id: NamespaceId) -> Result<&Namespace> {
        self.namespaces.get(&id).ok_or(IpamError::NotFound {
            kind: "Namespace",
            id: id.0,
        })
    }

    pub(crate) fn location_type(&self, id: LocationTypeId) -> Result<&LocationType> {
        self.location_types.get(&id).ok_or(IpamError::NotFound {
            kind: "LocationType",
            id: id.0,
        })
    }

    pub(crate) fn location(&self, id: LocationId) -> Result<&Location> {
        self.locations.get(&id).ok_or(IpamError::NotFound {
            kind: "Location",
            id: id.0,
        })
    }

    pub(crate) fn prefix(&self, id: PrefixId) -> Result<&Prefix> {
        self.prefixes.get(&id).ok_or(IpamError::NotFound {
            kind: "Prefix",
            id: id.0,
        })
    }

    pub(crate) fn ip_address(&self, id: IpAddressId) -> Result<&IpAddress> {
        self.ip_addresses.get(&id).ok_or(IpamError::NotFound {
            kind: "IPAddress",
            id: id.0,
        })
    }

    pub(crate) fn vlan_group(&self, id: VlanGroupId) -> Result<&VlanGroup> {
        self.vlan_groups.get(&id).ok_or(IpamError::NotFound {
            kind: "VLANGroup",
            id: id.0,
        })
    }

    pub(crate) fn vlan(&self, id: VlanId) -> Result<&Vlan> {
        self.vlans.get(&id).ok_or(IpamError::NotFound {
            kind: "VLAN",
            id: id.0,
        })
    }

    /// Rebuild the index from the records, failing on duplicate prefixes.
    pub(crate) fn rebuild_index(&mut self) -> Result<()> {
        let mut index = TreeIndex::default();
        for prefix in self.prefixes.values() {
            if let Some(existing) = index.prefix_at(prefix.namespace, &prefix.prefix) {
                return Err(IpamError::uniqueness(
                    "prefix must be unique within namespace",
                    format!("{} (prefixes {} and {})", prefix.prefix, existing, prefix.id),
                ));
            }
            index.insert_prefix(prefix);
        }
        for address in self.ip_addresses.values() {
            index.insert_address(address);
        }
        self.index = index;
        Ok(())
    }

    /// Largest id in use across every record kind.
    pub(crate) fn max_id(&self) -> u64 {
        [
            self.namespaces.keys().map(|k| k.0).max(),
            self.location_types.keys().map(|k| k.0).max(),
            self.locations.keys().map(|k| k.0).max(),
            self.prefixes.keys().map(|k| k.0).max(),
            self.ip_addresses.keys().map(|k| k.0).max(),
            self.vlan_groups.keys().map(|k| k.0).max(),
            self.vlans.keys().map(|k| k.0).max(),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrefixStatus, PrefixType};

    fn prefix(id: u64, cidr: &str) -> Prefix {
        Prefix {
            id: PrefixId(id),
            prefix: cidr.parse().unwrap(),
            prefix_type: PrefixType::Network,
            status: PrefixStatus::Active,
            namespace: NamespaceId(1),
            location: None,
            parent: None,
            description: String::new(),
            created: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_prefixes_within_is_preorder() {
        let mut index = TreeIndex::default();
        for (id, cidr) in [
            (1, "10.0.0.0/8"),
            (2, "10.0.1.0/24"),
            (3, "10.0.0.0/16"),
            (4, "10.0.0.0/24"),
            (5, "10.1.0.0/16"),
            (6, "11.0.0.0/8"),
        ] {
            index.insert_prefix(&prefix(id, cidr));
        }
        let ns = NamespaceId(1);
        let within = index.prefixes_within(ns, &"10.0.0.0/16".parse().unwrap());
        assert_eq!(within, vec![PrefixId(4), PrefixId(2)]);
        let within = index.prefixes_within(ns, &"10.0.0.0/8".parse().unwrap());
        assert_eq!(
            within,
            vec![PrefixId(3), PrefixId(4), PrefixId(2), PrefixId(5)]
        );
        assert!(index.prefixes_within(NamespaceId(9), &"10.0.0.0/8".parse().unwrap()).is_empty());
    }

    #[test]
    fn test_rebuild_index_rejects_duplicates() {
        let mut state = IpamState::new("Global");
        state.prefixes.insert(PrefixId(10), prefix(10, "10.0.0.0/24"));
        state.prefixes.insert(PrefixId(11), prefix(11, "10.0.0.0/24"));
        let err = state.rebuild_index().unwrap_err();
        assert!(matches!(err, IpamError::Uniqueness { .. }));
        assert_eq!(state.max_id(), 11);
    }
}
