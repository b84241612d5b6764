//! The engine facade.
//!
//! [`Ipam`] owns the committed state and is the only way to change it. Every
//! mutation validates before it writes; multi-step mutations run inside a
//! transaction that restores the previous state on any error.

use crate::config::EngineConfig;
use crate::error::{IpamError, Result};
use crate::models::{
    slugify, IpAddress, IpAddressAttrs, IpAddressId, IpNetwork, IpRangeSet, Location,
    LocationAttrs, LocationId, LocationType, LocationTypeAttrs, LocationTypeId, Namespace,
    NamespaceId, Prefix, PrefixAttrs, PrefixId, Vlan, VlanAttrs, VlanGroup, VlanGroupAttrs,
    VlanGroupId, VlanId,
};
use crate::processing::{allocation, expand_ip_pattern, nat, tree, utilization, validation, Utilization};
use crate::store::{self, IpamState};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Ipam {
    state: IpamState,
    config: EngineConfig,
}

impl Default for Ipam {
    fn default() -> Self {
        Ipam::new()
    }
}

impl Ipam {
    pub fn new() -> Self {
        Ipam::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Ipam {
            state: IpamState::new(&config.default_namespace),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn default_namespace(&self) -> NamespaceId {
        self.state.default_namespace
    }

    /// Run `action` against the state, restoring the checkpoint if it fails.
    fn transaction<T>(
        &mut self,
        name: &str,
        action: impl FnOnce(&mut IpamState) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = self.state.clone();
        match action(&mut self.state) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("Rolled back {name}: {e}");
                self.state = checkpoint;
                Err(e)
            }
        }
    }

    fn clone_prefixes(&self, ids: Vec<PrefixId>) -> Result<Vec<Prefix>> {
        ids.into_iter()
            .map(|id| self.state.prefix(id).cloned())
            .collect()
    }

    fn clone_addresses(&self, ids: Vec<IpAddressId>) -> Result<Vec<IpAddress>> {
        ids.into_iter()
            .map(|id| self.state.ip_address(id).cloned())
            .collect()
    }

    // ---- Namespaces and locations ----

    pub fn create_namespace(&mut self, name: &str, description: &str) -> Result<Namespace> {
        if self.state.namespaces.values().any(|ns| ns.name == name) {
            return Err(IpamError::uniqueness("namespace name must be unique", name));
        }
        let namespace = Namespace {
            id: NamespaceId(self.state.allocate_id()),
            name: name.to_string(),
            description: description.to_string(),
        };
        log::info!("Created namespace {}", namespace.name);
        self.state.namespaces.insert(namespace.id, namespace.clone());
        Ok(namespace)
    }

    pub fn get_namespace(&self, id: NamespaceId) -> Result<Namespace> {
        self.state.namespace(id).cloned()
    }

    pub fn namespaces(&self) -> Vec<Namespace> {
        self.state.namespaces.values().cloned().collect()
    }

    pub fn create_location_type(&mut self, attrs: LocationTypeAttrs) -> Result<LocationType> {
        validation::validate_location_type(&self.state, &attrs)?;
        let location_type = LocationType {
            id: LocationTypeId(self.state.allocate_id()),
            name: attrs.name,
            parent: attrs.parent,
            content_types: attrs.content_types,
        };
        self.state
            .location_types
            .insert(location_type.id, location_type.clone());
        Ok(location_type)
    }

    pub fn create_location(&mut self, attrs: LocationAttrs) -> Result<Location> {
        let candidate = Location {
            id: LocationId(0),
            name: attrs.name,
            location_type: attrs.location_type,
            parent: attrs.parent,
        };
        validation::validate_location(&self.state, &candidate)?;
        let location = Location {
            id: LocationId(self.state.allocate_id()),
            ..candidate
        };
        self.state.locations.insert(location.id, location.clone());
        Ok(location)
    }

    pub fn get_location(&self, id: LocationId) -> Result<Location> {
        self.state.location(id).cloned()
    }

    // ---- Prefixes ----

    fn prefix_from_attrs(&self, id: PrefixId, attrs: PrefixAttrs) -> Prefix {
        Prefix {
            id,
            prefix: attrs.prefix.network(),
            prefix_type: attrs.prefix_type,
            status: attrs.status,
            namespace: attrs.namespace.unwrap_or(self.state.default_namespace),
            location: attrs.location,
            parent: None,
            description: attrs.description,
            created: chrono::Utc::now(),
        }
    }

    /// Create a prefix and place it in its namespace's tree.
    ///
    /// The value is canonicalized first, so `10.0.0.1/24` is stored as `10.0.0.0/24`.
    pub fn create_prefix(&mut self, attrs: PrefixAttrs) -> Result<Prefix> {
        let candidate = self.prefix_from_attrs(PrefixId(0), attrs);
        validation::validate_prefix(&self.state, &candidate, None)?;

        let prefix = Prefix {
            id: PrefixId(self.state.allocate_id()),
            ..candidate
        };
        let id = tree::insert_prefix(&mut self.state, prefix)?;
        let prefix = self.state.prefix(id)?;
        log::info!("Created prefix {} (parent {:?})", prefix.prefix, prefix.parent);
        Ok(prefix.clone())
    }

    /// Replace a prefix's attributes, keeping its id.
    ///
    /// Validated against the committed state first, then applied as remove plus
    /// reinsert, so a changed network or namespace re-parents both its old and its
    /// new neighbourhood.
    pub fn update_prefix(&mut self, id: PrefixId, attrs: PrefixAttrs) -> Result<Prefix> {
        let created = self.state.prefix(id)?.created;
        let candidate = Prefix {
            created,
            ..self.prefix_from_attrs(id, attrs)
        };
        validation::validate_prefix(&self.state, &candidate, Some(id))?;

        tree::remove_prefix(&mut self.state, id)?;
        tree::insert_prefix(&mut self.state, candidate)?;
        self.get_prefix(id)
    }

    /// Delete a prefix; its children move up to its parent.
    pub fn delete_prefix(&mut self, id: PrefixId) -> Result<usize> {
        let prefix = tree::remove_prefix(&mut self.state, id)?;
        log::info!("Deleted prefix {}", prefix.prefix);
        Ok(1)
    }

    /// Delete every listed prefix, or none of them.
    pub fn bulk_delete_prefixes(&mut self, ids: &[PrefixId]) -> Result<usize> {
        let count = self.transaction("bulk_delete_prefixes", |state| {
            for id in ids {
                tree::remove_prefix(state, *id)?;
            }
            Ok(ids.len())
        })?;
        log::info!("Deleted {count} prefixes");
        Ok(count)
    }

    pub fn get_prefix(&self, id: PrefixId) -> Result<Prefix> {
        self.state.prefix(id).cloned()
    }

    /// Look up a prefix by exact network value.
    pub fn find_prefix(&self, namespace: NamespaceId, network: &IpNetwork) -> Option<Prefix> {
        let id = self.state.index.prefix_at(namespace, &network.network())?;
        self.state.prefixes.get(&id).cloned()
    }

    /// All prefixes of a namespace in network order.
    pub fn prefixes(&self, namespace: NamespaceId) -> Vec<Prefix> {
        self.state
            .index
            .prefixes
            .get(&namespace)
            .map(|tree| {
                tree.values()
                    .filter_map(|id| self.state.prefixes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- IP addresses ----

    fn address_from_attrs(&self, id: IpAddressId, attrs: &IpAddressAttrs) -> IpAddress {
        IpAddress {
            id,
            address: attrs.address,
            namespace: attrs.namespace.unwrap_or(self.state.default_namespace),
            parent: None,
            role: attrs.role,
            status: attrs.status,
            endpoint: attrs.endpoint,
            nat_outside: Vec::new(),
            dns_name: attrs.dns_name.clone(),
            description: attrs.description.clone(),
            created: chrono::Utc::now(),
        }
    }

    /// Insert an already validated address and link it to its NAT inside.
    fn commit_address(
        state: &mut IpamState,
        candidate: IpAddress,
        nat_inside: Option<IpAddressId>,
    ) -> IpAddressId {
        let id = tree::insert_ip_address(state, candidate);
        if let Some(inside) = nat_inside {
            nat::attach(state, inside, id);
        }
        id
    }

    pub fn create_ip_address(&mut self, attrs: IpAddressAttrs) -> Result<IpAddress> {
        let candidate = self.address_from_attrs(IpAddressId(0), &attrs);
        validation::validate_ip_address(&self.state, &candidate, attrs.nat_inside, None)?;

        let candidate = IpAddress {
            id: IpAddressId(self.state.allocate_id()),
            ..candidate
        };
        let id = Ipam::commit_address(&mut self.state, candidate, attrs.nat_inside);
        let address = self.state.ip_address(id)?;
        log::info!("Created IP address {} (parent {:?})", address.address, address.parent);
        Ok(address.clone())
    }

    /// Replace an address's attributes, keeping its id and its NAT outside list.
    ///
    /// Its place in its inside address's outside list only changes when the NAT
    /// inside itself changes.
    pub fn update_ip_address(&mut self, id: IpAddressId, attrs: IpAddressAttrs) -> Result<IpAddress> {
        let existing = self.state.ip_address(id)?;
        let candidate = IpAddress {
            nat_outside: existing.nat_outside.clone(),
            created: existing.created,
            ..self.address_from_attrs(id, &attrs)
        };
        validation::validate_ip_address(&self.state, &candidate, attrs.nat_inside, Some(id))?;

        if nat::nat_inside_of(&self.state, id) != attrs.nat_inside {
            nat::detach(&mut self.state, id);
        }
        tree::remove_ip_address(&mut self.state, id)?;
        Ipam::commit_address(&mut self.state, candidate, attrs.nat_inside);
        self.get_ip_address(id)
    }

    /// Delete an address. Its NAT outside addresses are kept, unlinked.
    pub fn delete_ip_address(&mut self, id: IpAddressId) -> Result<usize> {
        self.state.ip_address(id)?;
        nat::detach(&mut self.state, id);
        let address = tree::remove_ip_address(&mut self.state, id)?;
        log::info!("Deleted IP address {}", address.address);
        Ok(1)
    }

    /// Create one address per pattern expansion, all sharing `template`'s other
    /// attributes. Either every address is created or none is.
    pub fn bulk_create_ip_addresses(
        &mut self,
        pattern: &str,
        template: IpAddressAttrs,
    ) -> Result<Vec<IpAddress>> {
        let addresses = expand_ip_pattern(pattern, self.config.max_pattern_expansion)?;
        let namespace = template.namespace.unwrap_or(self.state.default_namespace);
        let ids = self.transaction("bulk_create_ip_addresses", |state| {
            let mut ids = Vec::with_capacity(addresses.len());
            for address in &addresses {
                let id = IpAddressId(state.allocate_id());
                let candidate = IpAddress {
                    id,
                    address: *address,
                    namespace,
                    parent: None,
                    role: template.role,
                    status: template.status,
                    endpoint: template.endpoint,
                    nat_outside: Vec::new(),
                    dns_name: template.dns_name.clone(),
                    description: template.description.clone(),
                    created: chrono::Utc::now(),
                };
                validation::validate_ip_address(state, &candidate, template.nat_inside, None)?;
                ids.push(Ipam::commit_address(state, candidate, template.nat_inside));
            }
            Ok(ids)
        })?;
        log::info!("Bulk created {} addresses from {pattern}", ids.len());
        self.clone_addresses(ids)
    }

    pub fn get_ip_address(&self, id: IpAddressId) -> Result<IpAddress> {
        self.state.ip_address(id).cloned()
    }

    /// All addresses of a namespace in address order.
    pub fn ip_addresses(&self, namespace: NamespaceId) -> Vec<IpAddress> {
        self.state
            .index
            .addresses
            .get(&namespace)
            .map(|tree| {
                tree.values()
                    .flatten()
                    .filter_map(|id| self.state.ip_addresses.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Other addresses recorded for the same host in the same namespace.
    pub fn get_duplicates(&self, id: IpAddressId) -> Result<Vec<IpAddress>> {
        let address = self.state.ip_address(id)?;
        let others = self
            .state
            .index
            .addresses_at(address.namespace, &address.host())
            .into_iter()
            .filter(|other| *other != id)
            .collect();
        self.clone_addresses(others)
    }

    /// Outside addresses of an inside address, in creation order.
    pub fn nat_outside_list(&self, id: IpAddressId) -> Result<Vec<IpAddress>> {
        let address = self.state.ip_address(id)?;
        self.clone_addresses(address.nat_outside.clone())
    }

    pub fn nat_inside(&self, id: IpAddressId) -> Result<Option<IpAddress>> {
        self.state.ip_address(id)?;
        nat::nat_inside_of(&self.state, id)
            .map(|inside| self.get_ip_address(inside))
            .transpose()
    }

    // ---- VLAN groups and VLANs ----

    pub fn create_vlan_group(&mut self, attrs: VlanGroupAttrs) -> Result<VlanGroup> {
        let slug = if attrs.slug.is_empty() {
            slugify(&attrs.name)
        } else {
            attrs.slug
        };
        let candidate = VlanGroup {
            id: VlanGroupId(0),
            name: attrs.name,
            slug,
            location: attrs.location,
            description: attrs.description,
        };
        validation::validate_vlan_group(&self.state, &candidate, None)?;
        let group = VlanGroup {
            id: VlanGroupId(self.state.allocate_id()),
            ..candidate
        };
        log::info!("Created VLAN group {}", group.name);
        self.state.vlan_groups.insert(group.id, group.clone());
        Ok(group)
    }

    /// Delete an empty VLAN group.
    pub fn delete_vlan_group(&mut self, id: VlanGroupId) -> Result<usize> {
        let group = self.state.vlan_group(id)?;
        let members = self
            .state
            .vlans
            .values()
            .filter(|vlan| vlan.group == Some(id))
            .count();
        if members > 0 {
            return Err(IpamError::Containment(format!(
                "VLAN group {} still holds {members} VLANs",
                group.name
            )));
        }
        self.state.vlan_groups.remove(&id);
        Ok(1)
    }

    pub fn get_vlan_group(&self, id: VlanGroupId) -> Result<VlanGroup> {
        self.state.vlan_group(id).cloned()
    }

    fn vlan_from_attrs(id: VlanId, attrs: VlanAttrs) -> Vlan {
        Vlan {
            id,
            vid: attrs.vid,
            name: attrs.name,
            group: attrs.group,
            location: attrs.location,
            status: attrs.status,
        }
    }

    pub fn create_vlan(&mut self, attrs: VlanAttrs) -> Result<Vlan> {
        let candidate = Ipam::vlan_from_attrs(VlanId(0), attrs);
        validation::validate_vlan(&self.state, &candidate, None)?;
        let vlan = Vlan {
            id: VlanId(self.state.allocate_id()),
            ..candidate
        };
        log::info!("Created VLAN {vlan}");
        self.state.vlans.insert(vlan.id, vlan.clone());
        Ok(vlan)
    }

    pub fn update_vlan(&mut self, id: VlanId, attrs: VlanAttrs) -> Result<Vlan> {
        self.state.vlan(id)?;
        let vlan = Ipam::vlan_from_attrs(id, attrs);
        validation::validate_vlan(&self.state, &vlan, Some(id))?;
        self.state.vlans.insert(id, vlan.clone());
        Ok(vlan)
    }

    pub fn delete_vlan(&mut self, id: VlanId) -> Result<usize> {
        self.state.vlan(id)?;
        self.state.vlans.remove(&id);
        Ok(1)
    }

    pub fn get_vlan(&self, id: VlanId) -> Result<Vlan> {
        self.state.vlan(id).cloned()
    }

    /// VLANs of a group ordered by VID.
    pub fn vlans_in_group(&self, group: VlanGroupId) -> Result<Vec<Vlan>> {
        self.state.vlan_group(group)?;
        let mut vlans: Vec<Vlan> = self
            .state
            .vlans
            .values()
            .filter(|vlan| vlan.group == Some(group))
            .cloned()
            .collect();
        vlans.sort_by_key(|vlan| vlan.vid);
        Ok(vlans)
    }

    pub fn next_available_vid(&self, group: VlanGroupId) -> Result<u16> {
        allocation::next_available_vid(&self.state, group)
    }

    // ---- Tree queries ----

    pub fn get_parent(&self, id: PrefixId) -> Result<Option<Prefix>> {
        self.state
            .prefix(id)?
            .parent
            .map(|parent| self.get_prefix(parent))
            .transpose()
    }

    pub fn children(&self, id: PrefixId) -> Result<Vec<Prefix>> {
        self.clone_prefixes(tree::children(&self.state, id)?)
    }

    /// Prefixes without a parent, in network order.
    pub fn roots(&self, namespace: NamespaceId) -> Vec<Prefix> {
        tree::roots(&self.state, namespace)
            .into_iter()
            .filter_map(|id| self.state.prefixes.get(&id).cloned())
            .collect()
    }

    pub fn supernets(&self, id: PrefixId, direct: bool, include_self: bool) -> Result<Vec<Prefix>> {
        self.clone_prefixes(tree::supernets(&self.state, id, direct, include_self)?)
    }

    pub fn subnets(&self, id: PrefixId, direct: bool, include_self: bool) -> Result<Vec<Prefix>> {
        self.clone_prefixes(tree::subnets(&self.state, id, direct, include_self)?)
    }

    /// Parent chain, root first unless `ascending`.
    pub fn ancestors(&self, id: PrefixId, ascending: bool, include_self: bool) -> Result<Vec<Prefix>> {
        self.clone_prefixes(tree::ancestors(&self.state, id, ascending, include_self)?)
    }

    pub fn descendants(&self, id: PrefixId, include_self: bool) -> Result<Vec<Prefix>> {
        self.clone_prefixes(tree::descendants(&self.state, id, include_self)?)
    }

    pub fn siblings(&self, id: PrefixId, include_self: bool) -> Result<Vec<Prefix>> {
        self.clone_prefixes(tree::siblings(&self.state, id, include_self)?)
    }

    pub fn root(&self, id: PrefixId) -> Result<Option<Prefix>> {
        tree::root(&self.state, id)?
            .map(|root| self.get_prefix(root))
            .transpose()
    }

    pub fn is_root_node(&self, id: PrefixId) -> Result<bool> {
        tree::is_root_node(&self.state, id)
    }

    pub fn is_leaf_node(&self, id: PrefixId) -> Result<bool> {
        tree::is_leaf_node(&self.state, id)
    }

    pub fn is_child_node(&self, id: PrefixId) -> Result<bool> {
        tree::is_child_node(&self.state, id)
    }

    /// Every address inside the prefix, at any depth.
    pub fn get_child_ips(&self, id: PrefixId) -> Result<Vec<IpAddress>> {
        self.clone_addresses(tree::child_ips(&self.state, id)?)
    }

    // ---- Allocation and utilization ----

    pub fn get_available_prefixes(&self, id: PrefixId) -> Result<IpRangeSet> {
        allocation::available_prefixes(&self.state, id)
    }

    pub fn get_first_available_prefix(
        &self,
        id: PrefixId,
        prefix_length: Option<u8>,
    ) -> Result<IpNetwork> {
        allocation::first_available_prefix(&self.state, id, prefix_length)
    }

    pub fn get_available_ips(&self, id: PrefixId) -> Result<IpRangeSet> {
        allocation::available_ips(&self.state, id)
    }

    pub fn get_first_available_ip(&self, id: PrefixId) -> Result<IpNetwork> {
        allocation::first_available_ip(&self.state, id)
    }

    pub fn get_utilization(&self, id: PrefixId) -> Result<Utilization> {
        utilization::utilization(&self.state, id)
    }

    // ---- Persistence ----

    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        store::save_snapshot(&self.state, path)
    }

    /// Load a snapshot, re-deriving every parent pointer from the stored values.
    pub fn load_snapshot(path: &Path, config: EngineConfig) -> Result<Ipam> {
        let mut state = store::load_snapshot(path)?;
        let fixed = tree::rederive_parents(&mut state);
        if fixed > 0 {
            log::warn!("Corrected {fixed} stale parent pointers from {}", path.display());
        }
        Ok(Ipam { state, config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IpAddressRole, PrefixType};

    fn prefix(ipam: &mut Ipam, cidr: &str) -> Prefix {
        ipam.create_prefix(PrefixAttrs::parse(cidr).unwrap()).unwrap()
    }

    #[test]
    fn test_create_prefix_canonicalizes() {
        let mut ipam = Ipam::new();
        let p = prefix(&mut ipam, "10.0.0.1/24");
        assert_eq!(p.prefix.to_string(), "10.0.0.0/24");
        assert_eq!(p.namespace, ipam.default_namespace());
        let err = ipam
            .create_prefix(PrefixAttrs::parse("10.0.0.0/24").unwrap())
            .unwrap_err();
        assert!(matches!(err, IpamError::Uniqueness { .. }), "got {err}");
    }

    #[test]
    fn test_same_prefix_in_other_namespace() {
        let mut ipam = Ipam::new();
        let ns = ipam.create_namespace("Lab", "").unwrap();
        prefix(&mut ipam, "10.0.0.0/24");
        let other = ipam
            .create_prefix(PrefixAttrs::parse("10.0.0.0/24").unwrap().in_namespace(ns.id))
            .unwrap();
        assert_eq!(other.namespace, ns.id);
        assert!(ipam.create_namespace("Lab", "").is_err());
        assert!(ipam
            .create_prefix(PrefixAttrs::parse("10.1.0.0/24").unwrap().in_namespace(NamespaceId(999)))
            .is_err());
    }

    #[test]
    fn test_update_prefix_moves_in_tree() {
        let mut ipam = Ipam::new();
        let a = prefix(&mut ipam, "10.0.0.0/16");
        let b = prefix(&mut ipam, "10.1.0.0/16");
        let leaf = prefix(&mut ipam, "10.0.5.0/24");
        assert_eq!(leaf.parent, Some(a.id));

        let moved = ipam
            .update_prefix(leaf.id, PrefixAttrs::parse("10.1.5.0/24").unwrap())
            .unwrap();
        assert_eq!(moved.id, leaf.id);
        assert_eq!(moved.parent, Some(b.id));
        assert!(ipam.is_leaf_node(a.id).unwrap());
    }

    #[test]
    fn test_failed_update_leaves_tree_unchanged() {
        let mut ipam = Ipam::new();
        let a = prefix(&mut ipam, "10.0.0.0/16");
        let mid = prefix(&mut ipam, "10.0.4.0/22");
        let leaf = prefix(&mut ipam, "10.0.5.0/24");
        let err = ipam
            .update_prefix(mid.id, PrefixAttrs::parse("10.0.0.0/16").unwrap())
            .unwrap_err();
        assert!(matches!(err, IpamError::Uniqueness { .. }));
        assert_eq!(ipam.get_prefix(mid.id).unwrap().prefix, mid.prefix);
        assert_eq!(ipam.get_prefix(leaf.id).unwrap().parent, Some(mid.id));
        assert_eq!(ipam.children(a.id).unwrap().len(), 1);

        let err = ipam
            .update_prefix(PrefixId(999), PrefixAttrs::parse("10.9.0.0/16").unwrap())
            .unwrap_err();
        assert!(matches!(err, IpamError::NotFound { .. }), "got {err}");
    }

    #[test]
    fn test_update_prefix_in_place_keeps_children() {
        let mut ipam = Ipam::new();
        let a = prefix(&mut ipam, "10.0.0.0/16");
        let leaf = prefix(&mut ipam, "10.0.5.0/24");
        let updated = ipam
            .update_prefix(
                a.id,
                PrefixAttrs::parse("10.0.0.0/16")
                    .unwrap()
                    .with_type(PrefixType::Container),
            )
            .unwrap();
        assert_eq!(updated.prefix_type, PrefixType::Container);
        assert_eq!(updated.created, a.created);
        assert_eq!(ipam.get_prefix(leaf.id).unwrap().parent, Some(a.id));
    }

    #[test]
    fn test_address_roles_and_duplicates() {
        let mut ipam = Ipam::new();
        let first = ipam
            .create_ip_address(IpAddressAttrs::parse("192.0.2.1/24").unwrap())
            .unwrap();
        assert!(ipam
            .create_ip_address(IpAddressAttrs::parse("192.0.2.1/24").unwrap())
            .is_err());
        let vip = ipam
            .create_ip_address(
                IpAddressAttrs::parse("192.0.2.1/24")
                    .unwrap()
                    .with_role(IpAddressRole::Vip),
            )
            .unwrap();
        let dups = ipam.get_duplicates(first.id).unwrap();
        assert_eq!(dups.iter().map(|a| a.id).collect::<Vec<_>>(), vec![vip.id]);
    }

    #[test]
    fn test_nat_links() {
        let mut ipam = Ipam::new();
        let inside = ipam
            .create_ip_address(IpAddressAttrs::parse("10.0.0.1/24").unwrap())
            .unwrap();
        let out1 = ipam
            .create_ip_address(IpAddressAttrs::parse("203.0.113.1/24").unwrap().nat_inside(inside.id))
            .unwrap();
        let out2 = ipam
            .create_ip_address(IpAddressAttrs::parse("203.0.113.2/24").unwrap().nat_inside(inside.id))
            .unwrap();
        let outside: Vec<IpAddressId> = ipam
            .nat_outside_list(inside.id)
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(outside, vec![out1.id, out2.id], "creation order");
        assert_eq!(ipam.nat_inside(out2.id).unwrap().map(|a| a.id), Some(inside.id));

        // an outside address cannot itself be an inside
        let err = ipam
            .create_ip_address(IpAddressAttrs::parse("198.51.100.1/24").unwrap().nat_inside(out1.id))
            .unwrap_err();
        assert!(matches!(err, IpamError::Containment(_)), "got {err}");

        ipam.delete_ip_address(out1.id).unwrap();
        assert_eq!(ipam.nat_outside_list(inside.id).unwrap().len(), 1);
    }

    #[test]
    fn test_bulk_create_is_atomic() {
        let mut ipam = Ipam::new();
        ipam.create_ip_address(IpAddressAttrs::parse("192.0.2.3/24").unwrap())
            .unwrap();
        let template = IpAddressAttrs::parse("0.0.0.0/0").unwrap();
        let err = ipam
            .bulk_create_ip_addresses("192.0.2.[1-5]/24", template.clone())
            .unwrap_err();
        assert!(matches!(err, IpamError::Uniqueness { .. }), "got {err}");
        assert_eq!(ipam.ip_addresses(ipam.default_namespace()).len(), 1, "rolled back");

        let created = ipam
            .bulk_create_ip_addresses("192.0.2.[10-12]/24", template)
            .unwrap();
        assert_eq!(created.len(), 3);
    }

    #[test]
    fn test_vlan_group_delete_requires_empty() {
        let mut ipam = Ipam::new();
        let group = ipam.create_vlan_group(VlanGroupAttrs::new("Core Group")).unwrap();
        assert_eq!(group.slug, "core-group");
        let vlan = ipam
            .create_vlan(VlanAttrs::new(10, "users").in_group(group.id))
            .unwrap();
        assert!(ipam.delete_vlan_group(group.id).is_err());
        ipam.delete_vlan(vlan.id).unwrap();
        assert_eq!(ipam.delete_vlan_group(group.id).unwrap(), 1);
    }

    #[test]
    fn test_container_utilization_via_facade() {
        let mut ipam = Ipam::new();
        let parent = ipam
            .create_prefix(PrefixAttrs::parse("10.0.0.0/24").unwrap().with_type(PrefixType::Container))
            .unwrap();
        prefix(&mut ipam, "10.0.0.0/25");
        let u = ipam.get_utilization(parent.id).unwrap();
        assert_eq!((u.used, u.total), (128, 256));
    }
}
