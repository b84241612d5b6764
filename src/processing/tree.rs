//! Containment tree maintenance.
//!
//! Parent pointers are derived from network bounds: a record's parent is the
//! smallest prefix of the same namespace that contains it. Inserting or removing a
//! prefix only re-points the records directly affected, found with one range scan of
//! the namespace index.

use crate::error::{IpamError, Result};
use crate::models::{IpAddress, IpAddressId, IpNetwork, NamespaceId, Prefix, PrefixId};
use crate::store::IpamState;

/// Smallest prefix in `namespace` containing `network`, searching lengths from
/// `from_len` down to 0.
fn smallest_enclosing(
    state: &IpamState,
    namespace: NamespaceId,
    network: &IpNetwork,
    from_len: u8,
) -> Option<PrefixId> {
    let tree = state.index.prefixes.get(&namespace)?;
    (0..=from_len)
        .rev()
        .find_map(|len| tree.get(&network.truncate(len)).copied())
}

/// Parent for a prefix: the longest strict supernet present in the namespace.
pub(crate) fn find_prefix_parent(
    state: &IpamState,
    namespace: NamespaceId,
    network: &IpNetwork,
) -> Option<PrefixId> {
    let len = network.prefix_len();
    if len == 0 {
        return None;
    }
    smallest_enclosing(state, namespace, network, len - 1)
}

/// Parent for an address: the smallest prefix containing its host, a host-length
/// prefix included.
pub(crate) fn find_address_parent(
    state: &IpamState,
    namespace: NamespaceId,
    address: &IpNetwork,
) -> Option<PrefixId> {
    let host = IpNetwork::host(address.addr());
    smallest_enclosing(state, namespace, &host, host.prefix_len())
}

/// Add `prefix` to the tree and re-point the records it now encloses.
///
/// Fails with a uniqueness violation, before touching anything, when the namespace
/// already holds the same network.
pub(crate) fn insert_prefix(state: &mut IpamState, mut prefix: Prefix) -> Result<PrefixId> {
    let namespace = prefix.namespace;
    if let Some(existing) = state.index.prefix_at(namespace, &prefix.prefix) {
        return Err(IpamError::uniqueness(
            "prefix must be unique within namespace",
            format!("{} (existing prefix {existing})", prefix.prefix),
        ));
    }

    let id = prefix.id;
    let parent = find_prefix_parent(state, namespace, &prefix.prefix);
    prefix.parent = parent;

    // Anything inside the new prefix that hung off our parent now hangs off us.
    for child_id in state.index.prefixes_within(namespace, &prefix.prefix) {
        if let Some(child) = state.prefixes.get_mut(&child_id) {
            if child.parent == parent {
                log::debug!("Re-parent prefix {} -> {}", child.prefix, prefix.prefix);
                child.parent = Some(id);
            }
        }
    }
    for address_id in state.index.addresses_within(namespace, &prefix.prefix) {
        if let Some(address) = state.ip_addresses.get_mut(&address_id) {
            if address.parent == parent {
                log::debug!("Re-parent address {} -> {}", address.address, prefix.prefix);
                address.parent = Some(id);
            }
        }
    }

    state.index.insert_prefix(&prefix);
    state.prefixes.insert(id, prefix);
    Ok(id)
}

/// Remove a prefix and hand its direct children to its own parent.
pub(crate) fn remove_prefix(state: &mut IpamState, id: PrefixId) -> Result<Prefix> {
    let prefix = state.prefixes.remove(&id).ok_or(IpamError::NotFound {
        kind: "Prefix",
        id: id.0,
    })?;
    state.index.remove_prefix(&prefix);

    for child_id in state.index.prefixes_within(prefix.namespace, &prefix.prefix) {
        if let Some(child) = state.prefixes.get_mut(&child_id) {
            if child.parent == Some(id) {
                child.parent = prefix.parent;
            }
        }
    }
    for address_id in state.index.addresses_within(prefix.namespace, &prefix.prefix) {
        if let Some(address) = state.ip_addresses.get_mut(&address_id) {
            if address.parent == Some(id) {
                address.parent = prefix.parent;
            }
        }
    }
    log::debug!(
        "Removed prefix {} from tree, children now under {:?}",
        prefix.prefix,
        prefix.parent
    );
    Ok(prefix)
}

pub(crate) fn insert_ip_address(state: &mut IpamState, mut address: IpAddress) -> IpAddressId {
    address.parent = find_address_parent(state, address.namespace, &address.address);
    let id = address.id;
    state.index.insert_address(&address);
    state.ip_addresses.insert(id, address);
    id
}

pub(crate) fn remove_ip_address(state: &mut IpamState, id: IpAddressId) -> Result<IpAddress> {
    let address = state.ip_addresses.remove(&id).ok_or(IpamError::NotFound {
        kind: "IPAddress",
        id: id.0,
    })?;
    state.index.remove_address(&address);
    Ok(address)
}

/// Recompute every parent pointer from scratch. Used after loading a snapshot.
///
/// # Returns
/// The number of records whose stored parent was wrong.
pub(crate) fn rederive_parents(state: &mut IpamState) -> usize {
    let prefix_parents: Vec<(PrefixId, Option<PrefixId>)> = state
        .prefixes
        .values()
        .map(|p| (p.id, find_prefix_parent(state, p.namespace, &p.prefix)))
        .collect();
    let address_parents: Vec<(IpAddressId, Option<PrefixId>)> = state
        .ip_addresses
        .values()
        .map(|a| (a.id, find_address_parent(state, a.namespace, &a.address)))
        .collect();

    let mut fixed = 0;
    for (id, parent) in prefix_parents {
        if let Some(prefix) = state.prefixes.get_mut(&id) {
            if prefix.parent != parent {
                log::warn!("Prefix {} had parent {:?}, expected {:?}", prefix.prefix, prefix.parent, parent);
                prefix.parent = parent;
                fixed += 1;
            }
        }
    }
    for (id, parent) in address_parents {
        if let Some(address) = state.ip_addresses.get_mut(&id) {
            if address.parent != parent {
                log::warn!("Address {} had parent {:?}, expected {:?}", address.address, address.parent, parent);
                address.parent = parent;
                fixed += 1;
            }
        }
    }
    fixed
}

/// Direct child prefixes, in network order.
pub(crate) fn children(state: &IpamState, id: PrefixId) -> Result<Vec<PrefixId>> {
    let prefix = state.prefix(id)?;
    Ok(state
        .index
        .prefixes_within(prefix.namespace, &prefix.prefix)
        .into_iter()
        .filter(|child| {
            state
                .prefixes
                .get(child)
                .is_some_and(|c| c.parent == Some(id))
        })
        .collect())
}

/// Prefixes of the namespace without a parent, in network order.
pub(crate) fn roots(state: &IpamState, namespace: NamespaceId) -> Vec<PrefixId> {
    state
        .index
        .prefixes
        .get(&namespace)
        .map(|tree| {
            tree.values()
                .filter(|id| state.prefixes.get(id).is_some_and(|p| p.parent.is_none()))
                .copied()
                .collect()
        })
        .unwrap_or_default()
}

/// Every prefix containing `id`, found by network bounds, root first.
pub(crate) fn supernets(
    state: &IpamState,
    id: PrefixId,
    direct: bool,
    include_self: bool,
) -> Result<Vec<PrefixId>> {
    let prefix = state.prefix(id)?;
    let mut out: Vec<PrefixId> = if direct {
        prefix.parent.into_iter().collect()
    } else {
        match state.index.prefixes.get(&prefix.namespace) {
            Some(tree) => (0..prefix.prefix.prefix_len())
                .filter_map(|len| tree.get(&prefix.prefix.truncate(len)).copied())
                .collect(),
            None => Vec::new(),
        }
    };
    if include_self {
        out.push(id);
    }
    Ok(out)
}

/// Prefixes inside `id`, in network (pre-)order.
pub(crate) fn subnets(
    state: &IpamState,
    id: PrefixId,
    direct: bool,
    include_self: bool,
) -> Result<Vec<PrefixId>> {
    let prefix = state.prefix(id)?;
    let mut out = Vec::new();
    if include_self {
        out.push(id);
    }
    if direct {
        out.extend(children(state, id)?);
    } else {
        out.extend(state.index.prefixes_within(prefix.namespace, &prefix.prefix));
    }
    Ok(out)
}

/// Walk the parent chain. Root first, unless `ascending` walks up from the parent.
pub(crate) fn ancestors(
    state: &IpamState,
    id: PrefixId,
    ascending: bool,
    include_self: bool,
) -> Result<Vec<PrefixId>> {
    let mut chain = Vec::new();
    if include_self {
        chain.push(id);
    }
    let mut current = state.prefix(id)?.parent;
    while let Some(parent_id) = current {
        chain.push(parent_id);
        current = state.prefix(parent_id)?.parent;
    }
    if !ascending {
        chain.reverse();
    }
    Ok(chain)
}

/// Pre-order walk of the subtree below `id`.
pub(crate) fn descendants(
    state: &IpamState,
    id: PrefixId,
    include_self: bool,
) -> Result<Vec<PrefixId>> {
    fn walk(state: &IpamState, id: PrefixId, out: &mut Vec<PrefixId>) -> Result<()> {
        for child in children(state, id)? {
            out.push(child);
            walk(state, child, out)?;
        }
        Ok(())
    }

    let mut out = Vec::new();
    if include_self {
        out.push(id);
    }
    walk(state, id, &mut out)?;
    Ok(out)
}

/// Prefixes sharing the parent of `id`; the namespace roots when it has none.
pub(crate) fn siblings(
    state: &IpamState,
    id: PrefixId,
    include_self: bool,
) -> Result<Vec<PrefixId>> {
    let prefix = state.prefix(id)?;
    let mut out = match prefix.parent {
        Some(parent) => children(state, parent)?,
        None => roots(state, prefix.namespace),
    };
    if !include_self {
        out.retain(|sibling| *sibling != id);
    }
    Ok(out)
}

/// Topmost ancestor; `None` when `id` is itself a root.
pub(crate) fn root(state: &IpamState, id: PrefixId) -> Result<Option<PrefixId>> {
    Ok(ancestors(state, id, false, false)?.first().copied())
}

pub(crate) fn is_root_node(state: &IpamState, id: PrefixId) -> Result<bool> {
    Ok(state.prefix(id)?.parent.is_none())
}

pub(crate) fn is_child_node(state: &IpamState, id: PrefixId) -> Result<bool> {
    Ok(state.prefix(id)?.parent.is_some())
}

pub(crate) fn is_leaf_node(state: &IpamState, id: PrefixId) -> Result<bool> {
    Ok(children(state, id)?.is_empty())
}

/// Every address of the namespace whose host lies inside the prefix.
pub(crate) fn child_ips(state: &IpamState, id: PrefixId) -> Result<Vec<IpAddressId>> {
    let prefix = state.prefix(id)?;
    Ok(state
        .index
        .addresses_within(prefix.namespace, &prefix.prefix))
}
