//! Free space queries inside a prefix.
//!
//! Everything here is computed from the committed tree on each call; nothing is
//! cached between calls.

use crate::config::{VID_MAX, VID_MIN};
use crate::error::{IpamError, Result};
use crate::models::{IpNetwork, IpRangeSet, IpVersion, PrefixId, PrefixType, VlanGroupId};
use crate::store::IpamState;
use std::collections::BTreeSet;

/// Parent range minus the union of its child prefixes.
pub(crate) fn available_prefixes(state: &IpamState, id: PrefixId) -> Result<IpRangeSet> {
    let prefix = state.prefix(id)?;
    let children: Vec<IpNetwork> = super::tree::children(state, id)?
        .into_iter()
        .filter_map(|child| state.prefixes.get(&child).map(|p| p.prefix))
        .collect();
    let used = IpRangeSet::from_networks(prefix.prefix.version(), &children);
    Ok(IpRangeSet::from_network(&prefix.prefix).difference(&used))
}

/// First free block inside the prefix.
///
/// With `prefix_length`, the lowest free block of exactly that length. Without it,
/// the largest free block, lowest address first on ties.
pub(crate) fn first_available_prefix(
    state: &IpamState,
    id: PrefixId,
    prefix_length: Option<u8>,
) -> Result<IpNetwork> {
    let prefix = state.prefix(id)?.prefix;
    let blocks = available_prefixes(state, id)?.iter_cidrs();

    let found = match prefix_length {
        Some(len) => {
            if len < prefix.prefix_len() || len > prefix.version().max_length() {
                return Err(IpamError::InvalidValue(format!(
                    "cannot allocate a /{len} inside {prefix}"
                )));
            }
            // Blocks are aligned, so any /len that fits starts at a block boundary.
            blocks
                .iter()
                .find(|block| block.prefix_len() <= len)
                .map(|block| IpNetwork::from_bits(prefix.version(), block.lo(), len))
                .transpose()?
        }
        None => blocks.iter().min_by_key(|block| block.prefix_len()).copied(),
    };

    found.ok_or_else(|| match prefix_length {
        Some(len) => IpamError::Exhaustion(format!("no free /{len} in {prefix}")),
        None => IpamError::Exhaustion(format!("no free space in {prefix}")),
    })
}

/// Addresses excluded from allocation in a prefix of this shape.
///
/// IPv4 networks shorter than /31 lose network and broadcast. IPv6 networks shorter
/// than /127 lose the Subnet-Router anycast address. Pools keep everything.
fn reserved_addresses(prefix: &IpNetwork, prefix_type: PrefixType) -> Vec<u128> {
    if prefix_type == PrefixType::Pool {
        return Vec::new();
    }
    match prefix.version() {
        IpVersion::V4 if prefix.prefix_len() < 31 => vec![prefix.lo(), prefix.hi()],
        IpVersion::V6 if prefix.prefix_len() < 127 => vec![prefix.lo()],
        _ => Vec::new(),
    }
}

/// Parent range minus recorded hosts minus reserved addresses.
pub(crate) fn available_ips(state: &IpamState, id: PrefixId) -> Result<IpRangeSet> {
    let prefix = state.prefix(id)?;
    let mut taken = IpRangeSet::new(prefix.prefix.version());
    for address_id in super::tree::child_ips(state, id)? {
        let address = state.ip_address(address_id)?;
        taken.insert_network(&address.host());
    }
    for bits in reserved_addresses(&prefix.prefix, prefix.prefix_type) {
        taken.insert_range(bits, bits);
    }
    Ok(IpRangeSet::from_network(&prefix.prefix).difference(&taken))
}

/// Lowest available address, carrying the parent's prefix length.
pub(crate) fn first_available_ip(state: &IpamState, id: PrefixId) -> Result<IpNetwork> {
    let prefix = state.prefix(id)?.prefix;
    let available = available_ips(state, id)?;
    let bits = available
        .first()
        .ok_or_else(|| IpamError::Exhaustion(format!("no free address in {prefix}")))?;
    IpNetwork::from_bits(prefix.version(), bits, prefix.prefix_len())
}

/// Smallest VID not used in the group.
pub(crate) fn next_available_vid(state: &IpamState, group: VlanGroupId) -> Result<u16> {
    let group = state.vlan_group(group)?;
    let used: BTreeSet<u16> = state
        .vlans
        .values()
        .filter(|vlan| vlan.group == Some(group.id))
        .map(|vlan| vlan.vid)
        .collect();
    (VID_MIN..=VID_MAX)
        .find(|vid| !used.contains(vid))
        .ok_or_else(|| IpamError::Exhaustion(format!("no free VID in VLAN group {}", group.name)))
}
