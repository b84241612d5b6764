//! Used/total address counts per prefix type.

use crate::error::Result;
use crate::models::{IpNetwork, IpRangeSet, IpVersion, PrefixId, PrefixType};
use crate::store::IpamState;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Utilization {
    pub used: u128,
    pub total: u128,
}

impl Utilization {
    /// Percentage used, 0.0 for an empty total.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.used as f64 / self.total as f64 * 100.0
    }
}

impl From<Utilization> for (u128, u128) {
    fn from(u: Utilization) -> Self {
        (u.used, u.total)
    }
}

impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.used, self.total, self.percent())
    }
}

/// IPv4 networks shorter than /31 do not count network and broadcast.
fn excludes_edges(prefix: &IpNetwork, prefix_type: PrefixType) -> bool {
    prefix_type == PrefixType::Network
        && prefix.version() == IpVersion::V4
        && prefix.prefix_len() < 31
}

/// Containers count the space taken by child prefixes. Networks and pools count
/// distinct recorded hosts.
pub(crate) fn utilization(state: &IpamState, id: PrefixId) -> Result<Utilization> {
    let prefix = state.prefix(id)?;
    let network = prefix.prefix;
    let mut total = network.num_addresses();

    if prefix.prefix_type == PrefixType::Container {
        let children: Vec<IpNetwork> = super::tree::children(state, id)?
            .into_iter()
            .filter_map(|child| state.prefixes.get(&child).map(|p| p.prefix))
            .collect();
        let used = IpRangeSet::from_networks(network.version(), &children).len();
        return Ok(Utilization { used, total });
    }

    let mut hosts: BTreeSet<u128> = BTreeSet::new();
    for address_id in super::tree::child_ips(state, id)? {
        hosts.insert(state.ip_address(address_id)?.address.bits());
    }
    if excludes_edges(&network, prefix.prefix_type) {
        hosts.remove(&network.lo());
        hosts.remove(&network.hi());
        total -= 2;
    }
    Ok(Utilization {
        used: hosts.len() as u128,
        total,
    })
}
