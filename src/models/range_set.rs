//! Sets of IP addresses held as sorted, merged, inclusive ranges.
//!
//! [`IpRangeSet`] is what the allocation queries return. Two sets compare equal
//! when they cover exactly the same addresses, regardless of how they were built.

use super::network::{host_mask_bits, lo_mask, IpNetwork, IpVersion};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRangeSet {
    version: IpVersion,
    /// Inclusive `(first, last)` ranges, sorted, non-overlapping and non-adjacent.
    ranges: Vec<(u128, u128)>,
}

impl IpRangeSet {
    pub fn new(version: IpVersion) -> Self {
        IpRangeSet {
            version,
            ranges: Vec::new(),
        }
    }

    pub fn from_network(network: &IpNetwork) -> Self {
        IpRangeSet {
            version: network.version(),
            ranges: vec![(network.lo(), network.hi())],
        }
    }

    /// Build a set from networks of `version`; networks of the other family are ignored.
    pub fn from_networks<'a>(
        version: IpVersion,
        networks: impl IntoIterator<Item = &'a IpNetwork>,
    ) -> Self {
        let ranges = networks
            .into_iter()
            .filter(|n| n.version() == version)
            .map(|n| (n.lo(), n.hi()))
            .collect();
        IpRangeSet {
            version,
            ranges: normalize(ranges),
        }
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of addresses in the set, saturating at `u128::MAX`.
    pub fn len(&self) -> u128 {
        self.ranges.iter().fold(0u128, |acc, (lo, hi)| {
            let size = (hi - lo).checked_add(1).unwrap_or(u128::MAX);
            acc.saturating_add(size)
        })
    }

    /// Lowest address in the set.
    pub fn first(&self) -> Option<u128> {
        self.ranges.first().map(|(lo, _)| *lo)
    }

    pub fn insert_network(&mut self, network: &IpNetwork) {
        if network.version() != self.version {
            return;
        }
        self.insert_range(network.lo(), network.hi());
    }

    pub fn insert_range(&mut self, lo: u128, hi: u128) {
        let mut ranges = std::mem::take(&mut self.ranges);
        ranges.push((lo.min(hi), lo.max(hi)));
        self.ranges = normalize(ranges);
    }

    pub fn union(&self, other: &IpRangeSet) -> IpRangeSet {
        if other.version != self.version {
            return self.clone();
        }
        let ranges = self
            .ranges
            .iter()
            .chain(other.ranges.iter())
            .copied()
            .collect();
        IpRangeSet {
            version: self.version,
            ranges: normalize(ranges),
        }
    }

    /// Addresses in `self` that are not in `other`.
    pub fn difference(&self, other: &IpRangeSet) -> IpRangeSet {
        if other.version != self.version || other.is_empty() {
            return self.clone();
        }
        let mut out = Vec::new();
        let mut j = 0;
        for &(lo, hi) in &self.ranges {
            while j < other.ranges.len() && other.ranges[j].1 < lo {
                j += 1;
            }
            let mut cur = lo;
            let mut open = true;
            let mut k = j;
            while open && k < other.ranges.len() && other.ranges[k].0 <= hi {
                let (cut_lo, cut_hi) = other.ranges[k];
                if cut_lo > cur {
                    out.push((cur, cut_lo - 1));
                }
                if cut_hi >= hi {
                    open = false;
                } else if cut_hi >= cur {
                    cur = cut_hi + 1;
                }
                k += 1;
            }
            if open {
                out.push((cur, hi));
            }
        }
        IpRangeSet {
            version: self.version,
            ranges: out,
        }
    }

    /// The unique minimal list of CIDR blocks covering the set, in address order.
    pub fn iter_cidrs(&self) -> Vec<IpNetwork> {
        let mut cidrs = Vec::new();
        for &(lo, hi) in &self.ranges {
            range_to_cidrs(self.version, lo, hi, &mut cidrs);
        }
        cidrs
    }
}

/// Sort and merge overlapping or adjacent ranges.
fn normalize(mut ranges: Vec<(u128, u128)>) -> Vec<(u128, u128)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u128, u128)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Split `[lo, hi]` into the largest aligned blocks, lowest address first.
fn range_to_cidrs(version: IpVersion, lo: u128, hi: u128, out: &mut Vec<IpNetwork>) {
    let max = version.max_length();
    let mut start = lo;
    loop {
        // Biggest block `start` is aligned to, shrunk until it ends at or before `hi`.
        let mut host_bits = max - lo_mask(start, version);
        while host_bits > 0
            && start
                .checked_add(host_mask_bits(host_bits))
                .map_or(true, |end| end > hi)
        {
            host_bits -= 1;
        }
        out.push(IpNetwork::host_bits_of(version, start).truncate(max - host_bits));

        let end = start + host_mask_bits(host_bits);
        if end >= hi {
            break;
        }
        start = end + 1;
    }
}

impl fmt::Display for IpRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.iter_cidrs().iter().join(", "))
    }
}
