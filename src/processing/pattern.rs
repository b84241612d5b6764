//! Address pattern expansion for bulk creation.
//!
//! A pattern is an address with one or more bracketed groups, e.g.
//! `192.0.2.[1-3,10]/24` or `2001:db8::[a-c]/64`. Groups hold comma separated values
//! or inclusive ranges: decimal for IPv4, hex for IPv6.

use crate::error::{IpamError, Result};
use crate::models::IpNetwork;
use itertools::Itertools;
use regex::Regex;
use std::sync::OnceLock;

static GROUP_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_group_regex() -> &'static Regex {
    GROUP_REGEX.get_or_init(|| Regex::new(r"\[([0-9a-fA-F,\-]+)\]").expect("Invalid Regex"))
}

/// Inclusive ranges of one bracket group, in the order written.
fn parse_group(group: &str, radix: u32) -> Result<Vec<(u32, u32)>> {
    let parse = |s: &str| {
        u32::from_str_radix(s.trim(), radix)
            .map_err(|_| IpamError::Parse(format!("invalid pattern value '{s}' in [{group}]")))
    };
    let mut ranges = Vec::new();
    for part in group.split(',') {
        let (lo, hi) = match part.split_once('-') {
            Some((lo, hi)) => (parse(lo)?, parse(hi)?),
            None => {
                let v = parse(part)?;
                (v, v)
            }
        };
        if lo > hi {
            return Err(IpamError::Parse(format!("descending range '{part}' in [{group}]")));
        }
        ranges.push((lo, hi));
    }
    Ok(ranges)
}

/// Number of values in a group, `None` on overflow.
fn group_len(ranges: &[(u32, u32)]) -> Option<usize> {
    ranges.iter().try_fold(0usize, |acc, (lo, hi)| {
        let len = usize::try_from(u64::from(hi - lo) + 1).ok()?;
        acc.checked_add(len)
    })
}

fn expand_group(ranges: &[(u32, u32)], radix: u32) -> Vec<String> {
    ranges
        .iter()
        .flat_map(|&(lo, hi)| lo..=hi)
        .map(|v| match radix {
            16 => format!("{v:x}"),
            _ => v.to_string(),
        })
        .collect()
}

/// Expand `pattern` into every address it names, first group varying slowest.
///
/// The result count is checked against `limit` before any address is built.
///
/// # Returns
/// * `Ok(Vec<IpNetwork>)` - addresses in expansion order
/// * `Err` - on malformed groups, invalid addresses, or more than `limit` results
pub fn expand_ip_pattern(pattern: &str, limit: usize) -> Result<Vec<IpNetwork>> {
    let pattern = pattern.trim();
    let radix = if pattern.contains(':') { 16 } else { 10 };

    let captures: Vec<_> = get_group_regex().captures_iter(pattern).collect();
    if captures.is_empty() {
        if pattern.contains('[') || pattern.contains(']') {
            return Err(IpamError::Parse(format!("malformed pattern '{pattern}'")));
        }
        return Ok(vec![pattern.parse()?]);
    }

    let mut literals = Vec::with_capacity(captures.len() + 1);
    let mut group_ranges = Vec::with_capacity(captures.len());
    let mut last = 0;
    for cap in &captures {
        let (Some(whole), Some(inner)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        literals.push(&pattern[last..whole.start()]);
        group_ranges.push(parse_group(inner.as_str(), radix)?);
        last = whole.end();
    }
    let tail = &pattern[last..];

    let count = group_ranges
        .iter()
        .try_fold(1usize, |acc, ranges| acc.checked_mul(group_len(ranges)?));
    match count {
        Some(count) if count <= limit => {}
        Some(count) => {
            return Err(IpamError::InvalidValue(format!(
                "pattern '{pattern}' expands to {count} addresses, limit is {limit}"
            )))
        }
        None => {
            return Err(IpamError::InvalidValue(format!(
                "pattern '{pattern}' expands to too many addresses, limit is {limit}"
            )))
        }
    }

    let groups: Vec<Vec<String>> = group_ranges
        .iter()
        .map(|ranges| expand_group(ranges, radix))
        .collect();
    groups
        .into_iter()
        .multi_cartesian_product()
        .map(|values| {
            let address: String = literals
                .iter()
                .zip(values.iter())
                .map(|(literal, value)| format!("{literal}{value}"))
                .chain(std::iter::once(tail.to_string()))
                .collect();
            address.parse::<IpNetwork>()
        })
        .collect()
}
