//! IP address and CIDR value model.
//!
//! Provides [`IpNetwork`], a binary-comparable address/prefix value covering both
//! IPv4 and IPv6, along with the mask and boundary helpers used by the tree and the
//! allocation engine. All arithmetic runs on `u128` so the full IPv6 range is safe.

use crate::error::{IpamError, Result};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Maximum prefix length for IPv4 (32 bits).
const MAX_LENGTH_V4: u8 = 32;
/// Maximum prefix length for IPv6 (128 bits).
const MAX_LENGTH_V6: u8 = 128;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    pub fn max_length(self) -> u8 {
        match self {
            IpVersion::V4 => MAX_LENGTH_V4,
            IpVersion::V6 => MAX_LENGTH_V6,
        }
    }

    pub fn of(addr: &IpAddr) -> IpVersion {
        match addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpVersion::V4 => write!(f, "IPv4"),
            IpVersion::V6 => write!(f, "IPv6"),
        }
    }
}

/// Mask of the `host_bits` low bits. `host_bits` may be 0..=128.
pub(crate) fn host_mask_bits(host_bits: u8) -> u128 {
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

/// Minimum prefix length an address can be the network address of, based on its
/// trailing zero bits.
pub(crate) fn lo_mask(bits: u128, version: IpVersion) -> u8 {
    let max = version.max_length();
    if bits == 0 {
        return 0;
    }
    let trailing_zeros = (bits.trailing_zeros() as u8).min(max);
    max - trailing_zeros
}

fn bits_to_addr(bits: u128, version: IpVersion) -> IpAddr {
    match version {
        IpVersion::V4 => IpAddr::V4(Ipv4Addr::from(bits as u32)),
        IpVersion::V6 => IpAddr::V6(Ipv6Addr::from(bits)),
    }
}

fn addr_to_bits(addr: &IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(*v4) as u128,
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

/// An IPv4 or IPv6 address with a prefix length.
///
/// Ordering is `(version, address bits, prefix_len)`, so a supernet sorts directly
/// before its subnets and a sorted sequence of prefixes is a pre-order walk of their
/// containment tree.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct IpNetwork {
    version: IpVersion,
    bits: u128,
    prefix_len: u8,
}

impl IpNetwork {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<IpNetwork> {
        let version = IpVersion::of(&addr);
        if prefix_len > version.max_length() {
            return Err(IpamError::Parse(format!(
                "prefix length /{prefix_len} is too long for {version} address {addr}"
            )));
        }
        Ok(IpNetwork {
            version,
            bits: addr_to_bits(&addr),
            prefix_len,
        })
    }

    pub fn from_bits(version: IpVersion, bits: u128, prefix_len: u8) -> Result<IpNetwork> {
        if prefix_len > version.max_length() {
            return Err(IpamError::InvalidValue(format!(
                "prefix length /{prefix_len} is too long for {version}"
            )));
        }
        if version == IpVersion::V4 && bits > u32::MAX as u128 {
            return Err(IpamError::InvalidValue(format!(
                "value {bits:#x} does not fit an IPv4 address"
            )));
        }
        Ok(IpNetwork {
            version,
            bits,
            prefix_len,
        })
    }

    /// A single host at full prefix length (/32 or /128).
    pub fn host(addr: IpAddr) -> IpNetwork {
        let version = IpVersion::of(&addr);
        IpNetwork {
            version,
            bits: addr_to_bits(&addr),
            prefix_len: version.max_length(),
        }
    }

    pub(crate) fn host_bits_of(version: IpVersion, bits: u128) -> IpNetwork {
        IpNetwork {
            version,
            bits,
            prefix_len: version.max_length(),
        }
    }

    /// Parse from packed big-endian bytes (4 or 16) plus a prefix length.
    pub fn from_packed(bytes: &[u8], prefix_len: u8) -> Result<IpNetwork> {
        let addr = match bytes.len() {
            4 => {
                let octets: [u8; 4] = bytes
                    .try_into()
                    .map_err(|_| IpamError::Parse("invalid IPv4 byte length".to_string()))?;
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            16 => {
                let octets: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| IpamError::Parse("invalid IPv6 byte length".to_string()))?;
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            n => {
                return Err(IpamError::Parse(format!(
                    "packed address must be 4 or 16 bytes, got {n}"
                )))
            }
        };
        IpNetwork::new(addr, prefix_len)
    }

    /// Packed big-endian bytes of the address (host bits included).
    pub fn to_packed(&self) -> Vec<u8> {
        match self.addr() {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        }
    }

    pub fn version(&self) -> IpVersion {
        self.version
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Address bits, host bits included.
    pub fn bits(&self) -> u128 {
        self.bits
    }

    pub fn addr(&self) -> IpAddr {
        bits_to_addr(self.bits, self.version)
    }

    pub fn host_bits(&self) -> u8 {
        self.version.max_length() - self.prefix_len
    }

    /// Lowest (network) address bits.
    pub fn lo(&self) -> u128 {
        self.bits & !host_mask_bits(self.host_bits())
    }

    /// Highest (broadcast) address bits.
    pub fn hi(&self) -> u128 {
        self.lo() | host_mask_bits(self.host_bits())
    }

    /// The canonical network of this value: host bits zeroed, same prefix length.
    pub fn network(&self) -> IpNetwork {
        IpNetwork {
            bits: self.lo(),
            ..*self
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.bits == self.lo()
    }

    /// Number of addresses covered, saturating at `u128::MAX` for `::/0`.
    pub fn num_addresses(&self) -> u128 {
        let host_bits = self.host_bits();
        if host_bits >= 128 {
            u128::MAX
        } else {
            1u128 << host_bits
        }
    }

    /// The enclosing network of prefix length `len`, clamped to this one's length.
    pub(crate) fn truncate(&self, len: u8) -> IpNetwork {
        let len = len.min(self.prefix_len);
        let host_bits = self.version.max_length() - len;
        IpNetwork {
            version: self.version,
            bits: self.bits & !host_mask_bits(host_bits),
            prefix_len: len,
        }
    }

    /// True when `other` lies entirely within this network.
    pub fn contains(&self, other: &IpNetwork) -> bool {
        self.version == other.version
            && other.prefix_len >= self.prefix_len
            && other.truncate(self.prefix_len).bits == self.lo()
    }
}

impl FromStr for IpNetwork {
    type Err = IpamError;

    /// Parse `addr/len`, or a bare address as a host route.
    fn from_str(addr_cidr: &str) -> Result<IpNetwork> {
        let addr_cidr = addr_cidr.trim();
        let (addr_part, len_part) = match addr_cidr.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (addr_cidr, None),
        };
        let addr: IpAddr = addr_part
            .parse()
            .map_err(|_| IpamError::Parse(format!("invalid address '{addr_part}'")))?;
        match len_part {
            Some(len) => {
                let len: u8 = len
                    .parse()
                    .map_err(|_| IpamError::Parse(format!("invalid prefix length '{len}'")))?;
                IpNetwork::new(addr, len)
            }
            None => Ok(IpNetwork::host(addr)),
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.prefix_len)
    }
}

impl Serialize for IpNetwork {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for IpNetwork {
    fn deserialize<D>(deserializer: D) -> std::result::Result<IpNetwork, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        IpNetwork::from_str(&s).map_err(|e| de::Error::custom(format!("invalid CIDR {s}: {e}")))
    }
}

/// Serde adapter that stores a network as its packed big-endian bytes plus its
/// prefix length. Used for the records kept in snapshots.
pub(crate) mod packed {
    use super::IpNetwork;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct PackedNetwork {
        value: Vec<u8>,
        prefix_len: u8,
    }

    pub fn serialize<S>(network: &IpNetwork, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        PackedNetwork {
            value: network.to_packed(),
            prefix_len: network.prefix_len(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<IpNetwork, D::Error>
    where
        D: Deserializer<'de>,
    {
        let packed = PackedNetwork::deserialize(deserializer)?;
        IpNetwork::from_packed(&packed.value, packed.prefix_len).map_err(de::Error::custom)
    }
}
