//! VLAN group and VLAN data models.

use super::{LocationId, VlanGroupId, VlanId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Regex matching runs of characters that are not allowed in a slug.
static SLUG_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_slug_regex() -> &'static Regex {
    SLUG_REGEX.get_or_init(|| Regex::new(r"[^a-z0-9_]+").expect("Invalid Regex"))
}

/// Lowercase `name` and collapse anything else into single dashes.
pub fn slugify(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    get_slug_regex()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VlanGroup {
    pub id: VlanGroupId,
    pub name: String,
    pub slug: String,
    pub location: Option<LocationId>,
    #[serde(default)]
    pub description: String,
}

impl fmt::Display for VlanGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VlanGroupAttrs {
    pub name: String,
    /// Derived from the name when empty.
    pub slug: String,
    pub location: Option<LocationId>,
    pub description: String,
}

impl VlanGroupAttrs {
    pub fn new(name: &str) -> Self {
        VlanGroupAttrs {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn at_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum VlanStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Vlan {
    pub id: VlanId,
    /// VLAN ID, 1-4094.
    pub vid: u16,
    pub name: String,
    pub group: Option<VlanGroupId>,
    pub location: Option<LocationId>,
    pub status: VlanStatus,
}

impl fmt::Display for Vlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.vid)
    }
}

#[derive(Debug, Clone)]
pub struct VlanAttrs {
    pub vid: u16,
    pub name: String,
    pub group: Option<VlanGroupId>,
    pub location: Option<LocationId>,
    pub status: VlanStatus,
}

impl VlanAttrs {
    pub fn new(vid: u16, name: &str) -> Self {
        VlanAttrs {
            vid,
            name: name.to_string(),
            group: None,
            location: None,
            status: VlanStatus::default(),
        }
    }

    pub fn in_group(mut self, group: VlanGroupId) -> Self {
        self.group = Some(group);
        self
    }

    pub fn at_location(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }
}
