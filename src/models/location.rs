//! Location and location-type data models.
//!
//! A [`LocationType`] carries the allow-list of record kinds that may reference
//! locations of that type.

use super::{LocationId, LocationTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Record kinds that may be associated with a location.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Prefix,
    VlanGroup,
    Vlan,
}

impl ContentKind {
    /// Plural name used in validation messages.
    pub fn verbose_plural(self) -> &'static str {
        match self {
            ContentKind::Prefix => "Prefixes",
            ContentKind::VlanGroup => "VLAN groups",
            ContentKind::Vlan => "VLANs",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Prefix => write!(f, "prefix"),
            ContentKind::VlanGroup => write!(f, "vlan_group"),
            ContentKind::Vlan => write!(f, "vlan"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LocationType {
    pub id: LocationTypeId,
    pub name: String,
    /// Locations of this type must sit under a location of the parent type.
    pub parent: Option<LocationTypeId>,
    pub content_types: BTreeSet<ContentKind>,
}

impl LocationType {
    pub fn permits(&self, kind: ContentKind) -> bool {
        self.content_types.contains(&kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocationTypeAttrs {
    pub name: String,
    pub parent: Option<LocationTypeId>,
    pub content_types: BTreeSet<ContentKind>,
}

impl LocationTypeAttrs {
    pub fn new(name: &str, content_types: &[ContentKind]) -> Self {
        LocationTypeAttrs {
            name: name.to_string(),
            parent: None,
            content_types: content_types.iter().copied().collect(),
        }
    }

    pub fn with_parent(mut self, parent: LocationTypeId) -> Self {
        self.parent = Some(parent);
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub location_type: LocationTypeId,
    pub parent: Option<LocationId>,
}

#[derive(Debug, Clone)]
pub struct LocationAttrs {
    pub name: String,
    pub location_type: LocationTypeId,
    pub parent: Option<LocationId>,
}

impl LocationAttrs {
    pub fn new(name: &str, location_type: LocationTypeId) -> Self {
        LocationAttrs {
            name: name.to_string(),
            location_type,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: LocationId) -> Self {
        self.parent = Some(parent);
        self
    }
}
