//! Checks run before any record is committed.
//!
//! Each function inspects the candidate record against the committed state and
//! returns the first rule it breaks. Nothing here mutates the state.

use crate::config::{VID_MAX, VID_MIN};
use crate::error::{IpamError, Result};
use crate::models::{
    ContentKind, IpAddress, IpAddressId, Location, LocationId, LocationTypeAttrs,
    Prefix, PrefixId, Vlan, VlanGroup, VlanGroupId, VlanId,
};
use crate::store::IpamState;

/// Turn a missing referenced record into a containment error.
fn referenced<T>(result: Result<T>) -> Result<T> {
    result.map_err(|e| match e {
        IpamError::NotFound { kind, id } => {
            IpamError::Containment(format!("referenced {kind} {id} does not exist"))
        }
        other => other,
    })
}

/// The location's type must list `kind` among its permitted content.
pub(crate) fn check_location_permits(
    state: &IpamState,
    location: Option<LocationId>,
    kind: ContentKind,
) -> Result<()> {
    let Some(location) = location else {
        return Ok(());
    };
    let location = referenced(state.location(location))?;
    let location_type = referenced(state.location_type(location.location_type))?;
    if !location_type.permits(kind) {
        return Err(IpamError::Containment(format!(
            "{} may not associate to locations of type \"{}\"",
            kind.verbose_plural(),
            location_type.name
        )));
    }
    Ok(())
}

/// True when `location` is `ancestor` or sits anywhere below it.
pub(crate) fn is_location_within(
    state: &IpamState,
    location: LocationId,
    ancestor: LocationId,
) -> Result<bool> {
    let mut current = Some(location);
    while let Some(id) = current {
        if id == ancestor {
            return Ok(true);
        }
        current = state.location(id)?.parent;
    }
    Ok(false)
}

pub(crate) fn validate_prefix(
    state: &IpamState,
    candidate: &Prefix,
    exclude: Option<PrefixId>,
) -> Result<()> {
    referenced(state.namespace(candidate.namespace))?;
    if let Some(existing) = state.index.prefix_at(candidate.namespace, &candidate.prefix) {
        if Some(existing) != exclude {
            return Err(IpamError::uniqueness(
                "prefix must be unique within namespace",
                &candidate.prefix,
            ));
        }
    }
    check_location_permits(state, candidate.location, ContentKind::Prefix)
}

/// Two records with the same host collide unless told apart by role or endpoint.
fn duplicate_rule(candidate: &IpAddress, other: &IpAddress) -> Option<&'static str> {
    match (candidate.endpoint, other.endpoint) {
        (Some(a), Some(b)) if a == b => Some("address must be unique per assigned endpoint"),
        (Some(_), Some(_)) => None,
        _ if candidate.address.prefix_len() == other.address.prefix_len()
            && candidate.role == other.role =>
        {
            Some("address must be unique within namespace unless roles differ")
        }
        _ => None,
    }
}

pub(crate) fn validate_ip_address(
    state: &IpamState,
    candidate: &IpAddress,
    nat_inside: Option<IpAddressId>,
    exclude: Option<IpAddressId>,
) -> Result<()> {
    referenced(state.namespace(candidate.namespace))?;

    for other_id in state.index.addresses_at(candidate.namespace, &candidate.host()) {
        if Some(other_id) == exclude {
            continue;
        }
        let other = state.ip_address(other_id)?;
        if let Some(rule) = duplicate_rule(candidate, other) {
            return Err(IpamError::uniqueness(rule, &candidate.address));
        }
    }

    if let Some(inside_id) = nat_inside {
        if Some(inside_id) == exclude {
            return Err(IpamError::Containment(format!(
                "{} cannot be its own NAT inside address",
                candidate.address
            )));
        }
        let inside = referenced(state.ip_address(inside_id))?;
        if super::nat::nat_inside_of(state, inside_id).is_some() {
            return Err(IpamError::Containment(format!(
                "NAT inside {} is itself a NAT outside address",
                inside.address
            )));
        }
        if !candidate.nat_outside.is_empty() {
            return Err(IpamError::Containment(format!(
                "{} has NAT outside addresses and cannot be a NAT outside address",
                candidate.address
            )));
        }
    }
    Ok(())
}

pub(crate) fn validate_location_type(state: &IpamState, attrs: &LocationTypeAttrs) -> Result<()> {
    if let Some(parent) = attrs.parent {
        referenced(state.location_type(parent))?;
    }
    if state.location_types.values().any(|lt| lt.name == attrs.name) {
        return Err(IpamError::uniqueness("location type name must be unique", &attrs.name));
    }
    Ok(())
}

pub(crate) fn validate_location(state: &IpamState, candidate: &Location) -> Result<()> {
    let location_type = referenced(state.location_type(candidate.location_type))?;
    match (location_type.parent, candidate.parent) {
        (Some(required), Some(parent)) => {
            let parent = referenced(state.location(parent))?;
            if parent.location_type != required {
                let required = state.location_type(required)?;
                return Err(IpamError::Containment(format!(
                    "A Location of type \"{}\" can only have a Location of type \"{}\" as its parent",
                    location_type.name, required.name
                )));
            }
        }
        (Some(required), None) => {
            let required = state.location_type(required)?;
            return Err(IpamError::Containment(format!(
                "A Location of type \"{}\" must have a parent Location of type \"{}\"",
                location_type.name, required.name
            )));
        }
        (None, Some(_)) => {
            return Err(IpamError::Containment(format!(
                "A Location of type \"{}\" may not have a parent Location",
                location_type.name
            )));
        }
        (None, None) => {}
    }
    let clash = state
        .locations
        .values()
        .any(|l| l.parent == candidate.parent && l.name == candidate.name);
    if clash {
        return Err(IpamError::uniqueness(
            "location name must be unique under its parent",
            &candidate.name,
        ));
    }
    Ok(())
}

pub(crate) fn validate_vlan_group(
    state: &IpamState,
    candidate: &VlanGroup,
    exclude: Option<VlanGroupId>,
) -> Result<()> {
    check_location_permits(state, candidate.location, ContentKind::VlanGroup)?;
    for group in state.vlan_groups.values() {
        if Some(group.id) == exclude || group.location != candidate.location {
            continue;
        }
        if group.name == candidate.name {
            return Err(IpamError::uniqueness(
                "VLAN group name must be unique per location",
                &candidate.name,
            ));
        }
        if group.slug == candidate.slug {
            return Err(IpamError::uniqueness(
                "VLAN group slug must be unique per location",
                &candidate.slug,
            ));
        }
    }
    Ok(())
}

pub(crate) fn validate_vlan(
    state: &IpamState,
    candidate: &Vlan,
    exclude: Option<VlanId>,
) -> Result<()> {
    if !(VID_MIN..=VID_MAX).contains(&candidate.vid) {
        return Err(IpamError::InvalidValue(format!(
            "VID must be between {VID_MIN} and {VID_MAX}, got {}",
            candidate.vid
        )));
    }
    check_location_permits(state, candidate.location, ContentKind::Vlan)?;

    let Some(group_id) = candidate.group else {
        return Ok(());
    };
    let group = referenced(state.vlan_group(group_id))?;
    for vlan in state.vlans.values() {
        if Some(vlan.id) == exclude || vlan.group != Some(group_id) {
            continue;
        }
        if vlan.vid == candidate.vid {
            return Err(IpamError::uniqueness(
                "VID must be unique within VLAN group",
                candidate.vid,
            ));
        }
        if vlan.name == candidate.name {
            return Err(IpamError::uniqueness(
                "VLAN name must be unique within VLAN group",
                &candidate.name,
            ));
        }
    }

    if let (Some(group_location), Some(location)) = (group.location, candidate.location) {
        if !is_location_within(state, location, group_location)? {
            let location = state.location(location)?;
            return Err(IpamError::Containment(format!(
                "The assigned group belongs to a location that does not include location \"{}\"",
                location.name
            )));
        }
    }
    Ok(())
}
