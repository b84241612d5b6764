//! NAT inside/outside links between addresses.
//!
//! The inside address owns the ordered list of its outside addresses. The reverse
//! link is looked up, never stored.

use crate::models::IpAddressId;
use crate::store::IpamState;

/// The inside address that lists `outside` as one of its NAT outside addresses.
pub(crate) fn nat_inside_of(state: &IpamState, outside: IpAddressId) -> Option<IpAddressId> {
    state
        .ip_addresses
        .values()
        .find(|address| address.nat_outside.contains(&outside))
        .map(|address| address.id)
}

/// Append `outside` to the inside address's list, keeping creation order.
pub(crate) fn attach(state: &mut IpamState, inside: IpAddressId, outside: IpAddressId) {
    if let Some(address) = state.ip_addresses.get_mut(&inside) {
        if !address.nat_outside.contains(&outside) {
            address.nat_outside.push(outside);
        }
    }
}

/// Remove `outside` from whichever inside address lists it.
pub(crate) fn detach(state: &mut IpamState, outside: IpAddressId) {
    if let Some(inside) = nat_inside_of(state, outside) {
        if let Some(address) = state.ip_addresses.get_mut(&inside) {
            address.nat_outside.retain(|id| *id != outside);
            log::debug!("Detached NAT outside {outside} from {}", address.address);
        }
    }
}
