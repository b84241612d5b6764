//! IPAM business logic over the committed state.
//!
//! This module contains the engine's algorithms:
//! - [`tree`] - Containment tree maintenance and tree queries
//! - [`allocation`] - Free prefixes, free addresses and free VIDs
//! - [`validation`] - Uniqueness and location scope checks
//! - [`utilization`] - Used/total counts per prefix type
//! - [`nat`] - NAT inside/outside links
//! - [`pattern`] - Address pattern expansion for bulk creation

pub(crate) mod allocation;
pub(crate) mod nat;
mod pattern;
pub(crate) mod tree;
pub(crate) mod utilization;
pub(crate) mod validation;

// Re-export public types
pub use pattern::expand_ip_pattern;
pub use utilization::Utilization;
