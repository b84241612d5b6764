//! IP address management engine.
//!
//! Tracks prefixes and addresses per namespace, keeps their containment tree, and
//! answers allocation questions about the space inside a prefix:
//! - [`Ipam`] - the engine facade; every create, update, delete and query goes here
//! - [`models`] - addresses, networks, range sets and the stored records
//! - [`processing`] - tree maintenance, allocation, validation and utilization
//! - [`store`] - committed state, lookup indexes and JSON snapshots
//! - [`output`] - prefix tree report for the terminal
//! - [`config`] - constants and environment configuration

pub mod config;
pub mod error;
mod ipam;
pub mod models;
pub mod output;
pub mod processing;
pub mod store;

// Re-export public types
pub use error::{IpamError, Result};
pub use ipam::Ipam;
pub use processing::Utilization;
