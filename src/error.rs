//! Error types for the IPAM engine.
//!
//! Every validation failure is raised before any state is mutated, and names the
//! rule that was broken together with the offending value.

use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, IpamError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IpamError {
    /// Malformed address, CIDR or pattern input.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A record with the same identity already exists in the scope.
    #[error("Uniqueness violation: {rule}: {value}")]
    Uniqueness { rule: String, value: String },

    /// Location-type incompatibility or an invalid parent/child relationship.
    #[error("Containment violation: {0}")]
    Containment(String),

    /// No available prefix, address or VID was found.
    #[error("Exhausted: {0}")]
    Exhaustion(String),

    /// A value outside its allowed range (VID, prefix length, ...).
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Snapshot could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl IpamError {
    pub(crate) fn uniqueness(rule: &str, value: impl ToString) -> Self {
        IpamError::Uniqueness {
            rule: rule.to_string(),
            value: value.to_string(),
        }
    }

}
