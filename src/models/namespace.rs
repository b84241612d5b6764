//! Namespace (uniqueness scope) data model.

use super::NamespaceId;
use serde::{Deserialize, Serialize};

/// A partition within which prefix and address uniqueness is enforced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub id: NamespaceId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}
