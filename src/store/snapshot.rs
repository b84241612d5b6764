//! JSON snapshot persistence for the engine state.
//!
//! Indexes are not stored; they are rebuilt when a snapshot is read.

use super::IpamState;
use crate::error::{IpamError, Result};
use std::path::Path;

/// Write `state` to `path` as pretty-printed JSON.
pub fn save_snapshot(state: &IpamState, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(state)
        .map_err(|e| IpamError::Persistence(format!("Error serializing JSON: {e}")))?;
    std::fs::write(path, json).map_err(|e| {
        IpamError::Persistence(format!("Error writing snapshot {}: {e}", path.display()))
    })?;
    log::info!("Wrote snapshot: {}", path.display());
    Ok(())
}

/// Read a snapshot from `path` and rebuild its index.
///
/// # Returns
/// * `Ok(IpamState)` - state with index rebuilt and the id counter past every id
/// * `Err` - if the file is missing, the JSON is invalid, or prefixes collide
pub fn load_snapshot(path: &Path) -> Result<IpamState> {
    if !path.exists() {
        return Err(IpamError::Persistence(format!(
            "Snapshot file does not exist: {}",
            path.display()
        )));
    }
    log::info!("Reading from snapshot file: {}", path.display());
    let json = std::fs::read_to_string(path).map_err(|e| {
        IpamError::Persistence(format!("Error reading snapshot {}: {e}", path.display()))
    })?;

    let mut deserializer = serde_json::Deserializer::from_str(&json);
    let mut state: IpamState = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| {
            IpamError::Persistence(format!(
                "Error parsing snapshot JSON: path={} error={}",
                e.path(),
                e
            ))
        })?;

    state.namespace(state.default_namespace)?;
    state.rebuild_index()?;
    state.next_id = state.next_id.max(state.max_id() + 1);
    log::info!(
        "Loaded {} prefixes and {} addresses",
        state.prefixes.len(),
        state.ip_addresses.len()
    );
    Ok(state)
}
