//! Engine constants and environment driven configuration.

use std::env;

/// Lowest valid VLAN ID.
pub const VID_MIN: u16 = 1;
/// Highest valid VLAN ID.
pub const VID_MAX: u16 = 4094;

/// Name of the namespace that always exists.
pub const DEFAULT_NAMESPACE: &str = "Global";
pub const DEFAULT_SNAPSHOT_FILE: &str = "ipam_snapshot.json";
pub const DEFAULT_LOG_CONFIG: &str = "log4rs.yml";
/// Upper bound on the number of addresses one bulk pattern may expand to.
pub const MAX_PATTERN_EXPANSION: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Snapshot file the reporting binary reads.
    pub snapshot_file: String,
    pub log_config: String,
    pub default_namespace: String,
    pub max_pattern_expansion: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
            log_config: DEFAULT_LOG_CONFIG.to_string(),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            max_pattern_expansion: MAX_PATTERN_EXPANSION,
        }
    }
}

impl EngineConfig {
    /// Read `IPAM_*` variables, falling back to the defaults.
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let max_pattern_expansion = match env::var("IPAM_MAX_PATTERN_EXPANSION") {
            Ok(v) => v.parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid IPAM_MAX_PATTERN_EXPANSION='{v}'");
                defaults.max_pattern_expansion
            }),
            Err(_) => defaults.max_pattern_expansion,
        };
        EngineConfig {
            snapshot_file: env::var("IPAM_SNAPSHOT").unwrap_or(defaults.snapshot_file),
            log_config: env::var("IPAM_LOG_CONFIG").unwrap_or(defaults.log_config),
            default_namespace: env::var("IPAM_DEFAULT_NAMESPACE")
                .unwrap_or(defaults.default_namespace),
            max_pattern_expansion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.default_namespace, "Global");
        assert_eq!(config.snapshot_file, "ipam_snapshot.json");
        assert_eq!(config.max_pattern_expansion, 4096);
    }
}
