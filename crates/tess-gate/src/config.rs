use serde::{Deserialize, Serialize};

/// Configuration for the in-memory reference backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    /// Total bytes of persistent data the backend will hold before
    /// reporting `StorageFull`. Covers data streams only; attributes and
    /// metadata are not charged against the quota.
    pub capacity_bytes: u64,
    /// Number of transient object slots available before allocation
    /// reports `OutOfMemory`.
    pub max_transient_objects: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 16 * 1024 * 1024,
            max_transient_objects: 64,
        }
    }
}

impl GateConfig {
    /// A deliberately small quota for exercising `StorageFull` paths.
    pub fn tiny(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            max_transient_objects: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_roomy() {
        let config = GateConfig::default();
        assert!(config.capacity_bytes >= 1024 * 1024);
        assert!(config.max_transient_objects >= 8);
    }

    #[test]
    fn serde_round_trip() {
        let config = GateConfig::tiny(128);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GateConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.capacity_bytes, 128);
        assert_eq!(parsed.max_transient_objects, 4);
    }
}
