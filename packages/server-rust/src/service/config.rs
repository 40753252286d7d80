/// Server-level configuration for the operation pipeline and background work.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Unique identifier for this server node, stamped on every request
    /// context.
    pub node_id: String,
    /// Default timeout for operations in milliseconds.
    pub default_operation_timeout_ms: u64,
    /// Concurrent operations admitted before new ones are shed.
    pub max_concurrent_operations: u32,
    /// Interval between stale-case sweeps in milliseconds.
    pub stale_sweep_interval_ms: u64,
    /// A `New` case untouched for this many seconds is reported as stale.
    pub stale_case_after_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            node_id: "vigil-0".to_string(),
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            stale_sweep_interval_ms: 300_000,
            stale_case_after_secs: 7 * 24 * 3_600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.default_operation_timeout_ms, 30_000);
        assert_eq!(config.max_concurrent_operations, 1000);
        assert_eq!(config.stale_case_after_secs, 604_800);
    }
}
