/// Orchestrator-level execution policy (spec §4.9, §6). Spec §4.9 calls out
/// the partial-fill timeout explicitly as something that "must be configured,
/// not hard-coded" — this is that configuration, not a magic number in
/// `trx-execution`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// How long the order manager waits for further fills after a partial
    /// before cancelling the remainder and opening at the size filled so far.
    pub partial_fill_timeout_ms: u64,
    /// Bounded capacity of the per-trade execution-report queue (spec §9:
    /// "back-pressure by bounded buffer, drop-newest with alert on overflow").
    pub execution_queue_capacity: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig { partial_fill_timeout_ms: 30_000, execution_queue_capacity: 256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = ExecutionConfig::default();
        assert!(cfg.partial_fill_timeout_ms > 0);
        assert!(cfg.execution_queue_capacity > 0);
    }

    #[test]
    fn deserializes_from_partial_yaml() {
        let cfg: ExecutionConfig = serde_yaml::from_str("partial_fill_timeout_ms: 5000").unwrap();
        assert_eq!(cfg.partial_fill_timeout_ms, 5000);
        assert_eq!(cfg.execution_queue_capacity, ExecutionConfig::default().execution_queue_capacity);
    }
}
