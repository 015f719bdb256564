//! Execution configuration.

/// Default number of pre-step snapshots kept for single-step undo.
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// Tunables for a machine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// How many pre-step snapshots to keep for undo. `0` keeps none.
    pub history_limit: usize,
    /// Optional step budget for `run`. `None` runs until the machine stops.
    pub max_steps: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_steps: None,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = VmConfig::new();
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.max_steps, None);
    }

    #[test]
    fn builder_setters() {
        let config = VmConfig::new().with_history_limit(0).with_max_steps(50);
        assert_eq!(config.history_limit, 0);
        assert_eq!(config.max_steps, Some(50));
    }
}
