//! Orchestrator configuration
//!
//! Every field has a working default, so a RON config only needs to name
//! what it changes:
//!
//! ```ron
//! (frame_threshold_ms: 4.0, ground_tags: ["Wall", "Platform"])
//! ```

use serde::{Deserialize, Serialize};
use tickflow_flow::RuntimeOptions;

/// Settings for a [`LogicSystem`](crate::LogicSystem)
///
/// # Example
///
/// ```
/// use tickflow_logic::LogicConfig;
///
/// let mut config = LogicConfig::default();
/// assert_eq!(config.max_steps_per_tick(), 64);
///
/// config.set_max_steps_per_tick(0);
/// assert_eq!(config.max_steps_per_tick(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicConfig {
    /// Updates closer together than this (ms) belong to the same frame
    frame_threshold_ms: f64,
    /// Node traversals per module instance per tick (at least 1)
    max_steps_per_tick: usize,
    /// Log failed module results at warn level
    log_module_failures: bool,
    /// Trace every event emitted on the bus
    debug_events: bool,
    /// Collision tags that count as ground
    ground_tags: Vec<String>,
}

impl Default for LogicConfig {
    fn default() -> Self {
        Self {
            frame_threshold_ms: 2.0,
            max_steps_per_tick: 64,
            log_module_failures: true,
            debug_events: false,
            ground_tags: vec!["Wall".to_string()],
        }
    }
}

impl LogicConfig {
    pub fn frame_threshold_ms(&self) -> f64 {
        self.frame_threshold_ms.max(0.0)
    }

    /// Set the same-frame window; negative values become 0
    pub fn set_frame_threshold_ms(&mut self, ms: f64) {
        self.frame_threshold_ms = ms.max(0.0);
    }

    pub fn max_steps_per_tick(&self) -> usize {
        self.max_steps_per_tick.max(1)
    }

    /// Set the per-tick step bound; clamped to at least 1
    pub fn set_max_steps_per_tick(&mut self, steps: usize) {
        self.max_steps_per_tick = steps.max(1);
    }

    pub fn log_module_failures(&self) -> bool {
        self.log_module_failures
    }

    pub fn set_log_module_failures(&mut self, enabled: bool) {
        self.log_module_failures = enabled;
    }

    pub fn debug_events(&self) -> bool {
        self.debug_events
    }

    pub fn set_debug_events(&mut self, enabled: bool) {
        self.debug_events = enabled;
    }

    pub fn ground_tags(&self) -> &[String] {
        &self.ground_tags
    }

    pub fn set_ground_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ground_tags = tags.into_iter().map(Into::into).collect();
    }

    /// Interpreter options derived from this config
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            max_steps_per_tick: self.max_steps_per_tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LogicConfig::default();
        assert_eq!(config.frame_threshold_ms(), 2.0);
        assert_eq!(config.max_steps_per_tick(), 64);
        assert!(config.log_module_failures());
        assert!(!config.debug_events());
        assert_eq!(config.ground_tags(), ["Wall".to_string()]);
    }

    #[test]
    fn test_setters_clamp() {
        let mut config = LogicConfig::default();
        config.set_frame_threshold_ms(-5.0);
        config.set_max_steps_per_tick(0);
        assert_eq!(config.frame_threshold_ms(), 0.0);
        assert_eq!(config.runtime_options().max_steps_per_tick, 1);
    }

    #[test]
    fn test_partial_ron() {
        let config: LogicConfig =
            ron::from_str("(max_steps_per_tick: 0, ground_tags: [\"Floor\"])").unwrap();
        assert_eq!(config.max_steps_per_tick(), 1);
        assert_eq!(config.ground_tags(), ["Floor".to_string()]);
        assert_eq!(config.frame_threshold_ms(), 2.0);
    }
}
