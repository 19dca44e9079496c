//! Event signals and scene flags

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// FIFO of named signals waiting to be consumed by conditions
#[derive(Debug, Default)]
pub struct SignalQueue {
    pending: RefCell<Vec<String>>,
}

impl SignalQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a signal
    pub fn push(&self, signal: impl Into<String>) {
        self.pending.borrow_mut().push(signal.into());
    }

    /// Remove the oldest matching signal; returns whether one was pending
    pub fn consume(&self, signal: &str) -> bool {
        let mut pending = self.pending.borrow_mut();
        match pending.iter().position(|s| s == signal) {
            Some(idx) => {
                pending.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Check for a pending signal without consuming it
    pub fn has(&self, signal: &str) -> bool {
        self.pending.borrow().iter().any(|s| s == signal)
    }

    /// Number of pending signals
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

/// Boolean flags scoped to the running scene
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SceneState {
    flags: IndexMap<String, bool>,
}

impl SceneState {
    /// Create an empty scene state
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a flag
    pub fn set_flag(&mut self, flag: impl Into<String>, value: bool) {
        self.flags.insert(flag.into(), value);
    }

    /// Read a flag; unset flags are false
    pub fn flag(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// Clear all flags
    pub fn clear(&mut self) {
        self.flags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_consumed_once() {
        let queue = SignalQueue::new();
        queue.push("DOOR_OPEN");
        queue.push("DOOR_OPEN");
        assert!(queue.has("DOOR_OPEN"));
        assert!(queue.consume("DOOR_OPEN"));
        assert!(queue.consume("DOOR_OPEN"));
        assert!(!queue.consume("DOOR_OPEN"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_scene_flags() {
        let mut state = SceneState::new();
        assert!(!state.flag("boss_defeated"));
        state.set_flag("boss_defeated", true);
        assert!(state.flag("boss_defeated"));
        state.clear();
        assert!(!state.flag("boss_defeated"));
    }
}
