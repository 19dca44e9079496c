//! Per-frame dedupe state
//!
//! A host may call the update hook more than once per visual frame. Calls
//! closer together than the frame threshold share one set of dedupe keys;
//! the first call of a new frame clears them.

use serde::Serialize;
use std::collections::HashSet;
use tickflow_core::{EntityId, ValueMap};

#[derive(Debug, Default)]
pub struct FrameState {
    last_update_ms: Option<f64>,
    frame: u64,
    collisions: HashSet<(EntityId, EntityId, String)>,
    components: HashSet<(EntityId, String)>,
    actions: HashSet<String>,
}

#[derive(Serialize)]
struct ActionSignature<'a> {
    entity: &'a str,
    action: &'a str,
    params: &'a ValueMap,
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note an update at `now_ms`; returns true if it starts a new frame
    pub fn begin(&mut self, now_ms: f64, threshold_ms: f64) -> bool {
        let repeated = self
            .last_update_ms
            .is_some_and(|last| now_ms - last < threshold_ms);
        self.last_update_ms = Some(now_ms);
        if repeated {
            return false;
        }

        self.frame += 1;
        self.collisions.clear();
        self.components.clear();
        self.actions.clear();
        true
    }

    /// Frames started so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Claim a collision pair; the pair is unordered
    pub fn claim_collision(&mut self, a: &EntityId, b: &EntityId, kind: &str) -> bool {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.collisions
            .insert((first.clone(), second.clone(), kind.to_string()))
    }

    /// Claim one component's execution for this frame
    pub fn claim_component(&mut self, entity: &EntityId, component_id: &str) -> bool {
        self.components
            .insert((entity.clone(), component_id.to_string()))
    }

    /// Claim an action execution by its serialized signature
    ///
    /// Calls whose parameters serialize identically are treated as the same
    /// call. A signature that cannot be serialized is never deduplicated.
    pub fn claim_action(&mut self, entity: &EntityId, action: &str, params: &ValueMap) -> bool {
        let signature = ActionSignature {
            entity: entity.as_str(),
            action,
            params,
        };
        match ron::to_string(&signature) {
            Ok(key) => self.actions.insert(key),
            Err(err) => {
                tracing::warn!(action = %action, error = %err, "action signature unavailable");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickflow_core::params;

    #[test]
    fn test_repeated_update_keeps_keys() {
        let mut frame = FrameState::new();
        let hero = EntityId::from("hero");

        assert!(frame.begin(1000.0, 2.0));
        assert!(frame.claim_component(&hero, "logic-1"));
        assert!(!frame.begin(1001.0, 2.0));
        assert!(!frame.claim_component(&hero, "logic-1"));

        assert!(frame.begin(1016.0, 2.0));
        assert!(frame.claim_component(&hero, "logic-1"));
        assert_eq!(frame.frame(), 2);
    }

    #[test]
    fn test_collision_pair_is_unordered() {
        let mut frame = FrameState::new();
        let (a, b) = (EntityId::from("a"), EntityId::from("b"));
        assert!(frame.claim_collision(&a, &b, "COLLISION_ENTER"));
        assert!(!frame.claim_collision(&b, &a, "COLLISION_ENTER"));
        assert!(frame.claim_collision(&a, &b, "COLLISION_STAY"));
    }

    #[test]
    fn test_action_signature() {
        let mut frame = FrameState::new();
        let hero = EntityId::from("hero");
        let p = params! { "damage" => 10 };

        assert!(frame.claim_action(&hero, "Attack", &p));
        assert!(!frame.claim_action(&hero, "Attack", &p));
        assert!(frame.claim_action(&hero, "Attack", &params! { "damage" => 11 }));
        assert!(frame.claim_action(&EntityId::from("foe"), "Attack", &p));
    }
}
