//! Tickflow Actions - default behavior vocabulary
//!
//! Registers the stock actions and conditions onto explicitly constructed
//! registries. Hosts typically call [`register_defaults`] first and then
//! register game-specific entries, which replace defaults of the same name.
//!
//! ## Actions
//!
//! | Group | Names |
//! |-------|-------|
//! | Movement | `Move`, `Jump`, `MoveToward`, `ChaseTarget` |
//! | Combat | `Attack`, `FireProjectile`, `TakeDamage`, `Heal` |
//! | Control | `SetVar`, `Enable`, `Disable`, `SpawnEntity`, `StartModule` |
//! | Presentation | `Rotate`, `Pulse`, `ShowDialogue`, `PlaySound` |
//! | Scene | `ChangeScene`, `CHANGE_SCENE`, `SET_SCENE_FLAG` |
//! | Signals | `EmitEventSignal`, `ClearSignal` |
//!
//! ## Conditions
//!
//! `Always`, `VariableEquals`, `Compare`, `IsGrounded`, `IsAlive`, `HpBelow`,
//! `KeyPressed`, `OnEventSignal`, `SignalFlag`, `IF_SCENE_FLAG`

mod combat;
mod conditions;
mod control;
mod movement;
mod presentation;
mod scene;
mod signals;
mod support;

pub use combat::{apply_damage, Attack};

use tickflow_core::{ActionRegistry, ConditionRegistry};

/// Register every default action and condition
pub fn register_defaults(actions: &ActionRegistry, conditions: &ConditionRegistry) {
    register_actions(actions);
    register_conditions(conditions);
}

/// Register the default actions only
pub fn register_actions(actions: &ActionRegistry) {
    movement::register(actions);
    combat::register(actions);
    control::register(actions);
    presentation::register(actions);
    scene::register(actions);
    signals::register(actions);
    tracing::debug!(count = actions.available().len(), "default actions registered");
}

/// Register the default conditions only
pub fn register_conditions(conditions: &ConditionRegistry) {
    conditions::register_conditions(conditions);
    signals::register_conditions(conditions);
    scene::register_conditions(conditions);
    tracing::debug!(count = conditions.available().len(), "default conditions registered");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let actions = ActionRegistry::new();
        let conditions = ConditionRegistry::new();
        register_defaults(&actions, &conditions);

        for name in [
            "Move", "Jump", "MoveToward", "ChaseTarget", "Attack", "FireProjectile",
            "TakeDamage", "Heal", "SetVar", "Enable", "Disable", "ChangeScene", "CHANGE_SCENE",
            "Rotate", "Pulse", "ClearSignal", "ShowDialogue", "PlaySound", "EmitEventSignal",
            "SET_SCENE_FLAG", "SpawnEntity", "StartModule",
        ] {
            assert!(actions.contains(name), "missing action {}", name);
        }
        for name in [
            "Always", "VariableEquals", "Compare", "IsGrounded", "IsAlive", "HpBelow",
            "KeyPressed", "OnEventSignal", "SignalFlag", "IF_SCENE_FLAG",
        ] {
            assert!(conditions.contains(name), "missing condition {}", name);
        }
    }
}
