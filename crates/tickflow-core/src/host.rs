//! Collaborator interfaces implemented by the host game
//!
//! The logic runtime never draws, integrates physics or owns entity
//! lifecycles. It reaches the host only through these traits.

use crate::{EntityId, Value, ValueMap, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rendering layer: visual objects keyed by entity id
pub trait Renderer {
    /// Whether a visual object exists for the entity
    fn has_object(&self, id: &EntityId) -> bool;

    /// Position of the entity's visual object
    fn position(&self, id: &EntityId) -> Option<Vec2>;

    /// Move the entity's visual object
    fn set_position(&self, id: &EntityId, position: Vec2);

    /// Rotation of the visual object in radians
    fn rotation(&self, id: &EntityId) -> Option<f64>;

    /// Rotate the visual object (radians)
    fn set_rotation(&self, id: &EntityId, radians: f64);

    /// Uniform or per-axis scale
    fn set_scale(&self, id: &EntityId, scale_x: f64, scale_y: f64);

    /// Show or hide the visual object
    fn set_visible(&self, id: &EntityId, visible: bool);

    /// All entity ids that have a visual object
    fn all_entity_ids(&self) -> Vec<EntityId>;
}

/// Request to spawn a new entity through the game core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Template or prefab to instantiate
    pub template: Option<String>,
    pub position: Vec2,
    pub role: Option<String>,
    /// Entity that requested the spawn
    pub owner: Option<EntityId>,
    /// Initial variables
    pub variables: ValueMap,
}

/// Entity lifecycle owner
pub trait GameCore {
    /// Create an entity; returns its id if the host accepted it
    fn create_entity(&self, request: SpawnRequest) -> Option<EntityId>;

    /// Remove an entity; returns false if it did not exist
    fn remove_entity(&self, id: &EntityId) -> bool;

    /// Ids of all entities with the given role
    fn entities_by_role(&self, role: &str) -> Vec<EntityId>;

    /// Nearest entity with the given role, excluding `exclude`
    fn nearest_by_role(&self, role: &str, from: Vec2, exclude: Option<&EntityId>) -> Option<EntityId>;

    /// Start a module on an entity; returns false if the module is unknown
    fn start_module(&self, entity: &EntityId, module_id: &str, overrides: &ValueMap) -> bool;
}

/// Scene management
pub trait SceneControl {
    /// Key of the running scene
    fn current_scene(&self) -> String;

    /// Switch to another scene
    fn start_scene(&self, name: &str, data: &Value);
}

/// Keyboard and pointer snapshot for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputState {
    /// Keys currently held
    pub keys: HashSet<String>,
    /// Pointer position in world space
    pub mouse_x: f64,
    pub mouse_y: f64,
    /// Pointer position in screen space
    pub screen_x: f64,
    pub screen_y: f64,
}

impl InputState {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: mark a key as held
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    /// Builder: set world-space pointer position
    pub fn with_mouse(mut self, x: f64, y: f64) -> Self {
        self.mouse_x = x;
        self.mouse_y = y;
        self
    }

    /// Check whether a key is held
    pub fn is_down(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// World-space pointer position
    pub fn mouse(&self) -> Vec2 {
        Vec2::new(self.mouse_x, self.mouse_y)
    }

    /// Screen-space pointer position
    pub fn screen(&self) -> Vec2 {
        Vec2::new(self.screen_x, self.screen_y)
    }
}
