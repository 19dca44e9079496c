//! In-memory collaborators for tests and demos

use crate::{
    Entity, EntityId, GameCore, Renderer, SceneControl, SharedEntities, SpawnRequest, Value,
    ValueMap, Vec2,
};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};

/// State of one mock visual object
#[derive(Debug, Clone, PartialEq)]
pub struct MockObject {
    pub position: Vec2,
    pub rotation: f64,
    pub scale: (f64, f64),
    pub visible: bool,
}

/// Renderer that only remembers transforms
#[derive(Debug, Default)]
pub struct MockRenderer {
    objects: RefCell<IndexMap<EntityId, MockObject>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a visual object
    pub fn add(&self, id: impl Into<EntityId>, x: f64, y: f64) {
        self.objects.borrow_mut().insert(
            id.into(),
            MockObject {
                position: Vec2::new(x, y),
                rotation: 0.0,
                scale: (1.0, 1.0),
                visible: true,
            },
        );
    }

    /// Add an object for every entity in a store
    pub fn mirror(&self, entities: &SharedEntities) {
        for e in entities.borrow().iter() {
            self.add(e.id.clone(), e.x, e.y);
        }
    }

    /// Remove a visual object
    pub fn remove(&self, id: &EntityId) {
        self.objects.borrow_mut().shift_remove(id);
    }

    /// Snapshot of an object
    pub fn object(&self, id: &str) -> Option<MockObject> {
        self.objects.borrow().get(&EntityId::from(id)).cloned()
    }
}

impl Renderer for MockRenderer {
    fn has_object(&self, id: &EntityId) -> bool {
        self.objects.borrow().contains_key(id)
    }

    fn position(&self, id: &EntityId) -> Option<Vec2> {
        self.objects.borrow().get(id).map(|o| o.position)
    }

    fn set_position(&self, id: &EntityId, position: Vec2) {
        if let Some(o) = self.objects.borrow_mut().get_mut(id) {
            o.position = position;
        }
    }

    fn rotation(&self, id: &EntityId) -> Option<f64> {
        self.objects.borrow().get(id).map(|o| o.rotation)
    }

    fn set_rotation(&self, id: &EntityId, radians: f64) {
        if let Some(o) = self.objects.borrow_mut().get_mut(id) {
            o.rotation = radians;
        }
    }

    fn set_scale(&self, id: &EntityId, scale_x: f64, scale_y: f64) {
        if let Some(o) = self.objects.borrow_mut().get_mut(id) {
            o.scale = (scale_x, scale_y);
        }
    }

    fn set_visible(&self, id: &EntityId, visible: bool) {
        if let Some(o) = self.objects.borrow_mut().get_mut(id) {
            o.visible = visible;
        }
    }

    fn all_entity_ids(&self) -> Vec<EntityId> {
        self.objects.borrow().keys().cloned().collect()
    }
}

/// Recorded `start_module` call
#[derive(Debug, Clone, PartialEq)]
pub struct StartedModule {
    pub entity: EntityId,
    pub module_id: String,
    pub overrides: ValueMap,
}

/// Game core backed directly by an entity store
pub struct MockGameCore {
    entities: SharedEntities,
    next_spawn: Cell<u64>,
    pub spawned: RefCell<Vec<SpawnRequest>>,
    pub removed: RefCell<Vec<EntityId>>,
    pub started: RefCell<Vec<StartedModule>>,
}

impl MockGameCore {
    pub fn new(entities: SharedEntities) -> Self {
        Self {
            entities,
            next_spawn: Cell::new(1),
            spawned: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            started: RefCell::new(Vec::new()),
        }
    }
}

impl GameCore for MockGameCore {
    fn create_entity(&self, request: SpawnRequest) -> Option<EntityId> {
        let n = self.next_spawn.get();
        self.next_spawn.set(n + 1);
        let id = EntityId::new(format!("spawn-{}", n));

        let mut entity = Entity::new(id.clone()).at(request.position.x, request.position.y);
        entity.role = request.role.clone();
        for (name, value) in &request.variables {
            entity.set_var(name, value.clone());
        }
        self.entities.borrow_mut().insert(entity);
        self.spawned.borrow_mut().push(request);
        Some(id)
    }

    fn remove_entity(&self, id: &EntityId) -> bool {
        self.removed.borrow_mut().push(id.clone());
        self.entities.borrow_mut().remove(id).is_some()
    }

    fn entities_by_role(&self, role: &str) -> Vec<EntityId> {
        self.entities
            .borrow()
            .by_role(role)
            .map(|e| e.id.clone())
            .collect()
    }

    fn nearest_by_role(&self, role: &str, from: Vec2, exclude: Option<&EntityId>) -> Option<EntityId> {
        self.entities
            .borrow()
            .nearest_by_role(from, role, exclude)
            .map(|e| e.id.clone())
    }

    fn start_module(&self, entity: &EntityId, module_id: &str, overrides: &ValueMap) -> bool {
        self.started.borrow_mut().push(StartedModule {
            entity: entity.clone(),
            module_id: module_id.to_string(),
            overrides: overrides.clone(),
        });
        true
    }
}

/// Scene control that records transitions
#[derive(Debug, Default)]
pub struct MockScene {
    current: RefCell<String>,
    pub history: RefCell<Vec<(String, Value)>>,
}

impl MockScene {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: RefCell::new(current.into()),
            history: RefCell::new(Vec::new()),
        }
    }
}

impl SceneControl for MockScene {
    fn current_scene(&self) -> String {
        self.current.borrow().clone()
    }

    fn start_scene(&self, name: &str, data: &Value) {
        *self.current.borrow_mut() = name.to_string();
        self.history.borrow_mut().push((name.to_string(), data.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityStore;

    #[test]
    fn test_mock_renderer_tracks_transforms() {
        let renderer = MockRenderer::new();
        renderer.add("hero", 1.0, 2.0);
        let id = EntityId::from("hero");
        renderer.set_position(&id, Vec2::new(5.0, 5.0));
        renderer.set_visible(&id, false);

        let obj = renderer.object("hero").expect("object");
        assert_eq!(obj.position, Vec2::new(5.0, 5.0));
        assert!(!obj.visible);
        assert!(renderer.position(&EntityId::from("ghost")).is_none());
    }

    #[test]
    fn test_mock_game_core_spawns_into_store() {
        let entities = EntityStore::shared();
        let core = MockGameCore::new(entities.clone());
        let id = core
            .create_entity(SpawnRequest {
                role: Some("enemy".into()),
                ..Default::default()
            })
            .expect("spawned");

        assert_eq!(core.entities_by_role("enemy"), vec![id.clone()]);
        assert!(core.remove_entity(&id));
        assert!(entities.borrow().is_empty());
    }
}
