//! A minimal host: entity lifecycle over the shared store

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tickflow_core::{Entity, EntityId, GameCore, SharedEntities, SpawnRequest, ValueMap, Vec2};
use tickflow_logic::LogicSystem;

pub struct ArenaCore {
    entities: SharedEntities,
    system: RefCell<Weak<LogicSystem>>,
    next_spawn: Cell<u64>,
}

impl ArenaCore {
    pub fn new(entities: SharedEntities) -> Self {
        Self {
            entities,
            system: RefCell::new(Weak::new()),
            next_spawn: Cell::new(1),
        }
    }

    /// Route `start_module` requests to a logic system
    pub fn attach(&self, system: &Rc<LogicSystem>) {
        *self.system.borrow_mut() = Rc::downgrade(system);
    }
}

impl GameCore for ArenaCore {
    fn create_entity(&self, request: SpawnRequest) -> Option<EntityId> {
        let n = self.next_spawn.get();
        self.next_spawn.set(n + 1);

        let id = EntityId::new(format!("{}-{}", request.template.as_deref().unwrap_or("spawn"), n));
        let mut entity = Entity::new(id.clone()).at(request.position.x, request.position.y);
        entity.role = request.role;
        for (name, value) in request.variables {
            entity.set_var(&name, value);
        }
        self.entities.borrow_mut().insert(entity);
        Some(id)
    }

    fn remove_entity(&self, id: &EntityId) -> bool {
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
        let Some(system) = self.system.borrow().upgrade() else {
            return false;
        };
        match system.start_module(entity, module_id, overrides) {
            Ok(instance) => {
                tracing::info!(entity = %entity, module = module_id, %instance, "module started");
                true
            }
            Err(err) => {
                tracing::warn!(entity = %entity, module = module_id, error = %err, "module not started");
                false
            }
        }
    }
}
