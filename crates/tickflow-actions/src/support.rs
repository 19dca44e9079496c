//! Helpers shared by the default actions

use tickflow_core::{
    ActionContext, Entity, EntityId, Error, ParamExt, Result, Value, ValueMap, Vec2,
};

/// Hit points given to an entity that is attacked before it tracks any
pub(crate) const DEFAULT_HP: f64 = 100.0;

/// Moves closer than this are skipped
pub(crate) const ARRIVE_DISTANCE: f64 = 5.0;

/// A required, non-empty string parameter
pub(crate) fn require_text<'a>(params: &'a ValueMap, key: &str) -> Result<&'a str> {
    params
        .text(key)
        .ok_or_else(|| Error::MissingParam(key.to_string()))
}

/// Optional `targetId` parameter, defaulting to the acting entity
pub(crate) fn target_or_self(ctx: &ActionContext, params: &ValueMap) -> EntityId {
    params
        .text("targetId")
        .map(EntityId::from)
        .unwrap_or_else(|| ctx.entity_id.clone())
}

/// Whether the entity has a visual object or a store entry
pub(crate) fn exists(ctx: &ActionContext, id: &EntityId) -> bool {
    ctx.globals
        .renderer
        .as_ref()
        .is_some_and(|r| r.has_object(id))
        || ctx.globals.entities.borrow().contains(id)
}

/// Position of an entity: the visual object first, then the store
pub(crate) fn position_of(ctx: &ActionContext, id: &EntityId) -> Option<Vec2> {
    if let Some(position) = ctx.globals.renderer.as_ref().and_then(|r| r.position(id)) {
        return Some(position);
    }
    ctx.globals.entities.borrow().get(id).map(Entity::position)
}

/// Move an entity in the store and its visual object
pub(crate) fn place(ctx: &ActionContext, id: &EntityId, position: Vec2) {
    if let Some(renderer) = &ctx.globals.renderer {
        renderer.set_position(id, position);
    }
    if let Some(entity) = ctx.globals.entities.borrow_mut().get_mut(id) {
        entity.x = position.x;
        entity.y = position.y;
    }
}

/// First numeric variable of the acting entity among `names`
pub(crate) fn own_number(ctx: &ActionContext, names: &[&str]) -> Option<f64> {
    let entities = ctx.globals.entities.borrow();
    let entity = entities.get(&ctx.entity_id)?;
    names.iter().find_map(|name| entity.number_var(name))
}

/// Movement speed: `speed` variable, `maxSpeed` variable, parameter, default
pub(crate) fn speed(ctx: &ActionContext, params: &ValueMap, default: f64) -> f64 {
    own_number(ctx, &["speed", "maxSpeed"])
        .or_else(|| params.num("speed"))
        .unwrap_or(default)
}

/// Step the acting entity toward `target`; returns whether it moved
pub(crate) fn step_toward(ctx: &ActionContext, target: Vec2, speed: f64) -> Result<bool> {
    let id = &ctx.entity_id;
    let from = position_of(ctx, id).ok_or_else(|| Error::EntityNotFound(id.to_string()))?;

    let delta = target - from;
    let distance = delta.length();
    if distance <= ARRIVE_DISTANCE {
        return Ok(false);
    }

    let step = delta * (speed * ctx.dt() / distance);
    place(ctx, id, from + step);
    Ok(true)
}

/// A named value seen from the acting entity: its variable, then module scope
pub(crate) fn lookup(ctx: &ActionContext, name: &str) -> Value {
    if let Some(value) = ctx.entity_var(name) {
        return value;
    }
    ctx.scope
        .as_ref()
        .and_then(|scope| scope.borrow().get(name).cloned())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod fixture {
    use crate::register_defaults;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tickflow_core::testing::{MockGameCore, MockRenderer, MockScene};
    use tickflow_core::{
        ActionContext, ActionRegistry, ConditionRegistry, Entity, EntityContext, EntityId,
        EntityStore, EventBus, GameEvent, Globals, ManualClock, SharedEntities, Value, ValueMap,
    };

    /// A small simulation with every mock collaborator attached
    pub struct World {
        pub entities: SharedEntities,
        pub renderer: Rc<MockRenderer>,
        pub core: Rc<MockGameCore>,
        pub scene: Rc<MockScene>,
        pub clock: Rc<ManualClock>,
        pub globals: Globals,
        pub actions: ActionRegistry,
        pub conditions: ConditionRegistry,
        pub seen: Rc<RefCell<Vec<GameEvent>>>,
    }

    pub fn world(entities: Vec<Entity>) -> World {
        let store = EntityStore::shared();
        for entity in entities {
            store.borrow_mut().insert(entity);
        }

        let clock = Rc::new(ManualClock::new(1_000.0));
        let events = Rc::new(EventBus::with_clock(clock.clone()));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        events.on(move |event| {
            sink.borrow_mut().push(event.clone());
            Ok(())
        });

        let renderer = Rc::new(MockRenderer::new());
        renderer.mirror(&store);
        let core = Rc::new(MockGameCore::new(Rc::clone(&store)));
        let scene = Rc::new(MockScene::new("level-1"));

        let globals = Globals::new(Rc::clone(&store), events)
            .with_renderer(renderer.clone())
            .with_game_core(core.clone())
            .with_scene(scene.clone());

        let actions = ActionRegistry::new();
        let conditions = ConditionRegistry::new();
        register_defaults(&actions, &conditions);

        World {
            entities: store,
            renderer,
            core,
            scene,
            clock,
            globals,
            actions,
            conditions,
            seen,
        }
    }

    impl World {
        pub fn ctx(&self, id: &str) -> ActionContext {
            ActionContext::new(id, self.globals.clone())
        }

        pub fn run(&self, id: &str, action: &str, params: ValueMap) {
            self.actions.run(action, &self.ctx(id), &params);
        }

        pub fn check(&self, id: &str, condition: &str, params: ValueMap) -> bool {
            self.conditions.check(condition, &self.ctx(id), &params)
        }

        pub fn check_with(&self, ctx: &ActionContext, condition: &str, params: ValueMap) -> bool {
            self.conditions.check(condition, ctx, &params)
        }

        pub fn var(&self, id: &str, name: &str) -> Option<Value> {
            self.entities
                .borrow()
                .get(&EntityId::from(id))
                .and_then(|e| e.get_var(name).cloned())
        }

        pub fn number(&self, id: &str, name: &str) -> Option<f64> {
            self.var(id, name).and_then(|v| v.coerce_number())
        }

        pub fn events_of(&self, event_type: &str) -> Vec<GameEvent> {
            self.seen
                .borrow()
                .iter()
                .filter(|e| e.event_type == event_type)
                .cloned()
                .collect()
        }

        pub fn entity_context(&self) -> Rc<RefCell<EntityContext>> {
            Rc::new(RefCell::new(EntityContext::default()))
        }
    }
}
