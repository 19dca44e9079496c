//! Call envelopes and per-entity runtime context
//!
//! `Globals` bundles the explicitly constructed services one simulation
//! shares. `ActionContext` is what every action and condition receives.
//! `RuntimeContext` keeps the per-entity collision and signal snapshot that
//! conditions such as `IsGrounded` read.

use crate::{
    Clock, EntityId, EventBus, GameCore, InputState, Renderer, SceneControl, SceneState,
    SharedEntities, SignalQueue, Value, ValueMap,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// One side of a collision as seen by an entity
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionContact {
    pub other_id: EntityId,
    pub other_tag: Option<String>,
    pub self_tag: Option<String>,
}

impl CollisionContact {
    /// Create a contact with another entity
    pub fn new(other_id: impl Into<EntityId>) -> Self {
        Self {
            other_id: other_id.into(),
            other_tag: None,
            self_tag: None,
        }
    }
}

/// Collision state of one entity
#[derive(Debug, Clone, Default)]
pub struct CollisionState {
    /// Contacts currently touching
    pub current: Vec<CollisionContact>,
    /// Contacts that began this frame
    pub entered: Vec<CollisionContact>,
    /// Contacts that ended this frame
    pub exited: Vec<CollisionContact>,
    pub grounded: bool,
}

/// Named per-entity signals
#[derive(Debug, Clone, Default)]
pub struct SignalState {
    pub flags: IndexMap<String, bool>,
    pub values: ValueMap,
}

impl SignalState {
    /// Whether the signal is raised
    pub fn is_set(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }
}

/// Runtime snapshot of one entity
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    pub collisions: CollisionState,
    pub signals: SignalState,
}

/// Shared handle to an entity's runtime snapshot
pub type SharedEntityContext = Rc<RefCell<EntityContext>>;

/// Per-entity collision and signal bookkeeping
#[derive(Debug)]
pub struct RuntimeContext {
    entities: RefCell<IndexMap<EntityId, SharedEntityContext>>,
    ground_tags: RefCell<HashSet<String>>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(["Wall"])
    }
}

impl RuntimeContext {
    /// Create a context treating the given collision tags as ground
    pub fn new<I, S>(ground_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entities: RefCell::new(IndexMap::new()),
            ground_tags: RefCell::new(ground_tags.into_iter().map(Into::into).collect()),
        }
    }

    /// Replace the ground tag set
    pub fn set_ground_tags<I, S>(&self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.ground_tags.borrow_mut() = tags.into_iter().map(Into::into).collect();
    }

    /// Start a new frame: forget this frame's enter/exit lists
    pub fn begin_frame(&self) {
        for ctx in self.entities.borrow().values() {
            let mut ctx = ctx.borrow_mut();
            ctx.collisions.entered.clear();
            ctx.collisions.exited.clear();
        }
    }

    /// Get (creating on demand) the snapshot for an entity
    pub fn entity(&self, id: &EntityId) -> SharedEntityContext {
        Rc::clone(
            self.entities
                .borrow_mut()
                .entry(id.clone())
                .or_default(),
        )
    }

    /// Drop an entity's snapshot
    pub fn remove(&self, id: &EntityId) {
        self.entities.borrow_mut().shift_remove(id);
    }

    /// Record the start of a contact
    pub fn record_collision_enter(&self, id: &EntityId, contact: CollisionContact) {
        let ctx = self.entity(id);
        let mut ctx = ctx.borrow_mut();
        upsert_contact(&mut ctx.collisions.current, contact.clone());
        ctx.collisions.entered.push(contact);
        self.update_grounded(&mut ctx.collisions);
    }

    /// Record an ongoing contact
    pub fn record_collision_stay(&self, id: &EntityId, contact: CollisionContact) {
        let ctx = self.entity(id);
        let mut ctx = ctx.borrow_mut();
        upsert_contact(&mut ctx.collisions.current, contact);
        self.update_grounded(&mut ctx.collisions);
    }

    /// Record the end of a contact
    pub fn record_collision_exit(&self, id: &EntityId, other_id: &EntityId) {
        let ctx = self.entity(id);
        let mut ctx = ctx.borrow_mut();
        let removed = ctx
            .collisions
            .current
            .iter()
            .position(|c| &c.other_id == other_id)
            .map(|idx| ctx.collisions.current.remove(idx));
        ctx.collisions
            .exited
            .push(removed.unwrap_or_else(|| CollisionContact::new(other_id.clone())));
        self.update_grounded(&mut ctx.collisions);
    }

    /// Raise a signal with a value
    pub fn set_signal(&self, id: &EntityId, key: &str, value: Value) {
        let ctx = self.entity(id);
        let mut ctx = ctx.borrow_mut();
        ctx.signals.flags.insert(key.to_string(), true);
        ctx.signals.values.insert(key.to_string(), value);
    }

    /// Lower a signal
    pub fn clear_signal(&self, id: &EntityId, key: &str) {
        let ctx = self.entity(id);
        ctx.borrow_mut().signals.flags.insert(key.to_string(), false);
    }

    fn update_grounded(&self, collisions: &mut CollisionState) {
        let tags = self.ground_tags.borrow();
        collisions.grounded = collisions
            .current
            .iter()
            .any(|c| c.other_tag.as_ref().is_some_and(|t| tags.contains(t)));
    }
}

fn upsert_contact(list: &mut Vec<CollisionContact>, contact: CollisionContact) {
    match list.iter_mut().find(|c| c.other_id == contact.other_id) {
        Some(existing) => {
            if contact.other_tag.is_some() {
                existing.other_tag = contact.other_tag;
            }
            if contact.self_tag.is_some() {
                existing.self_tag = contact.self_tag;
            }
        }
        None => list.push(contact),
    }
}

/// Services shared by one running simulation
#[derive(Clone)]
pub struct Globals {
    pub entities: SharedEntities,
    pub events: Rc<EventBus>,
    pub clock: Rc<dyn Clock>,
    pub signals: Rc<SignalQueue>,
    pub scene_state: Rc<RefCell<SceneState>>,
    pub renderer: Option<Rc<dyn Renderer>>,
    pub game_core: Option<Rc<dyn GameCore>>,
    pub scene: Option<Rc<dyn SceneControl>>,
}

impl std::fmt::Debug for Globals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Globals")
            .field("entities", &self.entities.borrow().len())
            .field("renderer", &self.renderer.is_some())
            .field("game_core", &self.game_core.is_some())
            .field("scene", &self.scene.is_some())
            .finish()
    }
}

impl Globals {
    /// Create globals around an entity store and event bus
    ///
    /// The clock is taken from the bus so timestamps and frame timing agree.
    pub fn new(entities: SharedEntities, events: Rc<EventBus>) -> Self {
        Self {
            entities,
            clock: events.clock(),
            events,
            signals: Rc::new(SignalQueue::new()),
            scene_state: Rc::new(RefCell::new(SceneState::new())),
            renderer: None,
            game_core: None,
            scene: None,
        }
    }

    /// Builder: attach a renderer
    pub fn with_renderer(mut self, renderer: Rc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Builder: attach a game core
    pub fn with_game_core(mut self, game_core: Rc<dyn GameCore>) -> Self {
        self.game_core = Some(game_core);
        self
    }

    /// Builder: attach scene control
    pub fn with_scene(mut self, scene: Rc<dyn SceneControl>) -> Self {
        self.scene = Some(scene);
        self
    }
}

/// Envelope passed to every action and condition
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Entity performing the action
    pub entity_id: EntityId,
    /// Data of the triggering event (or `dt` for ticks)
    pub event_data: ValueMap,
    pub input: Option<InputState>,
    pub entity_context: Option<SharedEntityContext>,
    pub globals: Globals,
    /// Module variables, set only when called from a running module
    pub scope: Option<Rc<RefCell<ValueMap>>>,
}

impl ActionContext {
    /// Create a context for an entity
    pub fn new(entity_id: impl Into<EntityId>, globals: Globals) -> Self {
        Self {
            entity_id: entity_id.into(),
            event_data: ValueMap::new(),
            input: None,
            entity_context: None,
            globals,
            scope: None,
        }
    }

    /// Builder: set event data
    pub fn with_event_data(mut self, data: ValueMap) -> Self {
        self.event_data = data;
        self
    }

    /// Builder: set input snapshot
    pub fn with_input(mut self, input: InputState) -> Self {
        self.input = Some(input);
        self
    }

    /// Builder: attach the entity's runtime snapshot
    pub fn with_entity_context(mut self, ctx: SharedEntityContext) -> Self {
        self.entity_context = Some(ctx);
        self
    }

    /// Builder: attach a module variable scope
    pub fn with_scope(mut self, scope: Rc<RefCell<ValueMap>>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Frame delta time from the event data (seconds), defaulting to 1/60
    pub fn dt(&self) -> f64 {
        self.event_data
            .get("dt")
            .and_then(Value::coerce_number)
            .unwrap_or(0.016)
    }

    /// Whether the acting entity is alive (no numeric hp, or hp above zero)
    pub fn is_alive(&self) -> bool {
        self.globals
            .entities
            .borrow()
            .get(&self.entity_id)
            .is_none_or(|e| e.is_alive())
    }

    /// Read a variable of the acting entity
    pub fn entity_var(&self, name: &str) -> Option<Value> {
        self.globals
            .entities
            .borrow()
            .get(&self.entity_id)
            .and_then(|e| e.get_var(name).cloned())
    }
}
