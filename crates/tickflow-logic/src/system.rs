//! The per-tick orchestrator
//!
//! `LogicSystem` is the single entry point a host drives. It subscribes to
//! the event bus once at construction and, on every update, runs entity
//! logic components before stepping the module runtime.
//!
//! Event routing:
//!
//! | Event | Handling |
//! |-------|----------|
//! | `COLLISION_ENTER` / `COLLISION_STAY` / `COLLISION_EXIT` | Contacts recorded for both sides, then each side's collision logic runs once per frame |
//! | `OnStart` | Start logic runs once per entity and component |
//! | `OnClick` | Click logic of the target entity |
//! | `EVENT_SIGNAL` | Signal queued for `OnEventSignal`, then forwarded |
//! | anything else | Forwarded to matching entity logic (and scene rules for targeted events) |
//!
//! Event-driven logic only runs while the system is in [`RunMode::Runtime`].
//! Update logic, module stepping and collision bookkeeping run in every mode.

use crate::{Error, FrameState, LogicConfig, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};
use tickflow_core::{
    event_types, evaluate_rule, params, trigger_matches, ActionContext, ActionRegistry,
    CollisionContact, ConditionRegistry, EntityId, GameEvent, Globals, InputState, InstanceId,
    LogicComponent, Rule, RuleAction, RuleEngine, RuntimeContext, SubscriptionId, Value, ValueMap,
};
use tickflow_flow::{ModuleGraph, ModuleHooks, ModuleLibrary, ModuleResult, ModuleRuntime};

/// Whether the host is playing the game or editing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Runtime,
    Editor,
}

/// Observer of module-local variable writes
pub type VariableObserver = Box<dyn Fn(InstanceId, &EntityId, &str, &Value)>;

/// Builds action contexts for both entity logic and modules
struct SystemHooks {
    globals: Globals,
    context: Rc<RuntimeContext>,
    input: RefCell<Option<InputState>>,
    observer: RefCell<Option<VariableObserver>>,
}

impl SystemHooks {
    fn context_for(&self, entity: &EntityId, data: ValueMap) -> ActionContext {
        let ctx = ActionContext::new(entity.clone(), self.globals.clone())
            .with_event_data(data)
            .with_entity_context(self.context.entity(entity));
        match self.input.borrow().clone() {
            Some(input) => ctx.with_input(input),
            None => ctx,
        }
    }
}

impl ModuleHooks for SystemHooks {
    fn action_context(&self, entity: &EntityId, dt: f64) -> ActionContext {
        self.context_for(entity, params! { "dt" => dt })
    }

    fn on_module_variable_changed(
        &self,
        instance: InstanceId,
        entity: &EntityId,
        name: &str,
        value: &Value,
    ) {
        if let Some(observer) = self.observer.borrow().as_ref() {
            observer(instance, entity, name, value);
        }
    }
}

/// Per-tick orchestrator of rules, entity logic and modules
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use tickflow_core::{ActionRegistry, ConditionRegistry, EntityStore, EventBus, Globals};
/// use tickflow_logic::{LogicConfig, LogicSystem};
///
/// let globals = Globals::new(EntityStore::shared(), Rc::new(EventBus::new()));
/// let system = LogicSystem::new(
///     globals,
///     Rc::new(ActionRegistry::new()),
///     Rc::new(ConditionRegistry::new()),
///     LogicConfig::default(),
/// );
///
/// assert!(system.on_update(0.016).is_empty());
/// system.shutdown();
/// ```
pub struct LogicSystem {
    config: LogicConfig,
    globals: Globals,
    actions: Rc<ActionRegistry>,
    conditions: Rc<ConditionRegistry>,
    rules: RuleEngine,
    modules: ModuleRuntime,
    library: RefCell<ModuleLibrary>,
    context: Rc<RuntimeContext>,
    hooks: Rc<SystemHooks>,
    frame: RefCell<FrameState>,
    /// (entity, component) pairs whose start logic already ran
    started: RefCell<HashSet<(EntityId, String)>>,
    mode: Cell<RunMode>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl LogicSystem {
    /// Build a system and subscribe it to the globals' event bus
    pub fn new(
        globals: Globals,
        actions: Rc<ActionRegistry>,
        conditions: Rc<ConditionRegistry>,
        config: LogicConfig,
    ) -> Rc<Self> {
        let context = Rc::new(RuntimeContext::new(config.ground_tags().to_vec()));
        let hooks = Rc::new(SystemHooks {
            globals: globals.clone(),
            context: Rc::clone(&context),
            input: RefCell::new(None),
            observer: RefCell::new(None),
        });
        let module_hooks: Rc<dyn ModuleHooks> = hooks.clone();
        let modules = ModuleRuntime::new(&globals, Rc::clone(&actions), module_hooks)
            .with_options(config.runtime_options());

        if config.debug_events() {
            globals.events.set_debug(true);
        }

        let system = Rc::new(Self {
            rules: RuleEngine::new(Rc::clone(&actions), Rc::clone(&conditions)),
            config,
            globals,
            actions,
            conditions,
            modules,
            library: RefCell::new(ModuleLibrary::new()),
            context,
            hooks,
            frame: RefCell::new(FrameState::new()),
            started: RefCell::new(HashSet::new()),
            mode: Cell::new(RunMode::default()),
            subscription: Cell::new(None),
        });

        let weak: Weak<Self> = Rc::downgrade(&system);
        let subscription = system.globals.events.on(move |event| {
            if let Some(system) = weak.upgrade() {
                system.handle_event(event);
            }
            Ok(())
        });
        system.subscription.set(Some(subscription));

        tracing::info!(
            max_steps = system.config.max_steps_per_tick(),
            frame_threshold_ms = system.config.frame_threshold_ms(),
            "logic system ready"
        );
        system
    }

    /// Unsubscribe from the bus and drop every module instance
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription.take() {
            self.globals.events.off(subscription);
        }
        self.modules.clear();
        tracing::info!("logic system shut down");
    }

    pub fn config(&self) -> &LogicConfig {
        &self.config
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Per-entity collision and signal snapshot
    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Scene rule engine
    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    pub fn modules(&self) -> &ModuleRuntime {
        &self.modules
    }

    pub fn mode(&self) -> RunMode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: RunMode) {
        if self.mode.replace(mode) != mode {
            tracing::info!(mode = ?mode, "run mode changed");
        }
    }

    pub fn is_runtime(&self) -> bool {
        self.mode.get() == RunMode::Runtime
    }

    /// Set the input snapshot handed to actions and conditions
    pub fn set_input(&self, input: Option<InputState>) {
        *self.hooks.input.borrow_mut() = input;
    }

    /// Observe writes to module-local variables
    pub fn set_variable_observer(&self, observer: Option<VariableObserver>) {
        *self.hooks.observer.borrow_mut() = observer;
    }

    /// Logical frames started so far
    pub fn frame_count(&self) -> u64 {
        self.frame.borrow().frame()
    }

    /// Replace the scene rule set
    pub fn load_rules(&self, rules: Vec<Rule>) {
        self.rules.load_rules(rules);
    }

    /// Make a module graph available to [`start_module`](Self::start_module)
    pub fn register_module(&self, graph: ModuleGraph) -> Option<Rc<ModuleGraph>> {
        tracing::debug!(module = %graph.id, "module registered");
        self.library.borrow_mut().insert(graph)
    }

    /// Replace the module library
    pub fn set_library(&self, library: ModuleLibrary) {
        *self.library.borrow_mut() = library;
    }

    /// Start a registered module on an existing entity
    pub fn start_module(
        &self,
        entity_id: &EntityId,
        module_id: &str,
        overrides: &ValueMap,
    ) -> Result<InstanceId> {
        if !self.globals.entities.borrow().contains(entity_id) {
            return Err(Error::EntityNotFound(entity_id.to_string()));
        }
        let library = self.library.borrow();
        Ok(library.start(&self.modules, entity_id, module_id, overrides)?)
    }

    /// Forget everything held for an entity the host has removed
    pub fn remove_entity(&self, entity_id: &EntityId) {
        self.modules.remove_entity(entity_id);
        self.context.remove(entity_id);
        self.started.borrow_mut().retain(|(id, _)| id != entity_id);
        tracing::debug!(entity = %entity_id, "entity logic removed");
    }

    /// Run one update: entity update logic, then one module tick
    pub fn on_update(&self, dt: f64) -> Vec<ModuleResult> {
        let now = self.globals.clock.now_ms();
        let new_frame = self
            .frame
            .borrow_mut()
            .begin(now, self.config.frame_threshold_ms());
        if !new_frame {
            tracing::trace!(now_ms = now, "repeated update within frame");
        }

        self.run_update_logic(dt);

        let results = self.modules.update(0.0, dt);
        if self.config.log_module_failures() {
            for result in &results {
                if let Some(err) = result.error() {
                    tracing::warn!(
                        module = %result.module_id,
                        entity = %result.entity_id,
                        code = %err.code,
                        node = %err.node_id,
                        "module failed"
                    );
                }
            }
        }

        // Enter/exit lists describe contacts since the previous frame.
        if new_frame {
            self.context.begin_frame();
        }
        results
    }

    fn run_update_logic(&self, dt: f64) {
        let ids = self.globals.entities.borrow().ids();
        for id in ids {
            let components = self.components_of(&id, |trigger| {
                trigger_matches(trigger, event_types::TICK)
            });
            for component in components {
                if !self.frame.borrow_mut().claim_component(&id, &component.id) {
                    continue;
                }
                // Earlier components may have killed or disabled the entity.
                if !self.is_live(&id) {
                    break;
                }
                let ctx = self.hooks.context_for(&id, params! { "dt" => dt });
                evaluate_rule(
                    &component.rule,
                    &ctx,
                    &self.conditions,
                    &mut |action, ctx| self.run_action(action, ctx),
                );
            }
        }
    }

    fn handle_event(&self, event: &GameEvent) {
        match event.event_type.as_str() {
            event_types::COLLISION_ENTER
            | event_types::COLLISION_STAY
            | event_types::COLLISION_EXIT => self.on_collision(event),
            _ if !self.is_runtime() => {}
            event_types::ON_START => self.on_start(event),
            event_types::ON_CLICK => {
                if let Some(target) = &event.target_id {
                    self.dispatch(event, target, event.data.clone(), false);
                }
            }
            event_types::TICK | event_types::ON_UPDATE => {}
            event_types::EVENT_SIGNAL => {
                if let Some(signal) = event.get_str("signal") {
                    self.globals.signals.push(signal);
                    if let Some(target) = &event.target_id {
                        self.context.set_signal(target, signal, Value::Bool(true));
                    }
                }
                self.forward(event);
            }
            _ => self.forward(event),
        }
    }

    fn on_collision(&self, event: &GameEvent) {
        let (Some(a), Some(b)) = (event.get_entity("entityA"), event.get_entity("entityB")) else {
            tracing::debug!(event_type = %event.event_type, "collision without entity pair");
            return;
        };
        let tag_a = event.get_str("tagA").map(str::to_string);
        let tag_b = event.get_str("tagB").map(str::to_string);
        let contact_a = CollisionContact {
            other_id: b.clone(),
            other_tag: tag_b.clone(),
            self_tag: tag_a.clone(),
        };
        let contact_b = CollisionContact {
            other_id: a.clone(),
            other_tag: tag_a,
            self_tag: tag_b,
        };

        match event.event_type.as_str() {
            event_types::COLLISION_ENTER => {
                self.context.record_collision_enter(&a, contact_a.clone());
                self.context.record_collision_enter(&b, contact_b.clone());
            }
            event_types::COLLISION_STAY => {
                self.context.record_collision_stay(&a, contact_a.clone());
                self.context.record_collision_stay(&b, contact_b.clone());
            }
            _ => {
                self.context.record_collision_exit(&a, &b);
                self.context.record_collision_exit(&b, &a);
            }
        }

        if !self.is_runtime() {
            return;
        }
        if !self
            .frame
            .borrow_mut()
            .claim_collision(&a, &b, &event.event_type)
        {
            tracing::trace!(entity_a = %a, entity_b = %b, "collision already handled this frame");
            return;
        }

        for (id, contact) in [(&a, &contact_a), (&b, &contact_b)] {
            let mut data = event.data.clone();
            data.insert("otherId".into(), Value::from(contact.other_id.as_str()));
            if let Some(tag) = &contact.other_tag {
                data.insert("otherTag".into(), Value::from(tag.as_str()));
            }
            if let Some(tag) = &contact.self_tag {
                data.insert("selfTag".into(), Value::from(tag.as_str()));
            }
            self.dispatch(event, id, data, false);
        }
    }

    fn on_start(&self, event: &GameEvent) {
        let targets = match &event.target_id {
            Some(target) => vec![target.clone()],
            None => self.globals.entities.borrow().ids(),
        };

        for id in targets {
            let fresh: Vec<Rule> = self
                .components_of(&id, |trigger| trigger == event_types::ON_START)
                .into_iter()
                .filter(|c| self.started.borrow_mut().insert((id.clone(), c.id.clone())))
                .map(|c| c.rule)
                .collect();
            if fresh.is_empty() {
                continue;
            }

            tracing::debug!(entity = %id, count = fresh.len(), "running start logic");
            let ctx = self.hooks.context_for(&id, event.data.clone());
            // Broadcast starts are delivered as if aimed at each entity.
            let aimed = GameEvent {
                target_id: Some(id.clone()),
                ..event.clone()
            };
            self.rules.handle_event_with(&aimed, &ctx, Some(&fresh), &mut |action, ctx| {
                self.run_action(action, ctx)
            });
        }
    }

    fn forward(&self, event: &GameEvent) {
        match &event.target_id {
            Some(target) => self.dispatch(event, target, event.data.clone(), true),
            None => {
                let ids = self.globals.entities.borrow().ids();
                for id in ids {
                    self.dispatch(event, &id, event.data.clone(), false);
                }
            }
        }
    }

    /// Run an entity's logic matching `event`, and optionally the scene rules
    fn dispatch(&self, event: &GameEvent, id: &EntityId, data: ValueMap, scene_rules: bool) {
        let rules: Vec<Rule> = self
            .components_of(id, |trigger| trigger_matches(trigger, &event.event_type))
            .into_iter()
            .map(|c| c.rule)
            .collect();
        let run_scene = scene_rules && self.rules.rule_count() > 0;
        if rules.is_empty() && !run_scene {
            return;
        }

        let ctx = self.hooks.context_for(id, data);
        let mut dispatch = |action: &RuleAction, ctx: &ActionContext| self.run_action(action, ctx);
        if !rules.is_empty() {
            self.rules
                .handle_event_with(event, &ctx, Some(&rules), &mut dispatch);
        }
        if run_scene {
            self.rules.handle_event_with(event, &ctx, None, &mut dispatch);
        }
    }

    /// Enabled components of a live, active entity whose trigger passes `accept`
    fn components_of(&self, id: &EntityId, accept: impl Fn(&str) -> bool) -> Vec<LogicComponent> {
        let entities = self.globals.entities.borrow();
        match entities.get(id) {
            Some(entity) if entity.active && entity.is_alive() => entity
                .components
                .iter()
                .filter(|c| c.enabled && accept(c.trigger()))
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    fn is_live(&self, id: &EntityId) -> bool {
        self.globals
            .entities
            .borrow()
            .get(id)
            .is_some_and(|e| e.active && e.is_alive())
    }

    /// Run an action unless an identical call already ran this frame
    fn run_action(&self, action: &RuleAction, ctx: &ActionContext) {
        let fresh = self
            .frame
            .borrow_mut()
            .claim_action(&ctx.entity_id, &action.kind, &action.params);
        if !fresh {
            tracing::trace!(action = %action.kind, entity = %ctx.entity_id, "duplicate action skipped");
            return;
        }
        tracing::debug!(action = %action.kind, entity = %ctx.entity_id, "executing logic action");
        self.actions.run(&action.kind, ctx, &action.params);
    }
}

impl Drop for LogicSystem {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.globals.events.off(subscription);
        }
    }
}
