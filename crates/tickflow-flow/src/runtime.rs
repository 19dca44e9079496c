//! The module interpreter
//!
//! `ModuleRuntime` owns every running instance and advances each one once
//! per `update`. Stepping follows flow edges until the instance terminates,
//! an async block asks to wait, or the per-tick step bound is reached.

use crate::resolve::{evaluate_condition, switch_matches, with_resolver};
use crate::{
    BlockState, Error, FlowNode, FlowType, ModuleErrorCode, ModuleGraph, ModuleInstance,
    ModuleResult, ModuleStatus, NodeKind, Result, StopResult, SwitchNode,
};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use tickflow_core::{
    params, ActionContext, ActionRegistry, Clock, EntityId, Globals, InstanceId, ModifyOp,
    ParamExt, SharedEntities, Value, ValueMap,
};

/// Squared distance at which `MoveTo` counts as arrived
const ARRIVE_DISTANCE_SQ: f64 = 25.0;

/// Interpreter tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Node traversals allowed per instance per tick
    pub max_steps_per_tick: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            max_steps_per_tick: 64,
        }
    }
}

/// Host callbacks used while stepping
pub trait ModuleHooks {
    /// Context for actions and conditions run on behalf of `entity`
    fn action_context(&self, entity: &EntityId, dt: f64) -> ActionContext;

    /// Called after a module-local variable is written
    fn on_module_variable_changed(
        &self,
        _instance: InstanceId,
        _entity: &EntityId,
        _name: &str,
        _value: &Value,
    ) {
    }
}

/// Hooks that hand every action the shared globals and `dt`
pub struct BasicHooks {
    globals: Globals,
}

impl BasicHooks {
    pub fn new(globals: Globals) -> Self {
        Self { globals }
    }
}

impl ModuleHooks for BasicHooks {
    fn action_context(&self, entity: &EntityId, dt: f64) -> ActionContext {
        ActionContext::new(entity.clone(), self.globals.clone()).with_event_data(params! { "dt" => dt })
    }
}

/// Result of executing a flow block once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockOutcome {
    Done,
    Waiting,
    Failed,
}

/// Pool of running module instances
pub struct ModuleRuntime {
    actions: Rc<ActionRegistry>,
    hooks: Rc<dyn ModuleHooks>,
    entities: SharedEntities,
    clock: Rc<dyn Clock>,
    options: RuntimeOptions,
    instances: RefCell<Vec<ModuleInstance>>,
    /// Instances started while `update` is running
    pending: RefCell<Vec<ModuleInstance>>,
    /// Entities removed while `update` is running
    removed: RefCell<HashSet<EntityId>>,
    updating: Cell<bool>,
    next_id: Cell<u64>,
    time: Cell<f64>,
}

impl ModuleRuntime {
    /// Create an interpreter sharing the simulation's entities and clock
    pub fn new(globals: &Globals, actions: Rc<ActionRegistry>, hooks: Rc<dyn ModuleHooks>) -> Self {
        Self {
            actions,
            hooks,
            entities: Rc::clone(&globals.entities),
            clock: Rc::clone(&globals.clock),
            options: RuntimeOptions::default(),
            instances: RefCell::new(Vec::new()),
            pending: RefCell::new(Vec::new()),
            removed: RefCell::new(HashSet::new()),
            updating: Cell::new(false),
            next_id: Cell::new(1),
            time: Cell::new(0.0),
        }
    }

    /// Builder: set options (the step bound is at least one)
    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = RuntimeOptions {
            max_steps_per_tick: options.max_steps_per_tick.max(1),
        };
        self
    }

    /// Current options
    pub fn options(&self) -> RuntimeOptions {
        self.options
    }

    /// Start a module on an entity
    ///
    /// Fails only when the graph has no `Entry` node. A graph whose flow
    /// edges loop is accepted but the instance starts out failed with
    /// `CycleDetected` and never runs.
    pub fn start_module(
        &self,
        entity_id: &EntityId,
        graph: Rc<ModuleGraph>,
        overrides: &ValueMap,
    ) -> Result<InstanceId> {
        if graph.entry().is_none() {
            tracing::error!(module = %graph.id, entity = %entity_id, "missing entry node");
            return Err(Error::MissingEntry {
                module_id: graph.id.clone(),
                entry: graph.entry_node_id.clone(),
            });
        }

        let id = InstanceId::new(self.next_id.get());
        self.next_id.set(id.raw() + 1);

        let variables = self.seed_variables(entity_id, &graph, overrides);
        let mut instance = ModuleInstance::new(id, entity_id.clone(), Rc::clone(&graph), variables);

        if graph.has_cycle() {
            let entry = graph.entry_node_id.clone();
            instance.fail(ModuleErrorCode::CycleDetected, &entry);
        } else {
            tracing::debug!(module = %graph.id, entity = %entity_id, instance = %id, "module started");
        }

        if self.updating.get() {
            self.pending.borrow_mut().push(instance);
        } else {
            self.instances.borrow_mut().push(instance);
        }
        Ok(id)
    }

    /// Override, then matching entity variable, then graph default
    fn seed_variables(&self, entity_id: &EntityId, graph: &ModuleGraph, overrides: &ValueMap) -> ValueMap {
        let entities = self.entities.borrow();
        let entity = entities.get(entity_id);

        let mut variables: ValueMap = graph
            .default_variables()
            .into_iter()
            .map(|(name, default)| {
                let value = overrides
                    .get(&name)
                    .cloned()
                    .or_else(|| entity.and_then(|e| e.get_var(&name).cloned()))
                    .unwrap_or(default);
                (name, value)
            })
            .collect();

        for (name, value) in overrides {
            variables
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        variables
    }

    /// Advance every running instance by one tick
    ///
    /// `time` is the host's absolute time in seconds; pass 0 to have the
    /// `Time` pseudo-variable accumulate `dt` instead. Each terminal
    /// instance is reported exactly once and then dropped.
    pub fn update(&self, time: f64, dt: f64) -> Vec<ModuleResult> {
        if time > 0.0 {
            self.time.set(time);
        } else {
            self.time.set(self.time.get() + dt);
        }

        self.updating.set(true);
        let current = std::mem::take(&mut *self.instances.borrow_mut());
        let mut kept = Vec::with_capacity(current.len());
        let mut results = Vec::new();

        for mut instance in current {
            if self.removed.borrow().contains(&instance.entity_id) {
                continue;
            }
            if let Some(result) = instance.terminal_result() {
                results.push(result);
                continue;
            }
            match self.step_instance(&mut instance, dt) {
                Some(result) => results.push(result),
                None => kept.push(instance),
            }
        }

        let removed = std::mem::take(&mut *self.removed.borrow_mut());
        kept.retain(|i| !removed.contains(&i.entity_id));
        kept.extend(
            self.pending
                .borrow_mut()
                .drain(..)
                .filter(|i| !removed.contains(&i.entity_id)),
        );
        *self.instances.borrow_mut() = kept;
        self.updating.set(false);
        results
    }

    fn step_instance(&self, instance: &mut ModuleInstance, dt: f64) -> Option<ModuleResult> {
        let graph = Rc::clone(&instance.graph);
        let ctx = self
            .hooks
            .action_context(&instance.entity_id, dt)
            .with_scope(Rc::clone(&instance.variables));

        for _ in 0..self.options.max_steps_per_tick {
            let Some(node) = graph.find(&instance.cursor) else {
                let cursor = instance.cursor.clone();
                return Some(instance.fail(ModuleErrorCode::NodeNotFound, &cursor));
            };

            let port = match &node.kind {
                NodeKind::Entry | NodeKind::Merge => "out".to_string(),
                NodeKind::Stop { result, error_code } => {
                    return Some(match result {
                        StopResult::Success => instance.succeed(),
                        StopResult::Failed => {
                            let code = error_code
                                .clone()
                                .filter(|c| !c.is_empty())
                                .unwrap_or_else(|| "Failed".to_string());
                            instance.fail(ModuleErrorCode::Designer(code), &node.id)
                        }
                    });
                }
                NodeKind::Condition(condition) => {
                    let passed = evaluate_condition(instance, &node.id, condition, &ctx, self.time.get());
                    if passed { "true" } else { "false" }.to_string()
                }
                NodeKind::Switch(switch) => self.switch_port(instance, &node.id, switch, &ctx),
                NodeKind::Flow(flow) => match self.execute_flow(instance, &node.id, flow, &ctx, dt) {
                    BlockOutcome::Done => "out".to_string(),
                    BlockOutcome::Waiting => return None,
                    BlockOutcome::Failed => {
                        return Some(instance.fail(ModuleErrorCode::FlowFailed, &node.id))
                    }
                },
                NodeKind::Value(_) => {
                    return Some(instance.fail(ModuleErrorCode::InvalidNode, &node.id))
                }
            };

            match graph.next(&node.id, &port) {
                Some(next) => instance.cursor = next.to_string(),
                None => return Some(instance.succeed()),
            }
        }

        tracing::trace!(module = %instance.module_id, entity = %instance.entity_id, "step bound reached");
        None
    }

    fn switch_port(&self, instance: &ModuleInstance, node_id: &str, switch: &SwitchNode, ctx: &ActionContext) -> String {
        let value = with_resolver(instance, ctx, self.time.get(), |r| {
            match instance.graph.value_input(node_id, "value") {
                Some(source) => r.source(source),
                None => r.variable(&switch.variable_name),
            }
        });

        switch
            .cases
            .iter()
            .find(|case| switch_matches(&value, &case.value))
            .map(|case| case.id.clone())
            .unwrap_or_else(|| "default".to_string())
    }

    fn execute_flow(
        &self,
        instance: &mut ModuleInstance,
        node_id: &str,
        flow: &FlowNode,
        ctx: &ActionContext,
        dt: f64,
    ) -> BlockOutcome {
        let params = with_resolver(instance, ctx, self.time.get(), |r| {
            r.input_ports(&instance.graph, node_id, &flow.params)
        });

        match flow.effective_type() {
            FlowType::Instant => {
                if self.execute_instant(instance, flow, params, ctx) {
                    BlockOutcome::Done
                } else {
                    BlockOutcome::Failed
                }
            }
            FlowType::Async => self.execute_async(instance, node_id, flow, &params, ctx, dt),
        }
    }

    fn execute_instant(
        &self,
        instance: &mut ModuleInstance,
        flow: &FlowNode,
        mut params: ValueMap,
        ctx: &ActionContext,
    ) -> bool {
        match flow.block_type.trim() {
            "" => false,
            "SetVariable" => {
                let Some(target) = params.text("target").map(str::to_string) else {
                    return false;
                };
                let value = params.get("value").cloned().unwrap_or_default();
                self.assign(instance, &target, value);
                true
            }
            "SetVar" => {
                let Some(name) = params.text("name").map(str::to_string) else {
                    self.actions.run("SetVar", ctx, &params);
                    return true;
                };

                let value = match params.text("operation").and_then(ModifyOp::parse) {
                    Some(op) => {
                        let current = self.read_variable(instance, ctx, &name);
                        let a = params
                            .get("operand1")
                            .filter(|v| !v.is_null())
                            .map(|v| self.resolve_operand(instance, ctx, v))
                            .unwrap_or(current);
                        let b = params
                            .get("operand2")
                            .or_else(|| params.get("value"))
                            .map(|v| self.resolve_operand(instance, ctx, v))
                            .unwrap_or_default();
                        op.apply_value(&a, &b)
                    }
                    None => params.get("value").cloned().unwrap_or_default(),
                };

                if !self.entity_has_var(&instance.entity_id, &name) && instance.has_variable(&name) {
                    self.write_module_variable(instance, &name, value);
                } else {
                    // the operation is already applied
                    for key in ["operation", "operand1", "operand2"] {
                        params.shift_remove(key);
                    }
                    params.insert("value".to_string(), value);
                    self.actions.run("SetVar", ctx, &params);
                }
                true
            }
            action => {
                self.actions.run(action, ctx, &params);
                true
            }
        }
    }

    fn execute_async(
        &self,
        instance: &mut ModuleInstance,
        node_id: &str,
        flow: &FlowNode,
        params: &ValueMap,
        ctx: &ActionContext,
        dt: f64,
    ) -> BlockOutcome {
        match flow.block_type.as_str() {
            "Wait" => {
                if let Some(BlockState::Wait { remaining, resolved }) = instance.node_state.get_mut(node_id) {
                    *remaining -= dt;
                    if *remaining <= 0.0 {
                        *resolved = true;
                    }
                    let fired = *resolved;
                    if fired {
                        instance.node_state.remove(node_id);
                        return BlockOutcome::Done;
                    }
                    return BlockOutcome::Waiting;
                }

                let seconds = params
                    .num("seconds")
                    .or_else(|| params.num("duration"))
                    .or_else(|| params.num("time"))
                    .unwrap_or(0.0);
                if seconds <= 0.0 {
                    return BlockOutcome::Done;
                }
                instance.node_state.insert(
                    node_id.to_string(),
                    BlockState::Wait {
                        remaining: seconds,
                        resolved: false,
                    },
                );
                BlockOutcome::Waiting
            }
            "MoveTo" => {
                let x = params.num("x").unwrap_or(0.0);
                let y = params.num("y").unwrap_or(0.0);
                let speed = params.num("speed").unwrap_or(100.0);

                if !self.entities.borrow().contains(&instance.entity_id) {
                    return BlockOutcome::Failed;
                }
                self.actions
                    .run("MoveToward", ctx, &params! { "x" => x, "y" => y, "speed" => speed });

                let position = self
                    .entities
                    .borrow()
                    .get(&instance.entity_id)
                    .map(|e| e.position());
                match position {
                    Some(p) if p.distance_squared(tickflow_core::Vec2::new(x, y)) <= ARRIVE_DISTANCE_SQ => {
                        BlockOutcome::Done
                    }
                    Some(_) => BlockOutcome::Waiting,
                    None => BlockOutcome::Failed,
                }
            }
            "PlayAnimation" => {
                let now = self.clock.now_ms();
                let started = match instance.node_state.get(node_id) {
                    Some(BlockState::Animation { started_at_ms }) => *started_at_ms,
                    _ => {
                        instance.node_state.insert(
                            node_id.to_string(),
                            BlockState::Animation { started_at_ms: now },
                        );
                        now
                    }
                };
                let seconds = params
                    .num("seconds")
                    .or_else(|| params.num("duration"))
                    .unwrap_or(0.5);

                if (now - started) / 1000.0 >= seconds {
                    instance.node_state.remove(node_id);
                    BlockOutcome::Done
                } else {
                    BlockOutcome::Waiting
                }
            }
            other => {
                tracing::warn!(block = %other, module = %instance.module_id, "unknown async block");
                BlockOutcome::Failed
            }
        }
    }

    /// A string naming a known variable reads that variable
    fn resolve_operand(&self, instance: &ModuleInstance, ctx: &ActionContext, operand: &Value) -> Value {
        if let Value::String(name) = operand {
            let value = self.read_variable(instance, ctx, name);
            if !value.is_null() {
                return value;
            }
        }
        operand.clone()
    }

    fn read_variable(&self, instance: &ModuleInstance, ctx: &ActionContext, name: &str) -> Value {
        with_resolver(instance, ctx, self.time.get(), |r| r.variable(name))
    }

    fn entity_has_var(&self, entity_id: &EntityId, name: &str) -> bool {
        self.entities
            .borrow()
            .get(entity_id)
            .is_some_and(|e| e.has_var(name))
    }

    /// Direct assignment: entity variable, else module variable, else new entity variable
    fn assign(&self, instance: &ModuleInstance, name: &str, value: Value) {
        if !self.entity_has_var(&instance.entity_id, name) && instance.has_variable(name) {
            self.write_module_variable(instance, name, value);
            return;
        }

        let written = match self.entities.borrow_mut().get_mut(&instance.entity_id) {
            Some(entity) => {
                entity.set_var(name, value.clone());
                true
            }
            None => false,
        };
        if !written {
            self.write_module_variable(instance, name, value);
        }
    }

    fn write_module_variable(&self, instance: &ModuleInstance, name: &str, value: Value) {
        self.write_variable(
            instance.id,
            &instance.entity_id,
            &instance.graph,
            &instance.variables,
            name,
            value,
        );
    }

    fn write_variable(
        &self,
        id: InstanceId,
        entity_id: &EntityId,
        graph: &ModuleGraph,
        variables: &RefCell<ValueMap>,
        name: &str,
        value: Value,
    ) {
        variables
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        graph.set_default(name, value.clone());
        self.hooks.on_module_variable_changed(id, entity_id, name, &value);
    }

    /// Write a module-local variable of an instance
    ///
    /// Returns false if the instance is unknown or was already reported.
    pub fn set_module_variable(&self, instance: InstanceId, name: &str, value: Value) -> bool {
        let slot = self.with_instance(instance, |i| {
            (i.entity_id.clone(), Rc::clone(&i.graph), Rc::clone(&i.variables))
        });
        match slot {
            Some((entity_id, graph, variables)) => {
                self.write_variable(instance, &entity_id, &graph, &variables, name, value);
                true
            }
            None => false,
        }
    }

    /// Read a module-local variable of an instance
    pub fn module_variable(&self, instance: InstanceId, name: &str) -> Option<Value> {
        self.with_instance(instance, |i| i.variable(name)).flatten()
    }

    /// Status of an instance that has not yet been reported
    pub fn status(&self, instance: InstanceId) -> Option<ModuleStatus> {
        self.with_instance(instance, |i| i.status)
    }

    /// Ids of the instances bound to an entity
    pub fn instances_for(&self, entity_id: &EntityId) -> Vec<InstanceId> {
        let instances = self.instances.borrow();
        let pending = self.pending.borrow();
        instances
            .iter()
            .chain(pending.iter())
            .filter(|i| &i.entity_id == entity_id)
            .map(|i| i.id)
            .collect()
    }

    fn with_instance<T>(&self, instance: InstanceId, f: impl FnOnce(&ModuleInstance) -> T) -> Option<T> {
        let instances = self.instances.borrow();
        let pending = self.pending.borrow();
        instances
            .iter()
            .chain(pending.iter())
            .find(|i| i.id == instance)
            .map(f)
    }

    /// Drop every instance bound to an entity
    pub fn remove_entity(&self, entity_id: &EntityId) {
        if self.updating.get() {
            self.removed.borrow_mut().insert(entity_id.clone());
        }
        self.instances.borrow_mut().retain(|i| &i.entity_id != entity_id);
        self.pending.borrow_mut().retain(|i| &i.entity_id != entity_id);
    }

    /// Drop every instance
    pub fn clear(&self) {
        self.instances.borrow_mut().clear();
        self.pending.borrow_mut().clear();
    }

    /// Number of instances not yet reported
    pub fn instance_count(&self) -> usize {
        self.instances.borrow().len() + self.pending.borrow().len()
    }
}
