//! Value resolution and node condition evaluation

use crate::{Axis, ConditionKind, ConditionNode, Edge, ModuleGraph, ModuleInstance, MouseMode, Operand, ValueSource};
use tickflow_core::{ActionContext, EntityId, EntityStore, InputState, Renderer, Value, ValueMap, Vec2};

/// Reads named values on behalf of one instance
///
/// Lookup order for names: the `Mouse`/`Time` pseudo-variables, then the
/// entity's own variable, then the module-local variable.
pub struct Resolver<'a> {
    pub entity_id: &'a EntityId,
    pub entities: &'a EntityStore,
    pub renderer: Option<&'a dyn Renderer>,
    pub input: Option<&'a InputState>,
    /// Seconds of simulated time, exposed as `Time`
    pub time: f64,
    pub module_vars: Option<&'a ValueMap>,
}

impl<'a> Resolver<'a> {
    /// Resolve a variable name
    pub fn variable(&self, name: &str) -> Value {
        match name {
            "Mouse" => {
                return self
                    .input
                    .map(|i| Value::Vec2(i.mouse()))
                    .unwrap_or(Value::Null)
            }
            "Time" => return Value::Float(self.time),
            _ => {}
        }

        if let Some(value) = self
            .entities
            .get(self.entity_id)
            .and_then(|e| e.get_var(name))
        {
            return value.clone();
        }

        self.module_vars
            .and_then(|vars| vars.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Resolve a `Value` node's source
    pub fn source(&self, source: &ValueSource) -> Value {
        match source {
            ValueSource::Literal(value) => value.clone(),
            ValueSource::Variable { name } => self.variable(name),
            ValueSource::Property {
                target_id,
                property,
            } => {
                let target = self.target(target_id);
                if property == "position" {
                    return self
                        .position_of(&target)
                        .map(Value::Vec2)
                        .unwrap_or(Value::Null);
                }
                self.entities
                    .get(&target)
                    .and_then(|e| e.property(property))
                    .unwrap_or(Value::Null)
            }
            ValueSource::Mouse { axis, mode } => {
                let Some(input) = self.input else {
                    return Value::Null;
                };
                let point = match mode {
                    MouseMode::Absolute => input.mouse(),
                    MouseMode::Screen => input.screen(),
                    MouseMode::Relative => {
                        let origin = self.position_of(self.entity_id).unwrap_or_default();
                        input.mouse() - origin
                    }
                };
                match axis {
                    Some(Axis::X) => Value::Float(point.x),
                    Some(Axis::Y) => Value::Float(point.y),
                    None => Value::Vec2(point),
                }
            }
        }
    }

    /// Position of an entity, preferring the renderer's view
    pub fn position_of(&self, id: &EntityId) -> Option<Vec2> {
        self.renderer
            .and_then(|r| r.position(id))
            .or_else(|| self.entities.get(id).map(|e| e.position()))
    }

    fn target(&self, target_id: &str) -> EntityId {
        if target_id.is_empty() || target_id == "self" {
            self.entity_id.clone()
        } else {
            EntityId::from(target_id)
        }
    }

    /// Resolve one input port: a value edge wins over the literal param
    pub fn input_port(&self, graph: &ModuleGraph, node_id: &str, port: &str, params: &ValueMap) -> Value {
        match graph.value_input(node_id, port) {
            Some(source) => self.source(source),
            None => params.get(port).cloned().unwrap_or(Value::Null),
        }
    }

    /// Resolve every param of a node, adding value-fed ports the params lack
    pub fn input_ports(&self, graph: &ModuleGraph, node_id: &str, params: &ValueMap) -> ValueMap {
        let mut resolved: ValueMap = params
            .keys()
            .map(|key| (key.clone(), self.input_port(graph, node_id, key, params)))
            .collect();

        for edge in &graph.edges {
            if let Edge::Value {
                to_node_id,
                to_port,
                ..
            } = edge
            {
                if to_node_id == node_id && !resolved.contains_key(to_port) {
                    let value = self.input_port(graph, node_id, to_port, params);
                    resolved.insert(to_port.clone(), value);
                }
            }
        }
        resolved
    }

    fn operand(&self, graph: &ModuleGraph, node_id: &str, port: &str, operand: Option<&Operand>) -> Value {
        if let Some(source) = graph.value_input(node_id, port) {
            return self.source(source);
        }
        match operand {
            Some(Operand::Variable(name)) => self.variable(name),
            Some(Operand::Literal(value)) => value.clone(),
            None => Value::Null,
        }
    }
}

/// Run `f` with a resolver bound to an instance and its action context
pub fn with_resolver<T>(
    instance: &ModuleInstance,
    ctx: &ActionContext,
    time: f64,
    f: impl FnOnce(&Resolver<'_>) -> T,
) -> T {
    let entities = ctx.globals.entities.borrow();
    let vars = instance.variables.borrow();
    let resolver = Resolver {
        entity_id: &instance.entity_id,
        entities: &entities,
        renderer: ctx.globals.renderer.as_deref(),
        input: ctx.input.as_ref(),
        time,
        module_vars: Some(&vars),
    };
    f(&resolver)
}

/// Whether a switched value selects a case
///
/// Numbers (and numeric strings) compare numerically, booleans (and the
/// strings "true"/"false") compare as booleans, anything else as text.
pub fn switch_matches(actual: &Value, case: &Value) -> bool {
    if let (Some(a), Some(b)) = (numeric(actual), numeric(case)) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (boolish(actual), boolish(case)) {
        return a == b;
    }
    actual.to_plain_string() == case.to_plain_string()
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(_) | Value::Float(_) => value.as_float(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

fn boolish(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Evaluate a `Condition` node for an instance
///
/// `Changed` conditions update the instance's snapshot as a side effect.
pub fn evaluate_condition(
    instance: &mut ModuleInstance,
    node_id: &str,
    node: &ConditionNode,
    ctx: &ActionContext,
    time: f64,
) -> bool {
    let (left, verdict) = with_resolver(instance, ctx, time, |resolver| {
        let graph = &instance.graph;
        let left = resolver.operand(graph, node_id, "left", node.left.as_ref());
        let right = resolver.operand(graph, node_id, "right", node.right.as_ref());
        let verdict = evaluate_kind(&node.condition, &left, &right, resolver, ctx);
        (left, verdict)
    });

    if let Some(passed) = verdict {
        return passed;
    }

    let key = format!("{}:left", node_id);
    match instance.value_snapshots.insert(key, left.clone()) {
        Some(previous) => previous != left,
        None => false,
    }
}

/// Stateless condition kinds; `None` means the kind needs snapshot state
fn evaluate_kind(
    kind: &ConditionKind,
    left: &Value,
    right: &Value,
    resolver: &Resolver<'_>,
    ctx: &ActionContext,
) -> Option<bool> {
    let num = |v: &Value| v.coerce_number().unwrap_or(0.0);

    let passed = match kind {
        ConditionKind::Equals => left.loose_eq(right),
        ConditionKind::NotEquals => !left.loose_eq(right),
        ConditionKind::GreaterThan => num(left) > num(right),
        ConditionKind::LessThan => num(left) < num(right),
        ConditionKind::GreaterOrEqual => num(left) >= num(right),
        ConditionKind::LessOrEqual => num(left) <= num(right),
        ConditionKind::Changed => return None,
        ConditionKind::InputKey { key } => ctx.input.as_ref().is_some_and(|i| i.is_down(key)),
        ConditionKind::CompareTag { tag } => {
            let from_event = ctx
                .event_data
                .get("otherTag")
                .and_then(Value::as_str)
                .is_some_and(|t| t == tag);
            from_event
                || ctx.entity_context.as_ref().is_some_and(|ec| {
                    ec.borrow()
                        .collisions
                        .current
                        .iter()
                        .any(|c| c.other_tag.as_deref() == Some(tag.as_str()))
                })
        }
        ConditionKind::SignalKey { key } => ctx.entity_context.as_ref().is_some_and(|ec| {
            let ec = ec.borrow();
            ec.signals.is_set(key)
                && (right.is_null()
                    || ec
                        .signals
                        .values
                        .get(key)
                        .is_some_and(|v| v.loose_eq(right)))
        }),
        ConditionKind::IsGrounded => ctx
            .entity_context
            .as_ref()
            .is_some_and(|ec| ec.borrow().collisions.grounded),
        ConditionKind::IsAlive => resolver
            .entities
            .get(resolver.entity_id)
            .is_some_and(|e| e.is_alive()),
        ConditionKind::DistanceLessThan {
            target_id,
            distance,
        } => distance_sq(resolver, target_id).is_some_and(|d| d < distance * distance),
        ConditionKind::DistanceGreaterThan {
            target_id,
            distance,
        } => distance_sq(resolver, target_id).is_some_and(|d| d > distance * distance),
    };
    Some(passed)
}

fn distance_sq(resolver: &Resolver<'_>, target_id: &str) -> Option<f64> {
    let me = resolver.position_of(resolver.entity_id)?;
    let other = resolver.position_of(&EntityId::from(target_id))?;
    Some(me.distance_squared(other))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;
    use std::rc::Rc;
    use tickflow_core::{params, Entity, EventBus, Globals, InstanceId};

    fn store() -> EntityStore {
        let mut store = EntityStore::new();
        store.insert(Entity::new("hero").at(10.0, 20.0).with_var("hp", 50));
        store.insert(Entity::new("goal").at(13.0, 24.0));
        store
    }

    #[test]
    fn test_entity_variable_wins_over_module() {
        let entities = store();
        let module_vars = params! { "hp" => 10, "ammo" => 3 };
        let hero = EntityId::from("hero");
        let resolver = Resolver {
            entity_id: &hero,
            entities: &entities,
            renderer: None,
            input: None,
            time: 2.5,
            module_vars: Some(&module_vars),
        };

        assert_eq!(resolver.variable("hp"), Value::Int(50));
        assert_eq!(resolver.variable("ammo"), Value::Int(3));
        assert_eq!(resolver.variable("Time"), Value::Float(2.5));
        assert_eq!(resolver.variable("missing"), Value::Null);
    }

    #[test]
    fn test_property_and_mouse_sources() {
        let entities = store();
        let input = InputState::new().with_mouse(15.0, 25.0);
        let hero = EntityId::from("hero");
        let resolver = Resolver {
            entity_id: &hero,
            entities: &entities,
            renderer: None,
            input: Some(&input),
            time: 0.0,
            module_vars: None,
        };

        assert_eq!(
            resolver.source(&ValueSource::Property {
                target_id: "goal".into(),
                property: "position".into()
            }),
            Value::Vec2(Vec2::new(13.0, 24.0))
        );
        assert_eq!(
            resolver.source(&ValueSource::Property {
                target_id: "self".into(),
                property: "hp".into()
            }),
            Value::Int(50)
        );
        assert_eq!(
            resolver.source(&ValueSource::Mouse {
                axis: Some(Axis::X),
                mode: MouseMode::Relative
            }),
            Value::Float(5.0)
        );
        assert_eq!(
            resolver.source(&ValueSource::Mouse {
                axis: None,
                mode: MouseMode::Absolute
            }),
            Value::Vec2(Vec2::new(15.0, 25.0))
        );
    }

    #[test]
    fn test_changed_tracks_snapshot_per_node() {
        let entities = EntityStore::shared();
        entities.borrow_mut().insert(Entity::new("hero").with_var("hp", 50));
        let globals = Globals::new(Rc::clone(&entities), Rc::new(EventBus::new()));
        let ctx = ActionContext::new("hero", globals);

        let changed = |operand: &str| ConditionNode {
            left: Some(Operand::Variable(operand.into())),
            right: None,
            condition: ConditionKind::Changed,
        };
        let graph = Rc::new(
            ModuleGraph::new("watch", "entry")
                .node("entry", NodeKind::Entry)
                .node("hp", NodeKind::Condition(changed("hp")))
                .node("ammo", NodeKind::Condition(changed("ammo"))),
        );
        let mut instance = ModuleInstance::new(
            InstanceId::new(1),
            EntityId::from("hero"),
            graph,
            params! { "ammo" => 3 },
        );
        let check = |node_id: &str, instance: &mut ModuleInstance| {
            evaluate_condition(instance, node_id, &changed(node_id), &ctx, 0.0)
        };

        // first reading only takes the snapshot
        assert!(!check("hp", &mut instance));
        assert!(!check("hp", &mut instance));

        entities
            .borrow_mut()
            .get_mut(&EntityId::from("hero"))
            .unwrap()
            .set_var("hp", 40);
        assert!(check("hp", &mut instance));
        assert!(!check("hp", &mut instance));

        // snapshots are keyed by node
        assert!(!check("ammo", &mut instance));
        instance.variables.borrow_mut().insert("ammo".into(), Value::Int(2));
        assert!(check("ammo", &mut instance));
        assert_eq!(instance.value_snapshots.get("hp:left"), Some(&Value::Int(40)));
    }

    #[test]
    fn test_switch_matching() {
        assert!(switch_matches(&Value::Int(2), &Value::from("2")));
        assert!(switch_matches(&Value::Float(2.0), &Value::Int(2)));
        assert!(switch_matches(&Value::Bool(true), &Value::from("TRUE")));
        assert!(switch_matches(&Value::from("idle"), &Value::from("idle")));
        assert!(!switch_matches(&Value::from("idle"), &Value::from("run")));
        assert!(!switch_matches(&Value::Int(1), &Value::from("one")));
    }
}
