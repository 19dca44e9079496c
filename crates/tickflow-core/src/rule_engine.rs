//! Matching events against rules

use crate::event::event_types;
use crate::{
    ActionContext, ActionRegistry, ConditionLogic, ConditionRegistry, GameEvent, Rule,
    RuleAction, Value, ValueMap,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Rule trigger names a concrete event type satisfies besides its own name
pub fn event_aliases(event_type: &str) -> &'static [&'static str] {
    match event_type {
        event_types::TICK => &["OnUpdate"],
        event_types::KEY_DOWN => &["OnKeyDown", "OnSignalReceive"],
        event_types::KEY_UP => &["OnKeyUp"],
        event_types::COLLISION_ENTER => &["OnCollision", "OnCollisionEnter"],
        event_types::COLLISION_STAY => &["OnCollision", "OnCollisionStay"],
        event_types::COLLISION_EXIT => &["OnCollisionExit"],
        event_types::ENTITY_DIED => &["OnDestroy", "OnDeath"],
        event_types::EVENT_SIGNAL => &["OnEventSignal", "OnSignalReceive"],
        _ => &[],
    }
}

/// Whether a rule declared with `trigger` fires for `event_type`
pub fn trigger_matches(trigger: &str, event_type: &str) -> bool {
    trigger == event_type || event_aliases(event_type).contains(&trigger)
}

/// Exact equality for event parameters (ints and floats compare by value)
fn param_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => expected == actual,
    }
}

fn event_params_match(rule: &Rule, data: &ValueMap) -> bool {
    rule.event_params.as_ref().is_none_or(|params| {
        params
            .iter()
            .all(|(key, expected)| data.get(key).is_some_and(|actual| param_eq(expected, actual)))
    })
}

/// Evaluate a rule's conditions and dispatch the winning action list
///
/// Returns whether any action list was selected.
pub fn evaluate_rule(
    rule: &Rule,
    ctx: &ActionContext,
    conditions: &ConditionRegistry,
    dispatch: &mut dyn FnMut(&RuleAction, &ActionContext),
) -> bool {
    let check = |c: &crate::RuleCondition| conditions.check(&c.kind, ctx, &c.params);

    let selected: &[RuleAction] = match rule.condition_logic {
        ConditionLogic::And => {
            if rule.conditions.iter().all(check) {
                &rule.actions
            } else {
                &rule.else_actions
            }
        }
        ConditionLogic::Or => {
            if rule.conditions.is_empty() || rule.conditions.iter().any(check) {
                &rule.actions
            } else {
                &rule.else_actions
            }
        }
        ConditionLogic::Branch => match rule.conditions.iter().find(|c| check(c)) {
            Some(winner) => &winner.then,
            None => &rule.else_actions,
        },
    };

    for action in selected {
        dispatch(action, ctx);
    }
    !selected.is_empty()
}

/// Scene-scoped rule set plus the matching procedure
pub struct RuleEngine {
    rules: RefCell<Vec<Rule>>,
    actions: Rc<ActionRegistry>,
    conditions: Rc<ConditionRegistry>,
}

impl RuleEngine {
    /// Create an engine dispatching through the given registries
    pub fn new(actions: Rc<ActionRegistry>, conditions: Rc<ConditionRegistry>) -> Self {
        Self {
            rules: RefCell::new(Vec::new()),
            actions,
            conditions,
        }
    }

    /// Replace the active rule set
    pub fn load_rules(&self, rules: Vec<Rule>) {
        tracing::info!(count = rules.len(), "rules loaded");
        *self.rules.borrow_mut() = rules;
    }

    /// Append a rule to the active set
    pub fn add_rule(&self, rule: Rule) {
        self.rules.borrow_mut().push(rule);
    }

    /// Number of scene rules
    pub fn rule_count(&self) -> usize {
        self.rules.borrow().len()
    }

    /// Condition registry used for evaluation
    pub fn conditions(&self) -> &ConditionRegistry {
        &self.conditions
    }

    /// Handle an event, running matched actions through the action registry
    ///
    /// `entity_rules`, when given, replaces the scene rule set.
    pub fn handle_event(&self, event: &GameEvent, ctx: &ActionContext, entity_rules: Option<&[Rule]>) {
        let actions = Rc::clone(&self.actions);
        self.handle_event_with(event, ctx, entity_rules, &mut |action, ctx| {
            tracing::debug!(action = %action.kind, entity = %ctx.entity_id, "executing rule action");
            actions.run(&action.kind, ctx, &action.params);
        });
    }

    /// Handle an event with a caller-supplied action dispatcher
    pub fn handle_event_with(
        &self,
        event: &GameEvent,
        ctx: &ActionContext,
        entity_rules: Option<&[Rule]>,
        dispatch: &mut dyn FnMut(&RuleAction, &ActionContext),
    ) {
        if !ctx.is_alive() {
            return;
        }
        if event.target_id.as_ref().is_some_and(|t| *t != ctx.entity_id) {
            return;
        }

        let matches = |rule: &&Rule| {
            trigger_matches(&rule.event, &event.event_type) && event_params_match(rule, &event.data)
        };

        // Actions may add rules while we iterate.
        let matching: Vec<Rule> = match entity_rules {
            Some(rules) => rules.iter().filter(matches).cloned().collect(),
            None => self.rules.borrow().iter().filter(matches).cloned().collect(),
        };

        for rule in &matching {
            evaluate_rule(rule, ctx, &self.conditions, dispatch);
        }
    }
}
