//! Declarative event → condition → action rules

use crate::ValueMap;
use serde::{Deserialize, Serialize};

/// How a rule combines its conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConditionLogic {
    /// Every condition must pass
    #[default]
    And,
    /// Any condition may pass
    Or,
    /// First passing condition runs its own `then` list
    Branch,
}

/// A named action with parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: ValueMap,
}

impl RuleAction {
    pub fn new(kind: impl Into<String>, params: ValueMap) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// A named condition with parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: ValueMap,
    /// Actions for `ConditionLogic::Branch`
    #[serde(default)]
    pub then: Vec<RuleAction>,
}

impl RuleCondition {
    pub fn new(kind: impl Into<String>, params: ValueMap) -> Self {
        Self {
            kind: kind.into(),
            params,
            then: Vec::new(),
        }
    }

    /// Builder: branch actions
    pub fn then(mut self, actions: Vec<RuleAction>) -> Self {
        self.then = actions;
        self
    }
}

/// One declarative rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Trigger name (concrete event type or an alias such as `OnUpdate`)
    pub event: String,
    /// Event data that must match exactly
    #[serde(default)]
    pub event_params: Option<ValueMap>,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub condition_logic: ConditionLogic,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub else_actions: Vec<RuleAction>,
}

impl Rule {
    /// Create a rule with no conditions or actions
    pub fn on(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            event_params: None,
            conditions: Vec::new(),
            condition_logic: ConditionLogic::And,
            actions: Vec::new(),
            else_actions: Vec::new(),
        }
    }

    /// Builder: require event data
    pub fn with_event_params(mut self, params: ValueMap) -> Self {
        self.event_params = Some(params);
        self
    }

    /// Builder: add a condition
    pub fn when(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Builder: set condition logic
    pub fn logic(mut self, logic: ConditionLogic) -> Self {
        self.condition_logic = logic;
        self
    }

    /// Builder: add an action
    pub fn then(mut self, kind: impl Into<String>, params: ValueMap) -> Self {
        self.actions.push(RuleAction::new(kind, params));
        self
    }

    /// Builder: add an else action
    pub fn otherwise(mut self, kind: impl Into<String>, params: ValueMap) -> Self {
        self.else_actions.push(RuleAction::new(kind, params));
        self
    }
}

fn default_enabled() -> bool {
    true
}

/// A rule bound to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicComponent {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub rule: Rule,
}

impl LogicComponent {
    pub fn new(id: impl Into<String>, rule: Rule) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            rule,
        }
    }

    /// Trigger name of the bound rule
    pub fn trigger(&self) -> &str {
        &self.rule.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_rule_builder() {
        let rule = Rule::on("OnUpdate")
            .when(RuleCondition::new("IsAlive", ValueMap::new()))
            .then("Move", params! { "x" => 1 })
            .otherwise("Heal", ValueMap::new());

        assert_eq!(rule.condition_logic, ConditionLogic::And);
        assert_eq!(rule.actions[0].kind, "Move");
        assert_eq!(rule.else_actions.len(), 1);
    }

    #[test]
    fn test_rule_from_ron() {
        let text = r#"(
            event: "KEY_DOWN",
            event_params: Some({ "key": String("Space") }),
            condition_logic: Branch,
            conditions: [
                (kind: "IsGrounded", then: [(kind: "Jump")]),
            ],
            else_actions: [(kind: "PlaySound", params: { "soundKey": String("fail") })],
        )"#;
        let rule: Rule = ron::from_str(text).expect("rule parses");
        assert_eq!(rule.condition_logic, ConditionLogic::Branch);
        assert_eq!(rule.conditions[0].then[0].kind, "Jump");
        assert!(rule.actions.is_empty());
        assert_eq!(
            rule.event_params.as_ref().and_then(|p| p.get("key")),
            Some(&crate::Value::String("Space".into()))
        );
    }

    #[test]
    fn test_component_defaults_enabled() {
        let component: LogicComponent =
            ron::from_str(r#"(id: "c1", rule: (event: "OnStart"))"#).expect("component parses");
        assert!(component.enabled);
        assert_eq!(component.trigger(), "OnStart");
    }
}
