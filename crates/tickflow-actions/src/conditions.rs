//! General-purpose conditions

use crate::support::{lookup, require_text};
use tickflow_core::{ActionContext, ConditionRegistry, Error, ParamExt, Result, Value, ValueMap};

pub fn register_conditions(conditions: &ConditionRegistry) {
    conditions.register_fn("Always", |_, _| Ok(true));
    conditions.register_fn("VariableEquals", variable_equals);
    conditions.register_fn("Compare", compare);
    conditions.register_fn("IsGrounded", is_grounded);
    conditions.register_fn("IsAlive", is_alive);
    conditions.register_fn("HpBelow", hp_below);
    conditions.register_fn("KeyPressed", key_pressed);
}

fn variable_equals(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let name = require_text(params, "name")?;
    let expected = params.get("value").cloned().unwrap_or_default();
    Ok(lookup(ctx, name).loose_eq(&expected))
}

/// `name` compared with `value` by `op` (==, !=, >, <, >=, <=)
fn compare(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let name = require_text(params, "name")?;
    let op = params.text("op").unwrap_or("==");
    let left = lookup(ctx, name);
    let right = params.get("value").cloned().unwrap_or_default();

    let num = |v: &Value| v.coerce_number().unwrap_or(0.0);
    Ok(match op {
        "==" | "=" => left.loose_eq(&right),
        "!=" => !left.loose_eq(&right),
        ">" => num(&left) > num(&right),
        "<" => num(&left) < num(&right),
        ">=" => num(&left) >= num(&right),
        "<=" => num(&left) <= num(&right),
        other => {
            return Err(Error::InvalidParam {
                name: "op".into(),
                reason: format!("unknown comparison '{}'", other),
            })
        }
    })
}

fn is_grounded(ctx: &ActionContext, _params: &ValueMap) -> Result<bool> {
    Ok(ctx
        .entity_context
        .as_ref()
        .is_some_and(|c| c.borrow().collisions.grounded))
}

/// The acting entity exists and its hp (if tracked) is positive
fn is_alive(ctx: &ActionContext, _params: &ValueMap) -> Result<bool> {
    Ok(ctx
        .globals
        .entities
        .borrow()
        .get(&ctx.entity_id)
        .is_some_and(|e| e.is_alive()))
}

fn hp_below(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let limit = params.num("value").unwrap_or(0.0);
    Ok(ctx
        .globals
        .entities
        .borrow()
        .get(&ctx.entity_id)
        .and_then(|e| e.hp())
        .is_some_and(|hp| hp < limit))
}

fn key_pressed(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let key = require_text(params, "key")?;
    Ok(ctx.input.as_ref().is_some_and(|input| input.is_down(key)))
}

#[cfg(test)]
mod tests {
    use crate::support::fixture::world;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tickflow_core::{params, Entity, InputState, ValueMap};

    #[test]
    fn test_variable_equals_is_loose() {
        let w = world(vec![Entity::new("hero").with_var("armed", true).with_var("level", 3)]);
        assert!(w.check("hero", "VariableEquals", params! { "name" => "armed", "value" => "true" }));
        assert!(w.check("hero", "VariableEquals", params! { "name" => "level", "value" => "3" }));
        assert!(!w.check("hero", "VariableEquals", params! { "name" => "level", "value" => 4 }));
    }

    #[test]
    fn test_compare_reads_module_scope_after_entity() {
        let w = world(vec![Entity::new("hero").with_var("hp", 50)]);
        let scope = Rc::new(RefCell::new(params! { "hp" => 10, "stage" => 2 }));
        let ctx = w.ctx("hero").with_scope(scope);

        assert!(w.check_with(&ctx, "Compare", params! { "name" => "hp", "op" => ">", "value" => 40 }));
        assert!(w.check_with(&ctx, "Compare", params! { "name" => "stage", "op" => ">=", "value" => 2 }));
        assert!(!w.check_with(&ctx, "Compare", params! { "name" => "hp", "op" => "~", "value" => 1 }));
    }

    #[test]
    fn test_status_conditions() {
        let w = world(vec![
            Entity::new("hero").with_var("hp", 5),
            Entity::new("ghost").with_var("hp", 0),
        ]);
        assert!(w.check("hero", "IsAlive", ValueMap::new()));
        assert!(!w.check("ghost", "IsAlive", ValueMap::new()));
        assert!(!w.check("nobody", "IsAlive", ValueMap::new()));
        assert!(w.check("hero", "HpBelow", params! { "value" => 10 }));
        assert!(!w.check("hero", "HpBelow", params! { "value" => 5 }));
        assert!(w.check("hero", "Always", ValueMap::new()));
    }

    #[test]
    fn test_grounded_and_keys() {
        let w = world(vec![Entity::new("hero")]);
        assert!(!w.check("hero", "IsGrounded", ValueMap::new()));

        let entity_ctx = w.entity_context();
        entity_ctx.borrow_mut().collisions.grounded = true;
        let ctx = w
            .ctx("hero")
            .with_entity_context(entity_ctx)
            .with_input(InputState::new().with_key("Space"));

        assert!(w.check_with(&ctx, "IsGrounded", ValueMap::new()));
        assert!(w.check_with(&ctx, "KeyPressed", params! { "key" => "Space" }));
        assert!(!w.check_with(&ctx, "KeyPressed", params! { "key" => "W" }));
    }
}
