//! Event signals (global queue) and entity signals (runtime context)

use crate::support::require_text;
use tickflow_core::{
    event_types, params, ActionContext, ActionRegistry, ConditionRegistry, Result, Value,
    ValueMap,
};

pub fn register(actions: &ActionRegistry) {
    actions.register_fn("EmitEventSignal", emit_event_signal);
    actions.register_fn("ClearSignal", clear_signal);
}

pub fn register_conditions(conditions: &ConditionRegistry) {
    conditions.register_fn("OnEventSignal", on_event_signal);
    conditions.register_fn("SignalFlag", signal_flag);
}

/// Broadcast `EVENT_SIGNAL`; the orchestrator queues it for `OnEventSignal`
fn emit_event_signal(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let signal = require_text(params, "signal")?;
    ctx.globals.events.emit(
        event_types::EVENT_SIGNAL,
        params! { "signal" => signal, "sourceEntityId" => ctx.entity_id.as_str() },
        None,
    );
    Ok(())
}

/// Lower an entity signal and forget its value
fn clear_signal(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let key = require_text(params, "key")?;
    if let Some(entity_ctx) = &ctx.entity_context {
        let mut entity_ctx = entity_ctx.borrow_mut();
        entity_ctx.signals.flags.insert(key.to_string(), false);
        entity_ctx.signals.values.insert(key.to_string(), Value::Null);
    }
    Ok(())
}

/// Consume one pending occurrence of `signal`
fn on_event_signal(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let signal = require_text(params, "signal")?;
    Ok(ctx.globals.signals.consume(signal))
}

/// Entity signal `key` is raised (and equals `value`, when given)
fn signal_flag(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let key = require_text(params, "key")?;
    let Some(entity_ctx) = &ctx.entity_context else {
        return Ok(false);
    };
    let entity_ctx = entity_ctx.borrow();
    if !entity_ctx.signals.is_set(key) {
        return Ok(false);
    }

    Ok(match params.get("value").filter(|v| !v.is_null()) {
        Some(expected) => entity_ctx
            .signals
            .values
            .get(key)
            .is_some_and(|actual| actual.loose_eq(expected)),
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use crate::support::fixture::world;
    use tickflow_core::{event_types, params, Entity, Value};

    #[test]
    fn test_event_signal_consumed_once() {
        let w = world(vec![Entity::new("door")]);
        w.run("door", "EmitEventSignal", params! { "signal" => "OPEN" });

        let emitted = w.events_of(event_types::EVENT_SIGNAL);
        assert_eq!(emitted[0].get_str("sourceEntityId"), Some("door"));

        // The queue is fed by the orchestrator; feed it by hand here
        w.globals.signals.push("OPEN");
        assert!(w.check("door", "OnEventSignal", params! { "signal" => "OPEN" }));
        assert!(!w.check("door", "OnEventSignal", params! { "signal" => "OPEN" }));
    }

    #[test]
    fn test_signal_flag_and_clear() {
        let w = world(vec![Entity::new("hero")]);
        let entity_ctx = w.entity_context();
        {
            let mut c = entity_ctx.borrow_mut();
            c.signals.flags.insert("alarm".into(), true);
            c.signals.values.insert("alarm".into(), Value::Int(2));
        }
        let ctx = w.ctx("hero").with_entity_context(entity_ctx.clone());

        assert!(w.check_with(&ctx, "SignalFlag", params! { "key" => "alarm" }));
        assert!(w.check_with(&ctx, "SignalFlag", params! { "key" => "alarm", "value" => "2" }));
        assert!(!w.check_with(&ctx, "SignalFlag", params! { "key" => "alarm", "value" => 3 }));

        w.actions.run("ClearSignal", &ctx, &params! { "key" => "alarm" });
        assert!(!w.check_with(&ctx, "SignalFlag", params! { "key" => "alarm" }));
        assert_eq!(entity_ctx.borrow().signals.values.get("alarm"), Some(&Value::Null));
    }
}
