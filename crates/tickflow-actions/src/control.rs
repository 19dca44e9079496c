//! Variable and entity-control actions

use crate::support::{position_of, require_text, target_or_self};
use tickflow_core::{
    event_types, params, ActionContext, ActionRegistry, EntityId, Error, ModifyOp, ParamExt,
    Result, SpawnRequest, Value, ValueMap,
};

pub fn register(actions: &ActionRegistry) {
    actions.register_fn("SetVar", set_var);
    actions.register_fn("Enable", enable);
    actions.register_fn("Disable", disable);
    actions.register_fn("SpawnEntity", spawn_entity);
    actions.register_fn("StartModule", start_module);
}

/// Write an entity variable
///
/// With an `operation` (Add, Sub, ...) the current value is combined with
/// `value`; otherwise `value` replaces it.
fn set_var(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let name = require_text(params, "name")?;
    let operand = params.get("value").cloned().unwrap_or_default();

    let mut entities = ctx.globals.entities.borrow_mut();
    let entity = entities
        .get_mut(&ctx.entity_id)
        .ok_or_else(|| Error::EntityNotFound(ctx.entity_id.to_string()))?;

    let value = match params.text("operation") {
        Some(op) => {
            let op = ModifyOp::parse(op).ok_or_else(|| Error::InvalidParam {
                name: "operation".into(),
                reason: format!("unknown operation '{}'", op),
            })?;
            let current = entity.get_var(name).cloned().unwrap_or(Value::Int(0));
            op.apply_value(&current, &operand)
        }
        None => operand,
    };
    entity.set_var(name, value);
    Ok(())
}

/// Show or hide `targetId` (default: self) and mark it active/inactive
fn enable(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let target = target_or_self(ctx, params);
    let enabled = params.flag("enabled").unwrap_or(true);

    if !set_active(ctx, &target, enabled) {
        return Err(Error::EntityNotFound(target.to_string()));
    }

    let event = if enabled {
        event_types::ENTITY_ENABLED
    } else {
        event_types::ENTITY_DISABLED
    };
    ctx.globals
        .events
        .emit(event, params! { "entityId" => target.as_str() }, None);
    Ok(())
}

/// Remove the acting entity through the game core, or hide it without one
fn disable(ctx: &ActionContext, _params: &ValueMap) -> Result<()> {
    match &ctx.globals.game_core {
        Some(core) => {
            if !core.remove_entity(&ctx.entity_id) {
                tracing::debug!(entity = %ctx.entity_id, "disable: entity already gone");
            }
        }
        None => {
            set_active(ctx, &ctx.entity_id, false);
        }
    }
    Ok(())
}

fn set_active(ctx: &ActionContext, id: &EntityId, active: bool) -> bool {
    let mut found = false;
    if let Some(renderer) = &ctx.globals.renderer {
        if renderer.has_object(id) {
            renderer.set_visible(id, active);
            found = true;
        }
    }
    if let Some(entity) = ctx.globals.entities.borrow_mut().get_mut(id) {
        entity.active = active;
        found = true;
    }
    found
}

/// Ask the game core for a new entity at `(x, y)` (default: own position)
fn spawn_entity(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let core = ctx
        .globals
        .game_core
        .as_ref()
        .ok_or(Error::Unavailable("game core"))?;

    let mut position = position_of(ctx, &ctx.entity_id).unwrap_or_default();
    if let Some(x) = params.num("x") {
        position.x = x;
    }
    if let Some(y) = params.num("y") {
        position.y = y;
    }

    let request = SpawnRequest {
        template: params.text("template").map(str::to_string),
        position,
        role: params.text("role").map(str::to_string),
        owner: Some(ctx.entity_id.clone()),
        variables: params
            .get("variables")
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default(),
    };

    match core.create_entity(request) {
        Some(id) => {
            tracing::debug!(owner = %ctx.entity_id, spawned = %id, "entity spawned");
            Ok(())
        }
        None => Err(Error::ActionFailed("spawn request rejected".into())),
    }
}

/// Start `moduleId` on `targetId` (default: self) with optional `overrides`
fn start_module(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let module_id = require_text(params, "moduleId")?;
    let core = ctx
        .globals
        .game_core
        .as_ref()
        .ok_or(Error::Unavailable("game core"))?;

    let target = target_or_self(ctx, params);
    let overrides = params
        .get("overrides")
        .and_then(Value::as_map)
        .cloned()
        .unwrap_or_default();

    if core.start_module(&target, module_id, &overrides) {
        Ok(())
    } else {
        Err(Error::ActionFailed(format!("module '{}' could not be started", module_id)))
    }
}

#[cfg(test)]
mod tests {
    use crate::support::fixture::world;
    use tickflow_core::{event_types, params, Entity, EntityId, Value, ValueMap};

    #[test]
    fn test_set_var_creates_and_coerces() {
        let w = world(vec![Entity::new("hero").with_var("coins", 3)]);
        w.run("hero", "SetVar", params! { "name" => "coins", "value" => "12" });
        w.run("hero", "SetVar", params! { "name" => "mood", "value" => "happy" });

        assert_eq!(w.number("hero", "coins"), Some(12.0));
        assert_eq!(w.var("hero", "mood"), Some(Value::String("happy".into())));
    }

    #[test]
    fn test_set_var_with_operation() {
        let w = world(vec![Entity::new("hero").with_var("coins", 3)]);
        w.run("hero", "SetVar", params! { "name" => "coins", "value" => 4, "operation" => "Add" });
        w.run("hero", "SetVar", params! { "name" => "coins", "value" => 2, "operation" => "*" });
        assert_eq!(w.number("hero", "coins"), Some(14.0));
    }

    #[test]
    fn test_enable_and_disable_target() {
        let w = world(vec![Entity::new("hero"), Entity::new("door")]);
        w.run("hero", "Enable", params! { "targetId" => "door", "enabled" => false });

        assert!(!w.renderer.object("door").unwrap().visible);
        assert!(!w.entities.borrow().get(&EntityId::from("door")).unwrap().active);
        let disabled = w.events_of(event_types::ENTITY_DISABLED);
        assert_eq!(disabled[0].get_str("entityId"), Some("door"));
    }

    #[test]
    fn test_disable_removes_through_game_core() {
        let w = world(vec![Entity::new("coin")]);
        w.run("coin", "Disable", ValueMap::new());

        assert_eq!(*w.core.removed.borrow(), vec![EntityId::from("coin")]);
        assert!(w.entities.borrow().is_empty());
    }

    #[test]
    fn test_spawn_entity_at_owner_position() {
        let w = world(vec![Entity::new("nest").at(5.0, 6.0)]);
        w.run(
            "nest",
            "SpawnEntity",
            params! { "role" => "enemy", "y" => 20, "variables" => params! { "hp" => 3 } },
        );

        let spawned = w.core.spawned.borrow();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].position.x, 5.0);
        assert_eq!(spawned[0].position.y, 20.0);
        assert_eq!(spawned[0].owner, Some(EntityId::from("nest")));
        assert_eq!(w.number("spawn-1", "hp"), Some(3.0));
    }

    #[test]
    fn test_start_module_through_game_core() {
        let w = world(vec![Entity::new("hero")]);
        w.run("hero", "StartModule", params! { "moduleId" => "patrol", "overrides" => params! { "speed" => 2 } });
        w.run("hero", "StartModule", params! {});

        let started = w.core.started.borrow();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].module_id, "patrol");
        assert_eq!(started[0].overrides.get("speed"), Some(&Value::Int(2)));
    }
}
