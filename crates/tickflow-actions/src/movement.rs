//! Movement actions: Move, Jump, MoveToward, ChaseTarget

use crate::support::{exists, place, position_of, speed, step_toward};
use tickflow_core::{ActionContext, ActionRegistry, EntityId, Error, ParamExt, Result, ValueMap, Vec2};

pub fn register(actions: &ActionRegistry) {
    actions.register_fn("Move", move_by);
    actions.register_fn("Jump", jump);
    actions.register_fn("MoveToward", move_toward);
    actions.register_fn("ChaseTarget", chase_target);
}

/// Move along `(x, y)` scaled by speed and frame time
fn move_by(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    if !ctx.is_alive() {
        return Ok(());
    }
    let id = &ctx.entity_id;
    let from = position_of(ctx, id).ok_or_else(|| Error::EntityNotFound(id.to_string()))?;

    let direction = Vec2::new(params.num("x").unwrap_or(0.0), params.num("y").unwrap_or(0.0));
    let to = from + direction * (speed(ctx, params, 200.0) * ctx.dt());
    place(ctx, id, to);
    Ok(())
}

/// Jumping is integrated by the host's physics
fn jump(ctx: &ActionContext, _params: &ValueMap) -> Result<()> {
    tracing::debug!(entity = %ctx.entity_id, "jump left to host physics");
    Ok(())
}

fn move_toward(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    if !ctx.is_alive() {
        return Ok(());
    }
    let target = Vec2::new(
        params.num("x").ok_or_else(|| Error::MissingParam("x".into()))?,
        params.num("y").ok_or_else(|| Error::MissingParam("y".into()))?,
    );
    step_toward(ctx, target, speed(ctx, params, 100.0))?;
    Ok(())
}

/// Follow `targetId`, or the nearest entity with `targetRole`
fn chase_target(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    if !ctx.is_alive() {
        return Ok(());
    }

    let explicit = params
        .text("targetId")
        .map(EntityId::from)
        .filter(|id| exists(ctx, id));
    let target = match explicit {
        Some(id) => Some(id),
        None => match params.text("targetRole") {
            Some(role) => nearest_by_role(ctx, role),
            None => None,
        },
    };
    let Some(target) = target else {
        return Ok(());
    };

    let Some(goal) = position_of(ctx, &target) else {
        return Ok(());
    };
    step_toward(ctx, goal, speed(ctx, params, 100.0))?;
    Ok(())
}

fn nearest_by_role(ctx: &ActionContext, role: &str) -> Option<EntityId> {
    let from = position_of(ctx, &ctx.entity_id)?;
    match &ctx.globals.game_core {
        Some(core) => core.nearest_by_role(role, from, Some(&ctx.entity_id)),
        None => ctx
            .globals
            .entities
            .borrow()
            .nearest_by_role(from, role, Some(&ctx.entity_id))
            .map(|e| e.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use crate::support::fixture::world;
    use tickflow_core::{params, Entity, EntityId, Vec2};

    fn position(w: &crate::support::fixture::World, id: &str) -> Vec2 {
        w.entities.borrow().get(&EntityId::from(id)).unwrap().position()
    }

    #[test]
    fn test_move_uses_speed_variable() {
        let w = world(vec![Entity::new("hero").with_var("speed", 100)]);
        let ctx = w.ctx("hero").with_event_data(params! { "dt" => 0.5 });
        w.actions.run("Move", &ctx, &params! { "x" => 1, "y" => 0 });

        assert_eq!(position(&w, "hero"), Vec2::new(50.0, 0.0));
        assert_eq!(w.renderer.object("hero").unwrap().position, Vec2::new(50.0, 0.0));
    }

    #[test]
    fn test_dead_entity_does_not_move() {
        let w = world(vec![Entity::new("hero").with_var("hp", 0)]);
        w.run("hero", "Move", params! { "x" => 1, "y" => 1 });
        assert_eq!(position(&w, "hero"), Vec2::default());
    }

    #[test]
    fn test_move_toward_stops_within_arrival_distance() {
        let w = world(vec![Entity::new("hero").at(0.0, 0.0)]);
        let ctx = w.ctx("hero").with_event_data(params! { "dt" => 1.0 });

        w.actions.run("MoveToward", &ctx, &params! { "x" => 30, "y" => 40, "speed" => 25 });
        assert_eq!(position(&w, "hero"), Vec2::new(15.0, 20.0));

        w.actions.run("MoveToward", &ctx, &params! { "x" => 18, "y" => 24 });
        assert_eq!(position(&w, "hero"), Vec2::new(15.0, 20.0));
    }

    #[test]
    fn test_chase_nearest_by_role() {
        let w = world(vec![
            Entity::new("wolf").with_var("speed", 10),
            Entity::new("near").at(100.0, 0.0).with_role("player"),
            Entity::new("far").at(-500.0, 0.0).with_role("player"),
        ]);
        let ctx = w.ctx("wolf").with_event_data(params! { "dt" => 1.0 });
        w.actions.run("ChaseTarget", &ctx, &params! { "targetRole" => "player" });

        assert_eq!(position(&w, "wolf"), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_chase_unknown_target_is_ignored() {
        let w = world(vec![Entity::new("wolf")]);
        w.run("wolf", "ChaseTarget", params! { "targetId" => "ghost" });
        assert_eq!(position(&w, "wolf"), Vec2::default());
    }
}
