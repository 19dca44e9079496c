//! Combat and status actions
//!
//! Hit points live in the `hp`/`maxHp` variables. Every change is announced
//! with an `HP_CHANGED` event; the entity borrow is always released before
//! emitting so handlers may read or write entities.

use crate::support::{exists, own_number, position_of, DEFAULT_HP};
use std::cell::RefCell;
use std::collections::HashMap;
use tickflow_core::{
    event_types, params, Action, ActionContext, ActionRegistry, EntityId, Error, ParamExt,
    Result, ValueMap, Vec2,
};

pub fn register(actions: &ActionRegistry) {
    actions.register(Attack::default());
    actions.register_fn("FireProjectile", fire_projectile);
    actions.register_fn("TakeDamage", take_damage);
    actions.register_fn("Heal", heal);
}

/// Damage every candidate target within range
///
/// Targets are `targetId` if it exists, else all entities with `targetRole`,
/// else every entity. Damage comes from the attacker's `attack` or `damage`
/// variable, then the `damage` parameter; range from `attackRange`, then the
/// `range` parameter. A positive `cooldown` (ms) limits how often one
/// attacker lands hits.
#[derive(Debug, Default)]
pub struct Attack {
    last_hit: RefCell<HashMap<EntityId, f64>>,
}

impl Attack {
    fn targets(&self, ctx: &ActionContext, params: &ValueMap) -> Vec<EntityId> {
        if let Some(id) = params.text("targetId").map(EntityId::from) {
            if exists(ctx, &id) {
                return vec![id];
            }
        }

        if let Some(role) = params.text("targetRole") {
            if let Some(core) = &ctx.globals.game_core {
                return core.entities_by_role(role);
            }
            let entities = ctx.globals.entities.borrow();
            return entities.by_role(role).map(|e| e.id.clone()).collect();
        }

        match &ctx.globals.renderer {
            Some(renderer) => renderer.all_entity_ids(),
            None => ctx.globals.entities.borrow().ids(),
        }
    }

    fn cooling_down(&self, attacker: &EntityId, now: f64, cooldown: f64) -> bool {
        cooldown > 0.0
            && self
                .last_hit
                .borrow()
                .get(attacker)
                .is_some_and(|last| now - last < cooldown)
    }
}

impl Action for Attack {
    fn name(&self) -> &str {
        "Attack"
    }

    fn run(&self, ctx: &ActionContext, params: &ValueMap) -> Result<()> {
        if !ctx.is_alive() {
            return Ok(());
        }

        let attacker = &ctx.entity_id;
        let now = ctx.globals.clock.now_ms();
        let cooldown = params.num("cooldown").unwrap_or(0.0);
        if self.cooling_down(attacker, now, cooldown) {
            return Ok(());
        }

        let origin =
            position_of(ctx, attacker).ok_or_else(|| Error::EntityNotFound(attacker.to_string()))?;
        let range = own_number(ctx, &["attackRange"])
            .or_else(|| params.num("range"))
            .unwrap_or(100.0);
        let damage = own_number(ctx, &["attack", "damage"])
            .or_else(|| params.num("damage"))
            .unwrap_or(10.0);

        let mut hit = false;
        for id in self.targets(ctx, params) {
            if &id == attacker {
                continue;
            }
            let Some(position) = position_of(ctx, &id) else {
                continue;
            };
            if position.distance_squared(origin) > range * range {
                continue;
            }
            let dead = ctx
                .globals
                .entities
                .borrow()
                .get(&id)
                .and_then(|e| e.hp())
                .is_some_and(|hp| hp <= 0.0);
            if dead {
                continue;
            }
            hit |= apply_damage(ctx, &id, damage);
        }

        if hit {
            self.last_hit.borrow_mut().insert(attacker.clone(), now);
        }
        Ok(())
    }
}

/// Reduce a target's hp, initialising `hp`/`maxHp` when it tracks neither
///
/// Returns false if the target has no store entry.
pub fn apply_damage(ctx: &ActionContext, target: &EntityId, damage: f64) -> bool {
    let (hp, max_hp) = {
        let mut entities = ctx.globals.entities.borrow_mut();
        let Some(entity) = entities.get_mut(target) else {
            return false;
        };

        let mut hp = entity.number_var("hp");
        let mut max_hp = entity.number_var("maxHp");
        if hp.is_none() && max_hp.is_none() {
            tracing::debug!(entity = %target, hp = DEFAULT_HP, "initializing default hp");
            entity.set_var("maxHp", DEFAULT_HP);
            entity.set_var("hp", DEFAULT_HP);
            hp = Some(DEFAULT_HP);
            max_hp = Some(DEFAULT_HP);
        }

        let next = (hp.or(max_hp).unwrap_or(DEFAULT_HP) - damage).max(0.0);
        entity.set_var("hp", next);
        (next, max_hp.unwrap_or(next))
    };

    ctx.globals.events.emit(
        event_types::HP_CHANGED,
        params! { "entityId" => target.as_str(), "hp" => hp, "maxHp" => max_hp, "damage" => damage },
        None,
    );
    true
}

/// Announce a projectile aimed at `targetId` or `(targetX, targetY)`
fn fire_projectile(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let owner = &ctx.entity_id;
    let origin = position_of(ctx, owner).ok_or_else(|| Error::EntityNotFound(owner.to_string()))?;

    let aimed = params
        .text("targetId")
        .and_then(|id| position_of(ctx, &EntityId::from(id)));
    let target = aimed
        .or_else(|| {
            params
                .num("targetX")
                .zip(params.num("targetY"))
                .map(|(x, y)| Vec2::new(x, y))
        })
        .ok_or_else(|| Error::MissingParam("targetId or targetX/targetY".into()))?;

    let delta = target - origin;
    let distance = delta.length();
    if distance == 0.0 {
        return Err(Error::InvalidParam {
            name: "target".into(),
            reason: "target is at the owner's position".into(),
        });
    }

    let speed = own_number(ctx, &["projectileSpeed"])
        .or_else(|| params.num("speed"))
        .unwrap_or(300.0);
    let damage = own_number(ctx, &["attack", "damage"])
        .or_else(|| params.num("damage"))
        .unwrap_or(10.0);
    let velocity = delta * (speed / distance);

    ctx.globals.events.emit(
        event_types::SPAWN_PROJECTILE,
        params! {
            "ownerId" => owner.as_str(),
            "x" => origin.x,
            "y" => origin.y,
            "velX" => velocity.x,
            "velY" => velocity.y,
            "damage" => damage,
        },
        None,
    );
    Ok(())
}

fn take_damage(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let amount = params.num("amount").unwrap_or(1.0);
    let (hp, max_hp) = adjust_hp(ctx, |hp, _| (hp - amount).max(0.0))?;

    let id = ctx.entity_id.as_str();
    ctx.globals.events.emit(
        event_types::HP_CHANGED,
        params! { "entityId" => id, "hp" => hp, "maxHp" => max_hp, "damage" => amount },
        None,
    );
    if hp <= 0.0 {
        ctx.globals
            .events
            .emit(event_types::ENTITY_DIED, params! { "entityId" => id }, None);
    }
    Ok(())
}

fn heal(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let amount = params.num("amount").unwrap_or(10.0);
    let (hp, max_hp) = adjust_hp(ctx, |hp, max_hp| (hp + amount).min(max_hp))?;

    ctx.globals.events.emit(
        event_types::HP_CHANGED,
        params! { "entityId" => ctx.entity_id.as_str(), "hp" => hp, "maxHp" => max_hp, "healed" => amount },
        None,
    );
    Ok(())
}

/// Rewrite the acting entity's hp; missing hp reads 0 and missing maxHp reads hp
fn adjust_hp(ctx: &ActionContext, f: impl FnOnce(f64, f64) -> f64) -> Result<(f64, f64)> {
    let mut entities = ctx.globals.entities.borrow_mut();
    let entity = entities
        .get_mut(&ctx.entity_id)
        .ok_or_else(|| Error::EntityNotFound(ctx.entity_id.to_string()))?;

    let hp = entity.number_var("hp").unwrap_or(0.0);
    let max_hp = entity.number_var("maxHp").unwrap_or(hp);
    let next = f(hp, max_hp);
    entity.set_var("hp", next);
    Ok((next, max_hp))
}
