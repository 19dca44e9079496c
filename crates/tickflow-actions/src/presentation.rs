//! Presentation actions: transforms the renderer shows and cues the host plays

use crate::support::require_text;
use tickflow_core::{event_types, params, ActionContext, ActionRegistry, Error, ParamExt, Result, ValueMap};

pub fn register(actions: &ActionRegistry) {
    actions.register_fn("Rotate", rotate);
    actions.register_fn("Pulse", pulse);
    actions.register_fn("ShowDialogue", show_dialogue);
    actions.register_fn("PlaySound", play_sound);
}

/// Spin at `speed` degrees per second
fn rotate(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let id = &ctx.entity_id;
    let delta = (params.num("speed").unwrap_or(90.0) * ctx.dt()).to_radians();

    let stored = ctx.globals.entities.borrow_mut().get_mut(id).map(|e| {
        e.rotation += delta;
        e.rotation
    });
    let rotation = match stored {
        Some(rotation) => rotation,
        None => {
            let current = ctx
                .globals
                .renderer
                .as_ref()
                .and_then(|r| r.rotation(id))
                .ok_or_else(|| Error::EntityNotFound(id.to_string()))?;
            current + delta
        }
    };

    if let Some(renderer) = &ctx.globals.renderer {
        renderer.set_rotation(id, rotation);
    }
    Ok(())
}

/// Oscillate the scale between `minScale` and `maxScale`
fn pulse(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let speed = params.num("speed").unwrap_or(2.0);
    let min = params.num("minScale").unwrap_or(0.8);
    let max = params.num("maxScale").unwrap_or(1.2);

    let seconds = ctx.globals.clock.now_ms() * 0.001;
    let t = (seconds * speed).sin() * 0.5 + 0.5;
    let scale = min + (max - min) * t;

    let id = &ctx.entity_id;
    if let Some(renderer) = &ctx.globals.renderer {
        renderer.set_scale(id, scale, scale);
    }
    if let Some(entity) = ctx.globals.entities.borrow_mut().get_mut(id) {
        entity.scale_x = scale;
        entity.scale_y = scale;
    }
    Ok(())
}

fn show_dialogue(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let text = require_text(params, "text")?;
    ctx.globals.events.emit(
        event_types::DIALOGUE_SHOW,
        params! { "entityId" => ctx.entity_id.as_str(), "text" => text },
        None,
    );
    Ok(())
}

fn play_sound(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let sound_key = require_text(params, "soundKey")?;
    let volume = params.num("volume").unwrap_or(1.0);
    ctx.globals.events.emit(
        event_types::PLAY_SOUND,
        params! { "entityId" => ctx.entity_id.as_str(), "soundKey" => sound_key, "volume" => volume },
        None,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::support::fixture::world;
    use tickflow_core::{event_types, params, Entity, EntityId, Value};

    #[test]
    fn test_rotate_accumulates_degrees() {
        let w = world(vec![Entity::new("fan")]);
        let ctx = w.ctx("fan").with_event_data(params! { "dt" => 0.5 });
        w.actions.run("Rotate", &ctx, &params! { "speed" => 180 });
        w.actions.run("Rotate", &ctx, &params! { "speed" => 180 });

        let rotation = w.entities.borrow().get(&EntityId::from("fan")).unwrap().rotation;
        assert!((rotation - std::f64::consts::PI).abs() < 1e-9);
        assert!((w.renderer.object("fan").unwrap().rotation - rotation).abs() < 1e-12);
    }

    #[test]
    fn test_pulse_stays_in_bounds() {
        let w = world(vec![Entity::new("gem")]);
        for _ in 0..10 {
            w.clock.advance(137.0);
            w.run("gem", "Pulse", params! { "minScale" => 0.5, "maxScale" => 1.5 });
            let scale = w.renderer.object("gem").unwrap().scale.0;
            assert!((0.5..=1.5).contains(&scale));
        }
    }

    #[test]
    fn test_dialogue_and_sound_events() {
        let w = world(vec![Entity::new("npc")]);
        w.run("npc", "ShowDialogue", params! { "text" => "Hello" });
        w.run("npc", "ShowDialogue", params! { "text" => "  " });
        w.run("npc", "PlaySound", params! { "soundKey" => "chime" });

        let dialogue = w.events_of(event_types::DIALOGUE_SHOW);
        assert_eq!(dialogue.len(), 1);
        assert_eq!(dialogue[0].get_str("text"), Some("Hello"));

        let sound = w.events_of(event_types::PLAY_SOUND);
        assert_eq!(sound[0].get("volume"), Some(&Value::Float(1.0)));
    }
}
