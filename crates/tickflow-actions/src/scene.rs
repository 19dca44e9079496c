//! Scene transitions and scene flags

use crate::support::require_text;
use tickflow_core::{
    event_types, params, ActionContext, ActionRegistry, ConditionRegistry, Error, ParamExt,
    Result, Value, ValueMap,
};

pub fn register(actions: &ActionRegistry) {
    actions.register_fn("ChangeScene", |ctx, params| {
        change_scene(ctx, require_text(params, "sceneName")?, params)
    });
    actions.register_fn("CHANGE_SCENE", |ctx, params| {
        change_scene(ctx, require_text(params, "sceneId")?, params)
    });
    actions.register_fn("SET_SCENE_FLAG", set_scene_flag);
}

pub fn register_conditions(conditions: &ConditionRegistry) {
    conditions.register_fn("IF_SCENE_FLAG", if_scene_flag);
}

fn change_scene(ctx: &ActionContext, to: &str, params: &ValueMap) -> Result<()> {
    let scene = ctx
        .globals
        .scene
        .as_ref()
        .ok_or(Error::Unavailable("scene control"))?;

    let from = scene.current_scene();
    ctx.globals.events.emit(
        event_types::SCENE_CHANGING,
        params! { "from" => from, "to" => to },
        None,
    );
    let data = params.get("data").cloned().unwrap_or(Value::Null);
    scene.start_scene(to, &data);
    Ok(())
}

fn set_scene_flag(ctx: &ActionContext, params: &ValueMap) -> Result<()> {
    let flag = require_text(params, "flag")?;
    let value = params.flag("value").unwrap_or(true);
    ctx.globals.scene_state.borrow_mut().set_flag(flag, value);
    Ok(())
}

fn if_scene_flag(ctx: &ActionContext, params: &ValueMap) -> Result<bool> {
    let flag = require_text(params, "flag")?;
    let expected = params.flag("value").unwrap_or(true);
    Ok(ctx.globals.scene_state.borrow().flag(flag) == expected)
}

#[cfg(test)]
mod tests {
    use crate::support::fixture::world;
    use tickflow_core::{event_types, params, Entity, Value};

    #[test]
    fn test_change_scene_announces_transition() {
        let w = world(vec![Entity::new("portal")]);
        w.run("portal", "ChangeScene", params! { "sceneName" => "level-2", "data" => 7 });
        w.run("portal", "CHANGE_SCENE", params! { "sceneId" => "boss" });

        let history = w.scene.history.borrow();
        assert_eq!(history[0], ("level-2".to_string(), Value::Int(7)));
        assert_eq!(history[1], ("boss".to_string(), Value::Null));

        let changing = w.events_of(event_types::SCENE_CHANGING);
        assert_eq!(changing[0].get_str("from"), Some("level-1"));
        assert_eq!(changing[1].get_str("from"), Some("level-2"));
    }

    #[test]
    fn test_scene_flags() {
        let w = world(vec![Entity::new("lever")]);
        assert!(w.check("lever", "IF_SCENE_FLAG", params! { "flag" => "gate", "value" => false }));
        assert!(!w.check("lever", "IF_SCENE_FLAG", params! { "flag" => "gate" }));

        w.run("lever", "SET_SCENE_FLAG", params! { "flag" => "gate" });
        assert!(w.check("lever", "IF_SCENE_FLAG", params! { "flag" => "gate" }));

        // Missing flag name is a broken condition
        assert!(!w.check("lever", "IF_SCENE_FLAG", params! {}));
    }
}
