//! Arena Example
//!
//! Demonstrates tickflow with a hero hunting a slime. The scene (rules,
//! entities and an intro module) is loaded from RON; the host drives one
//! update per 16ms frame and reacts to the events logic emits.
//!
//! Run with `RUST_LOG=debug` to see every action.

mod host;

use host::ArenaCore;
use std::cell::RefCell;
use std::rc::Rc;
use tickflow_core::{
    event_types, params, ActionRegistry, CollisionContact, ConditionRegistry, EntityId,
    EntityStore, EventBus, GameCore, Globals, InputState, ManualClock, ValueMap,
};
use tickflow_logic::LogicSystem;
use tickflow_script::{load_config_str, Loader};
use tracing_subscriber::EnvFilter;

const FRAME_MS: f64 = 16.0;
const FRAMES: usize = 90;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    println!("=== Tickflow Arena Example ===\n");

    let config = load_config_str(include_str!("../config.ron"))?;
    let mut loader = Loader::new();
    loader.load_str(include_str!("../scene.ron"))?;

    let clock = Rc::new(ManualClock::new(0.0));
    let events = Rc::new(EventBus::with_clock(clock.clone()));
    let entities = EntityStore::shared();
    let core = Rc::new(ArenaCore::new(Rc::clone(&entities)));
    let globals = Globals::new(Rc::clone(&entities), Rc::clone(&events)).with_game_core(core.clone());

    let actions = Rc::new(ActionRegistry::new());
    let conditions = Rc::new(ConditionRegistry::new());
    tickflow_actions::register_defaults(&actions, &conditions);

    let system = LogicSystem::new(globals, actions, conditions, config);
    core.attach(&system);
    loader.finish().install(&system);

    // Deaths are handled between frames, never inside an action.
    let fallen = Rc::new(RefCell::new(Vec::<EntityId>::new()));
    let sink = Rc::clone(&fallen);
    let bus = Rc::downgrade(&events);
    events.on(move |event| {
        match event.event_type.as_str() {
            event_types::HP_CHANGED => {
                let Some(id) = event.get_entity("entityId") else {
                    return Ok(());
                };
                let hp = event.get("hp").and_then(|v| v.coerce_number()).unwrap_or(0.0);
                println!("  {} hp -> {}", id, hp);
                if let Some(bus) = bus.upgrade() {
                    bus.emit("Hurt", event.data.clone(), Some(id.clone()));
                }
                if hp <= 0.0 {
                    sink.borrow_mut().push(id);
                }
            }
            event_types::DIALOGUE_SHOW => {
                println!(
                    "  [{}] {}",
                    event.get_str("entityId").unwrap_or("?"),
                    event.get_str("text").unwrap_or("")
                );
            }
            event_types::EVENT_SIGNAL => {
                println!("  signal '{}'", event.get_str("signal").unwrap_or(""));
            }
            _ => {}
        }
        Ok(())
    });

    let ids = entities.borrow().ids();
    for id in ids {
        events.emit(event_types::ON_START, ValueMap::new(), Some(id));
    }

    for frame in 1..=FRAMES {
        clock.advance(FRAME_MS);

        if frame == 2 {
            events.emit(
                event_types::COLLISION_ENTER,
                params! {
                    "entityA" => "hero", "entityB" => "floor", "tagA" => "Player", "tagB" => "Wall"
                },
                None,
            );
        }
        let input = (frame % 30 == 0).then(|| InputState::new().with_key("Space"));
        system.set_input(input);

        for result in system.on_update(FRAME_MS / 1000.0) {
            println!(
                "  module '{}' on {} finished: {:?}",
                result.module_id, result.entity_id, result.outcome
            );
        }
        // A host may call twice in one frame; the second call is absorbed.
        system.on_update(FRAME_MS / 1000.0);

        let defeated: Vec<EntityId> = fallen.borrow_mut().drain(..).collect();
        for id in defeated {
            println!("  {} defeated", id);
            if core.remove_entity(&id) {
                system.remove_entity(&id);
            }
        }

        if frame % 15 == 0 {
            let store = entities.borrow();
            let hero = store.get(&EntityId::from("hero"));
            println!(
                "Frame {:>3}: hero at ({:.1}, {:.1}), slime hp {}",
                frame,
                hero.map_or(0.0, |h| h.x),
                hero.map_or(0.0, |h| h.y),
                store
                    .get(&EntityId::from("slime"))
                    .and_then(|s| s.hp())
                    .map_or_else(|| "gone".to_string(), |hp| hp.to_string()),
            );
        }
    }

    let grounded = system
        .context()
        .entity(&EntityId::from("hero"))
        .borrow()
        .collisions
        .current
        .contains(&CollisionContact {
            other_id: EntityId::from("floor"),
            other_tag: Some("Wall".into()),
            self_tag: Some("Player".into()),
        });
    println!("\nHero standing on the floor: {}", grounded);
    println!("Logical frames: {}", system.frame_count());

    system.shutdown();
    println!("\n=== Simulation Complete ===");
    Ok(())
}
