//! Publish/subscribe hub for game events
//!
//! `emit` builds a timestamped `GameEvent` and delivers it synchronously to
//! every subscriber in registration order. A failing handler is logged and
//! never stops delivery to the others. Handlers may emit, subscribe or
//! unsubscribe while an emit is in progress; such changes take effect from
//! the next emit.

use crate::{Clock, EntityId, Result, SubscriptionId, SystemClock, Value, ValueMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Well-known event type names
pub mod event_types {
    pub const TICK: &str = "TICK";
    pub const KEY_DOWN: &str = "KEY_DOWN";
    pub const KEY_UP: &str = "KEY_UP";
    pub const COLLISION_ENTER: &str = "COLLISION_ENTER";
    pub const COLLISION_STAY: &str = "COLLISION_STAY";
    pub const COLLISION_EXIT: &str = "COLLISION_EXIT";
    pub const ENTITY_DIED: &str = "ENTITY_DIED";
    pub const EVENT_SIGNAL: &str = "EVENT_SIGNAL";
    pub const HP_CHANGED: &str = "HP_CHANGED";
    pub const SPAWN_PROJECTILE: &str = "SPAWN_PROJECTILE";
    pub const ENTITY_ENABLED: &str = "ENTITY_ENABLED";
    pub const ENTITY_DISABLED: &str = "ENTITY_DISABLED";
    pub const SCENE_CHANGING: &str = "SCENE_CHANGING";
    pub const DIALOGUE_SHOW: &str = "DIALOGUE_SHOW";
    pub const PLAY_SOUND: &str = "PLAY_SOUND";
    pub const ON_START: &str = "OnStart";
    pub const ON_UPDATE: &str = "OnUpdate";
    pub const ON_CLICK: &str = "OnClick";
}

/// An immutable, timestamped event
#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    pub event_type: String,
    /// Entity the event is directed at; `None` means broadcast
    pub target_id: Option<EntityId>,
    pub data: ValueMap,
    /// Milliseconds, from the bus clock
    pub timestamp: f64,
}

impl GameEvent {
    /// Get a data field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get a data field as a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Get a data field as an entity id
    pub fn get_entity(&self, key: &str) -> Option<EntityId> {
        self.get_str(key).map(EntityId::from)
    }
}

/// Subscriber callback
pub type EventHandler = Rc<dyn Fn(&GameEvent) -> Result<()>>;

/// Synchronous event bus
pub struct EventBus {
    handlers: RefCell<Vec<(SubscriptionId, EventHandler)>>,
    next_id: Cell<u64>,
    debug: Cell<bool>,
    clock: Rc<dyn Clock>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.borrow().len())
            .field("debug", &self.debug.get())
            .finish()
    }
}

impl EventBus {
    /// Create a bus stamped by the system clock
    pub fn new() -> Self {
        Self::with_clock(Rc::new(SystemClock))
    }

    /// Create a bus stamped by the given clock
    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            debug: Cell::new(false),
            clock,
        }
    }

    /// Clock used for event timestamps
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    /// Subscribe to all events
    pub fn on<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameEvent) -> Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers.borrow_mut().push((id, Rc::new(handler)));
        id
    }

    /// Unsubscribe; returns false if the handle was unknown
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        handlers.len() != before
    }

    /// Build an event and deliver it to every subscriber
    pub fn emit(&self, event_type: &str, data: ValueMap, target_id: Option<EntityId>) {
        let event = GameEvent {
            event_type: event_type.to_string(),
            target_id,
            data,
            timestamp: self.clock.now_ms(),
        };

        if self.debug.get() {
            tracing::debug!(event_type = %event.event_type, target = ?event.target_id, data = ?event.data, "event emitted");
        }

        let snapshot: Vec<EventHandler> = self
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();

        for handler in snapshot {
            if let Err(err) = handler(&event) {
                tracing::error!(event_type = %event.event_type, error = %err, "event handler failed");
            }
        }
    }

    /// Toggle debug tracing of every emitted event
    pub fn set_debug(&self, enabled: bool) {
        self.debug.set(enabled);
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{params, Error, ManualClock};

    #[test]
    fn test_emit_in_registration_order() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Rc::clone(&seen);
            bus.on(move |e| {
                seen.borrow_mut().push(format!("{}:{}", tag, e.event_type));
                Ok(())
            });
        }

        bus.emit("TICK", ValueMap::new(), None);
        assert_eq!(*seen.borrow(), vec!["a:TICK", "b:TICK"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));

        bus.on(|_| Err(Error::HandlerFailed("boom".into())));
        let c = Rc::clone(&count);
        bus.on(move |_| {
            c.set(c.get() + 1);
            Ok(())
        });

        bus.emit("X", ValueMap::new(), None);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_off_removes_handler() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let id = bus.on(move |_| {
            c.set(c.get() + 1);
            Ok(())
        });

        bus.emit("X", ValueMap::new(), None);
        assert!(bus.off(id));
        assert!(!bus.off(id));
        bus.emit("X", ValueMap::new(), None);
        assert_eq!(count.get(), 1);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_reentrant_emit() {
        let bus = Rc::new(EventBus::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let weak = Rc::downgrade(&bus);
        let s = Rc::clone(&seen);
        bus.on(move |e| {
            s.borrow_mut().push(e.event_type.clone());
            if e.event_type == "OUTER" {
                if let Some(bus) = weak.upgrade() {
                    bus.emit("INNER", ValueMap::new(), None);
                }
            }
            Ok(())
        });

        bus.emit("OUTER", ValueMap::new(), None);
        assert_eq!(*seen.borrow(), vec!["OUTER", "INNER"]);
    }

    #[test]
    fn test_event_fields() {
        let clock = Rc::new(ManualClock::new(1234.0));
        let bus = EventBus::with_clock(clock);
        let captured = Rc::new(RefCell::new(None));
        let c = Rc::clone(&captured);
        bus.on(move |e| {
            *c.borrow_mut() = Some(e.clone());
            Ok(())
        });

        bus.emit("HP_CHANGED", params! { "entityId" => "hero" }, Some("hero".into()));

        let event = captured.borrow().clone().expect("event delivered");
        assert_eq!(event.timestamp, 1234.0);
        assert_eq!(event.get_entity("entityId"), Some(EntityId::from("hero")));
        assert_eq!(event.target_id, Some(EntityId::from("hero")));
    }
}
