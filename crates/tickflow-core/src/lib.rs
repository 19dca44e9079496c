//! Tickflow Core - shared model and dispatch machinery for the logic runtime
//!
//! This crate provides:
//! - Dynamic values with permissive coercion (`Value`, `ValueMap`)
//! - Runtime entities and the shared entity store
//! - A synchronous event bus with injectable clock
//! - Named action/condition registries and the `ActionContext` envelope
//! - Declarative rules and the rule engine
//! - Collaborator traits the host implements (`Renderer`, `GameCore`, ...)
//!
//! ## Testing Feature
//!
//! Enable the `testing` feature for in-memory collaborators:
//! ```toml
//! tickflow-core = { version = "0.1", features = ["testing"] }
//! ```

mod context;
mod entity;
mod error;
pub mod event;
mod host;
mod identity;
mod op;
mod registry;
mod rule;
pub mod rule_engine;
mod signal;
pub mod time;
mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{
    ActionContext, CollisionContact, CollisionState, EntityContext, Globals, RuntimeContext,
    SharedEntityContext, SignalState,
};
pub use entity::{Entity, EntityStore, SharedEntities, Variable, VariableKind};
pub use error::{Error, Result};
pub use event::{event_types, EventBus, EventHandler, GameEvent};
pub use host::{GameCore, InputState, Renderer, SceneControl, SpawnRequest};
pub use identity::{EntityId, InstanceId, SubscriptionId};
pub use op::ModifyOp;
pub use registry::{Action, ActionRegistry, Condition, ConditionRegistry, FnAction, FnCondition};
pub use rule::{ConditionLogic, LogicComponent, Rule, RuleAction, RuleCondition};
pub use rule_engine::{evaluate_rule, trigger_matches, RuleEngine};
pub use signal::{SceneState, SignalQueue};
pub use time::{Clock, ManualClock, SystemClock};
pub use value::{ParamExt, Value, ValueMap, Vec2};
