//! Tickflow Flow - module graph interpreter
//!
//! A module is a small directed graph authored by a designer: an `Entry`
//! node, branches (`Condition`, `Switch`), behavior blocks (`Flow`) and
//! terminal `Stop` nodes, joined by flow edges. Value edges feed data into
//! named input ports.
//!
//! ## Key Components
//!
//! - [`ModuleGraph`]: Immutable graph template (variable defaults aside)
//! - [`ModuleRuntime`]: Owns running instances and steps them once per tick
//! - [`ModuleLibrary`]: Graphs by id, for starting modules by name
//! - [`ModuleHooks`]: Host callbacks (action context, variable change notice)
//!
//! ## Stepping
//!
//! Each update advances every running instance until it finishes, an async
//! block (`Wait`, `MoveTo`, `PlayAnimation`) asks to wait, or the per-tick
//! step bound is reached. Finished instances are reported once as a
//! [`ModuleResult`].

mod error;
mod graph;
mod instance;
mod library;
pub mod resolve;
mod runtime;

pub use error::{Error, Result};
pub use graph::{
    Axis, ConditionKind, ConditionNode, Edge, FlowNode, FlowType, ModuleGraph, ModuleVariable,
    MouseMode, Node, NodeId, NodeKind, Operand, StopResult, SwitchCase, SwitchNode, ValueSource,
};
pub use instance::{
    BlockState, ModuleError, ModuleErrorCode, ModuleInstance, ModuleResult, ModuleStatus, Outcome,
};
pub use library::ModuleLibrary;
pub use resolve::Resolver;
pub use runtime::{BasicHooks, ModuleHooks, ModuleRuntime, RuntimeOptions};
