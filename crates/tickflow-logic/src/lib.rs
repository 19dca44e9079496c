//! Tickflow Logic - the per-tick orchestrator
//!
//! Ties the rule engine, entity logic components and the module runtime
//! together behind one host-facing type.
//!
//! ## Key Components
//!
//! - [`LogicSystem`]: Subscribes to the event bus and runs one update per call
//! - [`LogicConfig`]: Frame threshold, step bound, ground tags and logging
//! - [`FrameState`]: Per-frame dedupe of collisions, components and actions
//!
//! ## Frames
//!
//! Hosts sometimes invoke the update hook more than once per visual frame.
//! Updates closer together than the frame threshold share one logical
//! frame, so update logic and identical action calls run once per frame
//! no matter how often the host calls in.

mod config;
mod error;
mod frame;
mod system;

pub use config::LogicConfig;
pub use error::{Error, Result};
pub use frame::FrameState;
pub use system::{LogicSystem, RunMode, VariableObserver};
