//! Tickflow Script - RON loader
//!
//! Loads scene content and configuration from RON files:
//! - Scene rules
//! - Module graphs, keyed by module id
//! - Entities with their variables and logic components
//! - `LogicConfig`

mod config;
mod error;
mod loader;

pub use config::{load_config_file, load_config_str};
pub use error::{Error, Result};
pub use loader::{Loader, SceneDefs};
