//! Error types for tickflow-flow

use thiserror::Error;

/// Flow interpreter error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Module {module_id} has no Entry node at {entry}")]
    MissingEntry { module_id: String, entry: String },

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Core error: {0}")]
    Core(#[from] tickflow_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
