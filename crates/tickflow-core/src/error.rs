//! Error types for tickflow-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Missing parameter: {0}")]
    MissingParam(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("Collaborator unavailable: {0}")]
    Unavailable(&'static str),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Condition failed: {0}")]
    ConditionFailed(String),

    #[error("Event handler failed: {0}")]
    HandlerFailed(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
