//! Error types for tickflow-logic

use thiserror::Error;

/// Orchestrator error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Flow error: {0}")]
    Flow(#[from] tickflow_flow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
