//! Loading `LogicConfig` from RON

use crate::error::Result;
use std::fs;
use std::path::Path;
use tickflow_logic::LogicConfig;

/// Parse a config from RON text; omitted fields keep their defaults
pub fn load_config_str(content: &str) -> Result<LogicConfig> {
    let config: LogicConfig = ron::from_str(content)?;
    Ok(config)
}

/// Read and parse a config file
pub fn load_config_file(path: impl AsRef<Path>) -> Result<LogicConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let config = load_config_str(&content)?;
    tracing::debug!(path = %path.display(), "logic config loaded");
    Ok(config)
}
