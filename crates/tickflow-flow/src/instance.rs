//! Running module instances and their results

use crate::{ModuleGraph, NodeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tickflow_core::{EntityId, InstanceId, Value, ValueMap};

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Running,
    Success,
    Failed,
}

impl ModuleStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ModuleStatus::Running)
    }
}

/// Why an instance failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleErrorCode {
    /// The flow graph loops back on itself
    CycleDetected,
    /// The cursor points at a node that does not exist
    NodeNotFound,
    /// The cursor reached a node that cannot be executed
    InvalidNode,
    /// An async block reported failure
    FlowFailed,
    /// A `Stop` node with a failed result
    Designer(String),
}

impl ModuleErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ModuleErrorCode::CycleDetected => "CycleDetected",
            ModuleErrorCode::NodeNotFound => "NodeNotFound",
            ModuleErrorCode::InvalidNode => "InvalidNode",
            ModuleErrorCode::FlowFailed => "FlowFailed",
            ModuleErrorCode::Designer(code) => code,
        }
    }
}

impl fmt::Display for ModuleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure record of an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleError {
    pub code: ModuleErrorCode,
    pub node_id: NodeId,
}

/// Terminal outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(ModuleError),
}

/// Reported once when an instance terminates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResult {
    pub instance: InstanceId,
    pub entity_id: EntityId,
    pub module_id: String,
    pub outcome: Outcome,
}

impl ModuleResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success)
    }

    pub fn error(&self) -> Option<&ModuleError> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            Outcome::Success => None,
        }
    }
}

/// Private state of a suspended async block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockState {
    /// Timer armed by `Wait`
    Wait { remaining: f64, resolved: bool },
    /// Start time of `PlayAnimation`, in clock milliseconds
    Animation { started_at_ms: f64 },
}

/// A cursor walking one module graph for one entity
#[derive(Debug)]
pub struct ModuleInstance {
    pub id: InstanceId,
    pub entity_id: EntityId,
    pub module_id: String,
    pub graph: Rc<ModuleGraph>,
    pub cursor: NodeId,
    pub status: ModuleStatus,
    pub error: Option<ModuleError>,
    pub node_state: HashMap<NodeId, BlockState>,
    /// Last readings for change-detection conditions
    pub value_snapshots: HashMap<String, Value>,
    /// Module-local variables, shared with actions as their scope
    pub variables: Rc<RefCell<ValueMap>>,
}

impl ModuleInstance {
    pub(crate) fn new(
        id: InstanceId,
        entity_id: EntityId,
        graph: Rc<ModuleGraph>,
        variables: ValueMap,
    ) -> Self {
        Self {
            id,
            entity_id,
            module_id: graph.id.clone(),
            cursor: graph.entry_node_id.clone(),
            graph,
            status: ModuleStatus::Running,
            error: None,
            node_state: HashMap::new(),
            value_snapshots: HashMap::new(),
            variables: Rc::new(RefCell::new(variables)),
        }
    }

    /// Mark as failed
    pub(crate) fn fail(&mut self, code: ModuleErrorCode, node_id: &str) -> ModuleResult {
        tracing::error!(
            module = %self.module_id,
            entity = %self.entity_id,
            node = %node_id,
            code = %code,
            "module failed"
        );
        let error = ModuleError {
            code,
            node_id: node_id.to_string(),
        };
        self.status = ModuleStatus::Failed;
        self.error = Some(error.clone());
        self.result(Outcome::Failed(error))
    }

    /// Mark as succeeded
    pub(crate) fn succeed(&mut self) -> ModuleResult {
        self.status = ModuleStatus::Success;
        self.result(Outcome::Success)
    }

    /// Result for an instance that is already terminal
    pub(crate) fn terminal_result(&self) -> Option<ModuleResult> {
        match self.status {
            ModuleStatus::Running => None,
            ModuleStatus::Success => Some(self.result(Outcome::Success)),
            ModuleStatus::Failed => {
                let error = self.error.clone().unwrap_or(ModuleError {
                    code: ModuleErrorCode::Designer("Failed".into()),
                    node_id: self.cursor.clone(),
                });
                Some(self.result(Outcome::Failed(error)))
            }
        }
    }

    fn result(&self, outcome: Outcome) -> ModuleResult {
        ModuleResult {
            instance: self.id,
            entity_id: self.entity_id.clone(),
            module_id: self.module_id.clone(),
            outcome,
        }
    }

    /// Read a module variable
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables.borrow().get(name).cloned()
    }

    /// Whether the module declares (or was given) a variable
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.borrow().contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_results() {
        let graph = Rc::new(ModuleGraph::new("m", "entry"));
        let mut inst = ModuleInstance::new(InstanceId::new(1), "hero".into(), graph, ValueMap::new());
        assert!(inst.terminal_result().is_none());

        let result = inst.fail(ModuleErrorCode::Designer("OutOfAmmo".into()), "stop");
        assert_eq!(result.error().map(|e| e.code.as_str()), Some("OutOfAmmo"));
        assert_eq!(inst.terminal_result(), Some(result));
        assert!(inst.status.is_terminal());
    }

    #[test]
    fn test_error_code_names() {
        assert_eq!(ModuleErrorCode::CycleDetected.to_string(), "CycleDetected");
        assert_eq!(ModuleErrorCode::FlowFailed.as_str(), "FlowFailed");
    }
}
