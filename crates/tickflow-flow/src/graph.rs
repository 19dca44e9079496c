//! Module graph templates
//!
//! A module is a directed graph of nodes joined by flow edges (control
//! transfer) and value edges (data feeds into a node's named input port).
//! Graphs are shared between instances; only their variable defaults may
//! change after loading.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;
use tickflow_core::{Value, ValueMap};

/// Node identifier within a graph
pub type NodeId = String;

/// Outcome declared by a `Stop` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StopResult {
    #[default]
    Success,
    Failed,
}

/// Whether a flow block completes inline or may span ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlowType {
    #[default]
    Instant,
    Async,
}

/// One side of a comparison when no value edge feeds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Look up a variable by name
    Variable(String),
    /// Use a fixed value
    Literal(Value),
}

/// Test performed by a `Condition` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionKind {
    #[serde(alias = "IfVariableEquals")]
    Equals,
    NotEquals,
    #[serde(alias = "IfVariableGreaterThan")]
    GreaterThan,
    #[serde(alias = "IfVariableLessThan")]
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    /// True when the left operand differs from its previous reading
    #[serde(alias = "IfVariableChanged")]
    Changed,
    /// Key currently held
    InputKey { key: String },
    /// Touching something with this collision tag
    CompareTag { tag: String },
    /// Entity signal raised (and equal to the right operand, if any)
    SignalKey { key: String },
    IsGrounded,
    IsAlive,
    DistanceLessThan { target_id: String, distance: f64 },
    DistanceGreaterThan { target_id: String, distance: f64 },
}

/// Operands and test of a `Condition` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(default)]
    pub left: Option<Operand>,
    #[serde(default)]
    pub right: Option<Operand>,
    pub condition: ConditionKind,
}

/// A `Switch` case: when the switched value matches `value`, leave through port `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub value: Value,
    pub id: String,
}

/// Multi-way branch on a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchNode {
    pub variable_name: String,
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
}

/// A behavior block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    #[serde(default)]
    pub flow_type: FlowType,
    pub block_type: String,
    #[serde(default)]
    pub params: ValueMap,
}

impl FlowNode {
    /// Effective flow type (`Wait` is always async)
    pub fn effective_type(&self) -> FlowType {
        if self.block_type == "Wait" {
            FlowType::Async
        } else {
            self.flow_type
        }
    }
}

/// Pointer coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MouseMode {
    /// World coordinates
    #[default]
    Absolute,
    /// Relative to the entity's position
    Relative,
    /// Screen coordinates
    Screen,
}

/// Single pointer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

fn self_target() -> String {
    "self".to_string()
}

/// Where a `Value` node reads its value from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueSource {
    Literal(Value),
    Variable {
        name: String,
    },
    Property {
        #[serde(default = "self_target")]
        target_id: String,
        property: String,
    },
    Mouse {
        #[serde(default)]
        axis: Option<Axis>,
        #[serde(default)]
        mode: MouseMode,
    },
}

/// Node kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Entry,
    Merge,
    Stop {
        #[serde(default)]
        result: StopResult,
        #[serde(default)]
        error_code: Option<String>,
    },
    Condition(ConditionNode),
    Switch(SwitchNode),
    Flow(FlowNode),
    Value(ValueSource),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Entry => "Entry",
            NodeKind::Merge => "Merge",
            NodeKind::Stop { .. } => "Stop",
            NodeKind::Condition(_) => "Condition",
            NodeKind::Switch(_) => "Switch",
            NodeKind::Flow(_) => "Flow",
            NodeKind::Value(_) => "Value",
        }
    }
}

/// A graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self { id: id.into(), kind }
    }
}

fn default_in_port() -> String {
    "in".to_string()
}

/// A graph edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edge {
    /// Control transfer from an output port
    Flow {
        from_node_id: NodeId,
        from_port: String,
        to_node_id: NodeId,
        #[serde(default = "default_in_port")]
        to_port: String,
    },
    /// Data feed from a `Value` node into an input port
    Value {
        from_node_id: NodeId,
        to_node_id: NodeId,
        to_port: String,
    },
}

impl Edge {
    /// Flow edge into the target's `in` port
    pub fn flow(from: impl Into<NodeId>, port: impl Into<String>, to: impl Into<NodeId>) -> Self {
        Edge::Flow {
            from_node_id: from.into(),
            from_port: port.into(),
            to_node_id: to.into(),
            to_port: default_in_port(),
        }
    }

    /// Value edge into a named input port
    pub fn value(from: impl Into<NodeId>, to: impl Into<NodeId>, port: impl Into<String>) -> Self {
        Edge::Value {
            from_node_id: from.into(),
            to_node_id: to.into(),
            to_port: port.into(),
        }
    }
}

/// Declared module variable and its default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleVariable {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// A module template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleGraph {
    pub id: String,
    pub entry_node_id: NodeId,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Defaults; updated when a running instance writes a module variable
    #[serde(default)]
    pub variables: RefCell<Vec<ModuleVariable>>,
}

impl ModuleGraph {
    /// Create a graph with the given entry node id
    pub fn new(id: impl Into<String>, entry_node_id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            entry_node_id: entry_node_id.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            variables: RefCell::new(Vec::new()),
        }
    }

    /// Builder: add a node
    pub fn node(mut self, id: impl Into<NodeId>, kind: NodeKind) -> Self {
        self.nodes.push(Node::new(id, kind));
        self
    }

    /// Builder: add an edge
    pub fn edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Builder: declare a module variable
    pub fn variable(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.borrow_mut().push(ModuleVariable {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Find a node by id
    pub fn find(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The entry node, if it exists and is of kind `Entry`
    pub fn entry(&self) -> Option<&Node> {
        self.find(&self.entry_node_id)
            .filter(|n| matches!(n.kind, NodeKind::Entry))
    }

    /// Target of the flow edge leaving `node_id` through `port`
    pub fn next(&self, node_id: &str, port: &str) -> Option<&str> {
        self.edges.iter().find_map(|e| match e {
            Edge::Flow {
                from_node_id,
                from_port,
                to_node_id,
                ..
            } if from_node_id == node_id && from_port == port => Some(to_node_id.as_str()),
            _ => None,
        })
    }

    /// `Value` node feeding `node_id`'s input `port`
    pub fn value_input(&self, node_id: &str, port: &str) -> Option<&ValueSource> {
        let from = self.edges.iter().find_map(|e| match e {
            Edge::Value {
                from_node_id,
                to_node_id,
                to_port,
            } if to_node_id == node_id && to_port == port => Some(from_node_id.as_str()),
            _ => None,
        })?;
        match &self.find(from)?.kind {
            NodeKind::Value(source) => Some(source),
            _ => None,
        }
    }

    /// Whether a flow-edge cycle is reachable from the entry node
    pub fn has_cycle(&self) -> bool {
        let known: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();
        self.visit(&self.entry_node_id, &known, &mut visiting, &mut visited)
    }

    fn visit<'a>(
        &'a self,
        node_id: &'a str,
        known: &HashSet<&'a str>,
        visiting: &mut HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
    ) -> bool {
        if !known.contains(node_id) || visited.contains(node_id) {
            return false;
        }
        if !visiting.insert(node_id) {
            return true;
        }
        for edge in &self.edges {
            if let Edge::Flow {
                from_node_id,
                to_node_id,
                ..
            } = edge
            {
                if from_node_id == node_id && self.visit(to_node_id, known, visiting, visited) {
                    return true;
                }
            }
        }
        visiting.remove(node_id);
        visited.insert(node_id);
        false
    }

    /// Current variable defaults
    pub fn default_variables(&self) -> ValueMap {
        self.variables
            .borrow()
            .iter()
            .map(|v| (v.name.clone(), v.value.clone()))
            .collect()
    }

    /// Update a declared default; returns false if the variable is not declared
    pub fn set_default(&self, name: &str, value: Value) -> bool {
        match self.variables.borrow_mut().iter_mut().find(|v| v.name == name) {
            Some(var) => {
                var.value = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait(seconds: f64) -> NodeKind {
        NodeKind::Flow(FlowNode {
            flow_type: FlowType::Instant,
            block_type: "Wait".into(),
            params: tickflow_core::params! { "seconds" => seconds },
        })
    }

    #[test]
    fn test_detects_reachable_cycle() {
        let graph = ModuleGraph::new("loop", "entry")
            .node("entry", NodeKind::Entry)
            .node("a", NodeKind::Merge)
            .node("b", NodeKind::Merge)
            .edge(Edge::flow("entry", "out", "a"))
            .edge(Edge::flow("a", "out", "b"))
            .edge(Edge::flow("b", "out", "a"));
        assert!(graph.has_cycle());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let graph = ModuleGraph::new("diamond", "entry")
            .node("entry", NodeKind::Entry)
            .node("a", NodeKind::Merge)
            .node("b", NodeKind::Merge)
            .node("end", NodeKind::Merge)
            .edge(Edge::flow("entry", "out", "a"))
            .edge(Edge::flow("entry", "alt", "b"))
            .edge(Edge::flow("a", "out", "end"))
            .edge(Edge::flow("b", "out", "end"));
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_unreachable_cycle_ignored() {
        let graph = ModuleGraph::new("m", "entry")
            .node("entry", NodeKind::Entry)
            .node("x", NodeKind::Merge)
            .node("y", NodeKind::Merge)
            .edge(Edge::flow("x", "out", "y"))
            .edge(Edge::flow("y", "out", "x"));
        assert!(!graph.has_cycle());
    }

    #[test]
    fn test_wait_is_always_async() {
        match wait(1.0) {
            NodeKind::Flow(flow) => assert_eq!(flow.effective_type(), FlowType::Async),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_value_input_lookup() {
        let graph = ModuleGraph::new("m", "entry")
            .node("entry", NodeKind::Entry)
            .node("v", NodeKind::Value(ValueSource::Literal(Value::Int(3))))
            .node("w", wait(1.0))
            .edge(Edge::value("v", "w", "seconds"));

        assert_eq!(
            graph.value_input("w", "seconds"),
            Some(&ValueSource::Literal(Value::Int(3)))
        );
        assert_eq!(graph.value_input("w", "duration"), None);
        assert!(graph.entry().is_some());
    }

    #[test]
    fn test_graph_from_ron() {
        let text = r#"(
            id: "patrol",
            entry_node_id: "entry",
            nodes: [
                (id: "entry", kind: Entry),
                (id: "check", kind: Condition((
                    left: Some(Variable("hp")),
                    right: Some(Literal(Int(0))),
                    condition: IfVariableGreaterThan,
                ))),
                (id: "done", kind: Stop(result: Failed, error_code: Some("Dead"))),
            ],
            edges: [
                Flow(from_node_id: "entry", from_port: "out", to_node_id: "check"),
                Flow(from_node_id: "check", from_port: "false", to_node_id: "done"),
            ],
            variables: [(name: "hp", value: Int(10))],
        )"#;
        let graph: ModuleGraph = ron::from_str(text).expect("graph parses");
        assert_eq!(graph.next("check", "false"), Some("done"));
        assert_eq!(graph.default_variables().get("hp"), Some(&Value::Int(10)));
        assert!(graph.set_default("hp", Value::Int(5)));
        assert!(!graph.set_default("mp", Value::Int(5)));
    }
}
