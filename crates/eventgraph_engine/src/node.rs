// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.
//!
//! A [`NodeType`] is a data-driven operation descriptor: socket templates,
//! configuration fields, a table binding every value output to a producer
//! function, and, for impure types, a guard and an effect body. [`Node`]
//! instances only carry data; the engine interprets them through the
//! descriptor registered under their type ID.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::graph::GraphError;
use crate::socket::{Socket, SocketDirection, SocketId};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Computes the value of one output socket
pub type ProducerFn =
    Arc<dyn Fn(&mut EvaluationContext<'_>) -> Result<Value, NodeError> + Send + Sync>;

/// Side-effect body of an impure node
pub type EffectFn =
    Arc<dyn Fn(&mut EvaluationContext<'_>) -> Result<(), NodeError> + Send + Sync>;

/// Pre-run check of an impure node; `false` vetoes the run
pub type GuardFn =
    Arc<dyn Fn(&mut EvaluationContext<'_>) -> Result<bool, NodeError> + Send + Sync>;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Entry points, branching and loops
    Flow,
    /// Console output, delays, math functions
    Utility,
    /// Constant values
    Literal,
    /// Arithmetic, comparison and logic
    Operator,
    /// Global variables and the cache
    Variable,
    /// Array operations
    Array,
    /// Set operations
    Set,
    /// Map operations
    Map,
    /// String operations
    String,
    /// Type conversions
    Cast,
    /// Host scene access
    Scene,
    /// Custom/user-defined
    Custom,
}

impl NodeCategory {
    /// Label shown in the node palette
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flow => "Flow",
            Self::Utility => "Utility",
            Self::Literal => "Literal",
            Self::Operator => "Operator",
            Self::Variable => "Variable",
            Self::Array => "Array",
            Self::Set => "Set",
            Self::Map => "Map",
            Self::String => "String",
            Self::Cast => "Cast",
            Self::Scene => "Scene",
            Self::Custom => "Custom",
        }
    }
}

/// Whether a node produces values or performs actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Value-producing, re-evaluated on every pull, no exec sockets
    Pure,
    /// Side-effecting, part of the execution chain
    Impure,
}

/// Allowed values of a configuration field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChoices {
    /// Any value
    Free,
    /// One of a fixed list of strings
    Fixed(Vec<String>),
    /// Name of a graph in the workspace
    Graphs,
}

/// A node-local configuration field (operator mode, variable name, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Initial value on new nodes
    pub default: Value,
    /// Allowed values
    pub choices: FieldChoices,
}

impl FieldSpec {
    /// Free-form field
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            choices: FieldChoices::Free,
        }
    }

    /// Enum field; the first choice is the default
    pub fn choice(name: impl Into<String>, choices: &[&str]) -> Self {
        Self {
            name: name.into(),
            default: choices.first().map_or(Value::None, |c| Value::from(*c)),
            choices: FieldChoices::Fixed(choices.iter().map(|c| (*c).to_string()).collect()),
        }
    }

    /// Field selecting a graph of the workspace
    pub fn graph(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Value::None,
            choices: FieldChoices::Graphs,
        }
    }

    /// Check a value against the fixed choices
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.choices {
            FieldChoices::Fixed(choices) => value
                .as_str()
                .is_some_and(|v| choices.iter().any(|c| c == v)),
            FieldChoices::Free | FieldChoices::Graphs => true,
        }
    }
}

/// Node type definition
#[derive(Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Pure or impure
    pub kind: NodeKind,
    /// Input socket templates
    pub inputs: Vec<Socket>,
    /// Output socket templates
    pub outputs: Vec<Socket>,
    /// Configuration fields
    pub fields: Vec<FieldSpec>,
    /// Runs of this type start a control flow from the entry trigger
    pub entry_point: bool,
    /// Execute this impure node before a pure consumer reads its values
    pub refresh_on_pull: bool,
    producers: IndexMap<String, ProducerFn>,
    guard: Option<GuardFn>,
    effect: Option<EffectFn>,
}

impl NodeType {
    fn with_kind(id: &str, name: &str, category: NodeCategory, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            description: String::new(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            fields: Vec::new(),
            entry_point: false,
            refresh_on_pull: false,
            producers: IndexMap::new(),
            guard: None,
            effect: None,
        }
    }

    /// Start a pure node type
    pub fn pure(id: &str, name: &str, category: NodeCategory) -> Self {
        Self::with_kind(id, name, category, NodeKind::Pure)
    }

    /// Start an impure node type
    pub fn impure(id: &str, name: &str, category: NodeCategory) -> Self {
        Self::with_kind(id, name, category, NodeKind::Impure)
    }

    /// Set the description
    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Add an input socket
    pub fn input(mut self, socket: Socket) -> Self {
        self.inputs.push(socket);
        self
    }

    /// Add an output socket
    pub fn output(mut self, socket: Socket) -> Self {
        self.outputs.push(socket);
        self
    }

    /// Add a configuration field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Bind a producer to the output socket named `output`
    pub fn produce<F>(mut self, output: &str, producer: F) -> Self
    where
        F: Fn(&mut EvaluationContext<'_>) -> Result<Value, NodeError> + Send + Sync + 'static,
    {
        self.producers.insert(output.to_string(), Arc::new(producer));
        self
    }

    /// Set the guard hook
    pub fn guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&mut EvaluationContext<'_>) -> Result<bool, NodeError> + Send + Sync + 'static,
    {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Set the effect body
    pub fn effect<F>(mut self, effect: F) -> Self
    where
        F: Fn(&mut EvaluationContext<'_>) -> Result<(), NodeError> + Send + Sync + 'static,
    {
        self.effect = Some(Arc::new(effect));
        self
    }

    /// Mark as an entry point
    pub fn entry_point(mut self) -> Self {
        self.entry_point = true;
        self
    }

    /// Refresh by executing before value reads from pure consumers
    pub fn refresh_on_pull(mut self) -> Self {
        self.refresh_on_pull = true;
        self
    }

    /// Producer bound to an output socket
    pub fn producer(&self, output: &str) -> Option<&ProducerFn> {
        self.producers.get(output)
    }

    /// Guard hook, if any
    pub fn guard_fn(&self) -> Option<&GuardFn> {
        self.guard.as_ref()
    }

    /// Effect body, if any
    pub fn effect_fn(&self) -> Option<&EffectFn> {
        self.effect.as_ref()
    }

    /// Whether nodes of this type take part in the execution chain
    pub fn is_executable(&self) -> bool {
        self.kind == NodeKind::Impure && self.effect.is_some()
    }

    /// Field specification by name
    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let id = || self.id.clone();
        for socket in self.inputs.iter().chain(self.outputs.iter()) {
            if self.kind == NodeKind::Pure && socket.is_exec() {
                return Err(RegistryError::ExecSocketOnPureNode(id(), socket.name.clone()));
            }
        }
        for (direction, sockets) in [
            (SocketDirection::Input, &self.inputs),
            (SocketDirection::Output, &self.outputs),
        ] {
            for (i, socket) in sockets.iter().enumerate() {
                if socket.direction != direction {
                    return Err(RegistryError::WrongDirection(id(), socket.name.clone()));
                }
                if sockets[..i].iter().any(|s| s.name == socket.name) {
                    return Err(RegistryError::DuplicateSocket(id(), socket.name.clone()));
                }
            }
        }
        for socket in self.outputs.iter().filter(|s| !s.is_exec()) {
            if !self.producers.contains_key(&socket.name) {
                return Err(RegistryError::MissingProducer(id(), socket.name.clone()));
            }
        }
        for name in self.producers.keys() {
            let bound = self.outputs.iter().any(|s| !s.is_exec() && &s.name == name);
            if !bound {
                return Err(RegistryError::UnknownProducer(id(), name.clone()));
            }
        }
        match self.kind {
            NodeKind::Impure if self.effect.is_none() => Err(RegistryError::MissingEffect(id())),
            NodeKind::Pure if self.effect.is_some() || self.guard.is_some() => {
                Err(RegistryError::EffectOnPureNode(id()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("kind", &self.kind)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("producers", &self.producers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Node type ID
    pub node_type: String,
    /// Display name (can be customized)
    pub label: String,
    /// Input sockets
    pub inputs: Vec<Socket>,
    /// Output sockets
    pub outputs: Vec<Socket>,
    /// Configuration fields set by the editor
    pub fields: IndexMap<String, Value>,
}

impl Node {
    /// Create a new node from a type definition
    pub fn new(node_type: &NodeType) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.id.clone(),
            label: node_type.name.clone(),
            inputs: node_type.inputs.iter().map(Socket::instantiate).collect(),
            outputs: node_type.outputs.iter().map(Socket::instantiate).collect(),
            fields: node_type
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.default.clone()))
                .collect(),
        }
    }

    /// Get an input socket by name
    pub fn input(&self, name: &str) -> Option<&Socket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    /// Get a mutable input socket by name
    pub fn input_mut(&mut self, name: &str) -> Option<&mut Socket> {
        self.inputs.iter_mut().find(|s| s.name == name)
    }

    /// Get an output socket by name
    pub fn output(&self, name: &str) -> Option<&Socket> {
        self.outputs.iter().find(|s| s.name == name)
    }

    /// Get a socket by ID
    pub fn socket(&self, socket_id: &SocketId) -> Option<&Socket> {
        self.sockets().find(|s| s.id == *socket_id)
    }

    /// Get all sockets
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Read a configuration field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Write an existing configuration field
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> Result<(), GraphError> {
        let slot = self
            .fields
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownField(name.to_string()))?;
        *slot = value.into();
        Ok(())
    }
}

/// Error when registering a node type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// Type ID already registered
    #[error("node type already registered: {0}")]
    Duplicate(String),

    /// A value output has no producer bound to it
    #[error("node type {0}: output '{1}' has no producer")]
    MissingProducer(String, String),

    /// A producer is bound to a socket that is not a value output
    #[error("node type {0}: producer '{1}' does not match a value output")]
    UnknownProducer(String, String),

    /// An impure type has no effect body
    #[error("node type {0}: impure node without an effect")]
    MissingEffect(String),

    /// A pure type declares an effect or guard
    #[error("node type {0}: pure node with an effect or guard")]
    EffectOnPureNode(String),

    /// A pure type declares an exec socket
    #[error("node type {0}: pure node with exec socket '{1}'")]
    ExecSocketOnPureNode(String, String),

    /// Socket declared on the wrong side
    #[error("node type {0}: socket '{1}' has the wrong direction")]
    WrongDirection(String, String),

    /// Two sockets on the same side share a name
    #[error("node type {0}: duplicate socket '{1}'")]
    DuplicateSocket(String, String),
}

/// Registry of available node types
#[derive(Debug)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type after validating its producer table
    pub fn register(&mut self, node_type: NodeType) -> Result<(), RegistryError> {
        if self.types.contains_key(&node_type.id) {
            return Err(RegistryError::Duplicate(node_type.id));
        }
        node_type.validate()?;
        self.types.insert(node_type.id.clone(), node_type);
        Ok(())
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Flat ordered (type ID, category label) list for the palette
    pub fn palette(&self) -> Vec<(&str, &'static str)> {
        self.types
            .values()
            .map(|t| (t.id.as_str(), t.category.label()))
            .collect()
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(Node::new)
    }

    /// Set a field on a node, checking it against the type's choices
    pub fn configure(
        &self,
        node: &mut Node,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let value = value.into();
        let spec = self
            .get(&node.node_type)
            .and_then(|t| t.field_spec(name))
            .ok_or_else(|| GraphError::UnknownField(name.to_string()))?;
        if !spec.accepts(&value) {
            return Err(GraphError::InvalidFieldValue {
                field: name.to_string(),
                value: value.to_string(),
            });
        }
        node.set_field(name, value)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketType;

    fn literal() -> NodeType {
        NodeType::pure("test.literal", "Literal", NodeCategory::Literal)
            .output(Socket::output("value", SocketType::Value))
            .field(FieldSpec::new("value", 0))
            .produce("value", |ctx| Ok(ctx.field("value")))
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = NodeRegistry::new();
        registry.register(literal()).unwrap();

        let a = registry.create_node("test.literal").unwrap();
        let b = registry.create_node("test.literal").unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.outputs[0].id, b.outputs[0].id);
        assert_eq!(a.field("value"), Some(&Value::Int(0)));
        assert!(registry.create_node("missing").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = NodeRegistry::new();
        registry.register(literal()).unwrap();
        assert_eq!(
            registry.register(literal()),
            Err(RegistryError::Duplicate("test.literal".to_string()))
        );
    }

    #[test]
    fn test_missing_producer_rejected() {
        let mut registry = NodeRegistry::new();
        let broken = NodeType::pure("test.broken", "Broken", NodeCategory::Custom)
            .output(Socket::output("result", SocketType::Value))
            .produce("reslt", |_| Ok(Value::None));
        assert!(matches!(
            registry.register(broken),
            Err(RegistryError::MissingProducer(_, name)) if name == "result"
        ));
    }

    #[test]
    fn test_kind_rules() {
        let mut registry = NodeRegistry::new();
        let no_effect = NodeType::impure("test.action", "Action", NodeCategory::Custom)
            .input(Socket::exec_input("exec"));
        assert!(matches!(registry.register(no_effect), Err(RegistryError::MissingEffect(_))));

        let pure_exec = NodeType::pure("test.pure_exec", "Pure", NodeCategory::Custom)
            .input(Socket::exec_input("exec"));
        assert!(matches!(
            registry.register(pure_exec),
            Err(RegistryError::ExecSocketOnPureNode(..))
        ));
    }

    #[test]
    fn test_configure_checks_choices() {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                NodeType::pure("test.op", "Op", NodeCategory::Operator)
                    .field(FieldSpec::choice("operator", &["+", "-"])),
            )
            .unwrap();
        let mut node = registry.create_node("test.op").unwrap();
        assert_eq!(node.field("operator"), Some(&Value::from("+")));
        registry.configure(&mut node, "operator", "-").unwrap();
        assert!(registry.configure(&mut node, "operator", "%").is_err());
        assert!(registry.configure(&mut node, "missing", 1).is_err());
    }

    #[test]
    fn test_palette_order() {
        let mut registry = NodeRegistry::new();
        registry.register(literal()).unwrap();
        registry
            .register(NodeType::pure("test.other", "Other", NodeCategory::Custom))
            .unwrap();
        assert_eq!(
            registry.palette(),
            vec![("test.literal", "Literal"), ("test.other", "Custom")]
        );
    }
}
