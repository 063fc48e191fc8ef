// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! Two traversals share one [`Engine`]:
//!
//! - **Pull**: a node asking for an input value follows the single link into
//!   that socket back to its producer and calls the producer bound to the
//!   linked output. Pure producers are recomputed on every pull.
//! - **Push**: executing an impure node runs its guard and effect; the
//!   effect fires execution outputs with [`EvaluationContext::trigger`],
//!   which executes every node linked downstream, depth first.
//!
//! Failures are contained at the node boundary. A node whose guard or
//! effect fails is logged and its branch stops; the rest of the run goes on.

use crate::config::{EngineConfig, ExecFanout};
use crate::graph::Graph;
use crate::host::Host;
use crate::instance::InstanceTable;
use crate::node::{Node, NodeId, NodeKind, NodeRegistry};
use crate::scheduler::Scheduler;
use crate::socket::SocketId;
use crate::store::{InstanceId, StoreKey, VariableStore};
use crate::value::{Value, ValueError};
use crate::workspace::Workspace;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Error raised inside a node body
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Value operation failed (type mismatch, division by zero, bad index)
    #[error(transparent)]
    Value(#[from] ValueError),

    /// Input or field value not usable by the node
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Input or field name
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// Host object does not exist
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Workspace has no graph of that name
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node has no socket of that name
    #[error("Socket not found: {0}")]
    SocketNotFound(String),

    /// Too many nested execution hops
    #[error("Execution depth limit of {0} exceeded")]
    ExecDepthExceeded(usize),

    /// Too many nested value pulls
    #[error("Pull depth limit of {0} exceeded")]
    PullDepthExceeded(usize),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl NodeError {
    /// Shorthand for [`NodeError::InvalidArgument`]
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Nodes whose effect completed
    pub executed: usize,
    /// Nodes stopped by their guard
    pub vetoed: usize,
    /// Nodes whose guard or effect failed
    pub failed: usize,
    /// Continuations scheduled
    pub deferred: usize,
}

impl RunSummary {
    /// Whether no node failed
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executed, {} vetoed, {} failed, {} deferred",
            self.executed, self.vetoed, self.failed, self.deferred
        )
    }
}

/// Runs graphs against a variable store and a host
pub struct Engine {
    registry: Arc<NodeRegistry>,
    config: EngineConfig,
    store: VariableStore,
    instances: InstanceTable,
    scheduler: Scheduler,
    host: Box<dyn Host>,
    /// Producers being evaluated, innermost last
    pull_stack: Vec<NodeId>,
    exec_depth: usize,
    summary: RunSummary,
}

impl Engine {
    /// Create an engine
    pub fn new(registry: Arc<NodeRegistry>, config: EngineConfig, host: Box<dyn Host>) -> Self {
        Self {
            registry,
            config,
            store: VariableStore::new(),
            instances: InstanceTable::new(),
            scheduler: Scheduler::new(),
            host,
            pull_stack: Vec::new(),
            exec_depth: 0,
            summary: RunSummary::default(),
        }
    }

    /// Node type registry
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Variable store
    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Mutable variable store
    pub fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.store
    }

    /// Host collaborator
    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// Mutable host collaborator
    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    /// Deferred continuations
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Time until the next continuation is due
    pub fn next_due(&self) -> Option<Duration> {
        self.scheduler.next_due()
    }

    /// Execute one impure node as a top-level run
    pub fn execute(&mut self, workspace: &Workspace, graph: &str, node: NodeId) -> RunSummary {
        self.summary = RunSummary::default();
        match workspace.graph(graph) {
            Some(graph) => self.run_node(workspace, graph, node),
            None => tracing::warn!(graph, "cannot execute: graph not found"),
        }
        std::mem::take(&mut self.summary)
    }

    /// Pull the value of one output socket
    pub fn resolve_output(
        &mut self,
        workspace: &Workspace,
        graph: &str,
        node: NodeId,
        output: &str,
    ) -> Result<Value, NodeError> {
        let graph = workspace
            .graph(graph)
            .ok_or_else(|| NodeError::GraphNotFound(graph.to_string()))?;
        let socket = graph
            .node(node)
            .ok_or(NodeError::NodeNotFound(node))?
            .output(output)
            .ok_or_else(|| NodeError::SocketNotFound(output.to_string()))?;
        Ok(self.produce(workspace, graph, node, socket.id)?.unwrap_or_default())
    }

    /// Advance the clock and fire every continuation now due
    pub fn tick(&mut self, workspace: &Workspace, elapsed: Duration) -> RunSummary {
        self.summary = RunSummary::default();
        for continuation in self.scheduler.advance(elapsed) {
            let Some(graph) = workspace.graph(&continuation.graph) else {
                tracing::warn!(graph = %continuation.graph, "dropping continuation: graph not found");
                self.instances.unpin(continuation.node, continuation.instance, &mut self.store);
                continue;
            };
            let Some(node) = graph.node(continuation.node) else {
                tracing::debug!(node = %continuation.node, "dropping continuation: node removed");
                self.instances.unpin(continuation.node, continuation.instance, &mut self.store);
                continue;
            };
            tracing::debug!(node = %node.label, output = %continuation.output, "resuming");
            self.instances.resume(node.id, continuation.instance);
            self.fire(workspace, graph, node, &continuation.output);
            self.instances.end(node.id, &mut self.store);
            self.instances.unpin(node.id, continuation.instance, &mut self.store);
        }
        std::mem::take(&mut self.summary)
    }

    /// Remove a node from a graph and release everything the engine holds for it
    pub fn remove_node(&mut self, graph: &mut Graph, node: NodeId) -> Option<Node> {
        let removed = graph.remove_node(node)?;
        self.store.release_node(node);
        self.instances.forget(node);
        let cancelled = self.scheduler.cancel_node(node);
        tracing::debug!(node = %removed.label, cancelled, "node removed");
        Some(removed)
    }

    fn run_node(&mut self, workspace: &Workspace, graph: &Graph, node_id: NodeId) {
        let Some(node) = graph.node(node_id) else {
            tracing::warn!(node = %node_id, "cannot execute: node not found");
            return;
        };
        let registry = Arc::clone(&self.registry);
        let Some(node_type) = registry.get(&node.node_type) else {
            tracing::warn!(node = %node.label, node_type = %node.node_type, "unknown node type");
            return;
        };
        let Some(effect) = node_type.effect_fn().filter(|_| node_type.is_executable()) else {
            tracing::debug!(node = %node.label, "not executable, skipped");
            return;
        };
        if self.exec_depth >= self.config.max_exec_depth {
            let err = NodeError::ExecDepthExceeded(self.config.max_exec_depth);
            tracing::error!(node = %node.label, "{err}");
            self.summary.failed += 1;
            return;
        }

        let instance = self.instances.begin(node_id, &mut self.store);
        self.exec_depth += 1;
        tracing::trace!(node = %node.label, %instance, "execute");

        let mut ctx = EvaluationContext {
            engine: self,
            workspace,
            graph,
            node,
            instance,
        };
        let outcome = match node_type.guard_fn() {
            Some(guard) => guard(&mut ctx),
            None => Ok(true),
        }
        .and_then(|allowed| {
            if allowed {
                effect(&mut ctx).map(|()| true)
            } else {
                Ok(false)
            }
        });

        match outcome {
            Ok(true) => self.summary.executed += 1,
            Ok(false) => {
                tracing::warn!(node = %node.label, "guard vetoed execution");
                self.summary.vetoed += 1;
            }
            Err(err) => {
                tracing::error!(node = %node.label, node_type = %node.node_type, "{err}");
                self.summary.failed += 1;
            }
        }

        self.exec_depth -= 1;
        self.instances.end(node_id, &mut self.store);
    }

    /// Execute the nodes linked to an execution output
    fn fire(&mut self, workspace: &Workspace, graph: &Graph, node: &Node, output: &str) {
        let Some(socket) = node.output(output) else {
            tracing::warn!(node = %node.label, output, "no such execution output");
            return;
        };
        if !socket.is_exec() {
            tracing::warn!(node = %node.label, output, "not an execution output");
            return;
        }

        let mut targets: Vec<NodeId> = graph
            .links_from(socket.id)
            .filter(|link| {
                graph
                    .link_sockets(link)
                    .is_some_and(|(_, to)| to.is_exec())
            })
            .map(|link| link.to_node)
            .collect();
        if self.config.exec_fanout == ExecFanout::FirstLink {
            targets.truncate(1);
        }

        for target in targets {
            self.run_node(workspace, graph, target);
        }
    }

    /// Value of an input socket: the linked producer's value or the socket default
    fn pull(
        &mut self,
        workspace: &Workspace,
        graph: &Graph,
        node: &Node,
        input: &str,
    ) -> Result<Value, NodeError> {
        let Some(socket) = node.input(input) else {
            tracing::warn!(node = %node.label, input, "no such input");
            return Ok(Value::None);
        };
        if socket.is_exec() {
            return Ok(Value::None);
        }
        let source = graph
            .links_to(socket.id)
            .next()
            .map(|link| (link.from_node, link.from_socket));
        match source {
            Some((producer, output)) => Ok(self
                .produce(workspace, graph, producer, output)?
                .unwrap_or_default()),
            None => Ok(socket.default_value.clone()),
        }
    }

    /// Values of every link into a fan-in socket, in link order
    fn pull_all(
        &mut self,
        workspace: &Workspace,
        graph: &Graph,
        node: &Node,
        input: &str,
    ) -> Result<Vec<Value>, NodeError> {
        let Some(socket) = node.input(input) else {
            tracing::warn!(node = %node.label, input, "no such input");
            return Ok(Vec::new());
        };
        let sources: Vec<(NodeId, SocketId)> = graph
            .links_to(socket.id)
            .map(|link| (link.from_node, link.from_socket))
            .collect();

        let mut values = Vec::with_capacity(sources.len());
        for (producer, output) in sources {
            if let Some(value) = self.produce(workspace, graph, producer, output)? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Call the producer bound to an output; `None` when it cannot be resolved
    fn produce(
        &mut self,
        workspace: &Workspace,
        graph: &Graph,
        producer: NodeId,
        output: SocketId,
    ) -> Result<Option<Value>, NodeError> {
        let Some(node) = graph.node(producer) else {
            tracing::debug!(node = %producer, "unresolved producer");
            return Ok(None);
        };
        let Some(socket) = node.socket(&output) else {
            tracing::debug!(node = %node.label, "unresolved output socket");
            return Ok(None);
        };
        let registry = Arc::clone(&self.registry);
        let Some(node_type) = registry.get(&node.node_type) else {
            tracing::warn!(node = %node.label, node_type = %node.node_type, "unknown node type");
            return Ok(None);
        };
        let Some(producer_fn) = node_type.producer(&socket.name) else {
            tracing::debug!(node = %node.label, output = %socket.name, "no producer bound");
            return Ok(None);
        };

        if self.pull_stack.contains(&producer) {
            tracing::warn!(node = %node.label, output = %socket.name, "data cycle, value unresolved");
            return Ok(None);
        }
        if self.pull_stack.len() >= self.config.max_pull_depth {
            return Err(NodeError::PullDepthExceeded(self.config.max_pull_depth));
        }

        if node_type.kind == NodeKind::Impure
            && node_type.refresh_on_pull
            && !self.instances.is_running(producer)
        {
            tracing::trace!(node = %node.label, "refresh before read");
            self.run_node(workspace, graph, producer);
        }

        self.pull_stack.push(producer);
        let instance = self.instances.current(producer);
        let mut ctx = EvaluationContext {
            engine: self,
            workspace,
            graph,
            node,
            instance,
        };
        let result = producer_fn(&mut ctx);
        self.pull_stack.pop();
        result.map(Some)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.registry.len())
            .field("config", &self.config)
            .field("store", &self.store.len())
            .field("pending", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}

/// What a node body sees while it runs
pub struct EvaluationContext<'a> {
    engine: &'a mut Engine,
    workspace: &'a Workspace,
    graph: &'a Graph,
    node: &'a Node,
    instance: InstanceId,
}

impl<'a> EvaluationContext<'a> {
    /// The node being evaluated
    pub fn node(&self) -> &Node {
        self.node
    }

    /// Graph holding the node
    pub fn graph(&self) -> &Graph {
        self.graph
    }

    /// Workspace holding the graph
    pub fn workspace(&self) -> &Workspace {
        self.workspace
    }

    /// Run identifier scratch entries are keyed under
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.engine.config
    }

    /// Configuration field, `None` when unset
    pub fn field(&self, name: &str) -> Value {
        self.node.field(name).cloned().unwrap_or_default()
    }

    /// Configuration field rendered as text
    pub fn field_str(&self, name: &str) -> String {
        match self.node.field(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::None) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Resolve an input socket
    pub fn input(&mut self, name: &str) -> Result<Value, NodeError> {
        self.engine.pull(self.workspace, self.graph, self.node, name)
    }

    /// Resolve every link into a fan-in socket
    pub fn inputs(&mut self, name: &str) -> Result<Vec<Value>, NodeError> {
        self.engine.pull_all(self.workspace, self.graph, self.node, name)
    }

    /// Resolve an input as an integer
    pub fn input_int(&mut self, name: &str) -> Result<i64, NodeError> {
        Ok(self.input(name)?.to_int()?)
    }

    /// Resolve an input as a float
    pub fn input_float(&mut self, name: &str) -> Result<f64, NodeError> {
        Ok(self.input(name)?.to_float()?)
    }

    /// Resolve an input as a boolean, by truthiness
    pub fn input_bool(&mut self, name: &str) -> Result<bool, NodeError> {
        Ok(self.input(name)?.truthy())
    }

    /// Resolve an input as text; strings verbatim, other values rendered
    pub fn input_string(&mut self, name: &str) -> Result<String, NodeError> {
        Ok(match self.input(name)? {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Resolve an input as a list of items
    pub fn input_items(&mut self, name: &str) -> Result<Vec<Value>, NodeError> {
        Ok(self.input(name)?.into_items()?)
    }

    /// Resolve an input naming a host object; an unset input is an error
    pub fn input_object(&mut self, name: &str) -> Result<String, NodeError> {
        match self.input(name)? {
            Value::Object(object) | Value::String(object) if !object.is_empty() => Ok(object),
            Value::None => Err(NodeError::invalid(name, "no object given")),
            other => Err(NodeError::invalid(
                name,
                format!("expected an object, got {}", other.type_name()),
            )),
        }
    }

    /// Fire an execution output
    pub fn trigger(&mut self, output: &str) {
        self.engine.fire(self.workspace, self.graph, self.node, output);
    }

    /// Fire an execution output after `delay` as a fresh top-level run
    pub fn defer(&mut self, delay: Duration, output: &str) {
        tracing::debug!(node = %self.node.label, output, ?delay, "deferred");
        self.engine
            .scheduler
            .schedule(&self.graph.name, self.node.id, self.instance, output, delay);
        self.engine.instances.pin(self.node.id, self.instance);
        self.engine.summary.deferred += 1;
    }

    /// Execute the entry nodes of another graph in the workspace
    pub fn execute_graph(&mut self, name: &str) -> Result<(), NodeError> {
        let graph = self
            .workspace
            .graph(name)
            .ok_or_else(|| NodeError::GraphNotFound(name.to_string()))?;
        let registry = Arc::clone(&self.engine.registry);
        let entries: Vec<NodeId> = graph.entry_nodes(&registry).map(|n| n.id).collect();
        for entry in entries {
            self.engine.run_node(self.workspace, graph, entry);
        }
        Ok(())
    }

    /// Per-run scratch value of this node
    pub fn scratch(&self, field: &str) -> Value {
        self.engine
            .store
            .get(&StoreKey::scratch(self.node.id, self.instance, field))
    }

    /// Write a per-run scratch value of this node
    pub fn set_scratch(&mut self, field: &str, value: impl Into<Value>) {
        self.engine
            .store
            .set(StoreKey::scratch(self.node.id, self.instance, field), value.into());
    }

    /// Remove a per-run scratch value of this node
    pub fn remove_scratch(&mut self, field: &str) -> Option<Value> {
        self.engine
            .store
            .remove(&StoreKey::scratch(self.node.id, self.instance, field))
    }

    /// Variable store
    pub fn store(&self) -> &VariableStore {
        &self.engine.store
    }

    /// Mutable variable store
    pub fn store_mut(&mut self) -> &mut VariableStore {
        &mut self.engine.store
    }

    /// Host collaborator
    pub fn host(&mut self) -> &mut dyn Host {
        self.engine.host.as_mut()
    }
}
