// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and links.

use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId, NodeRegistry};
use crate::socket::{Socket, SocketDirection, SocketId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Links between nodes, in declaration order
    links: IndexMap<LinkId, Link>,
    /// Node selected in the editor
    active_node: Option<NodeId>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            active_node: None,
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and its links.
    ///
    /// Callers running graphs should go through `Engine::remove_node`, which
    /// also releases the node's scratch entries.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.links.retain(|_, l| !l.involves_node(node_id));
        if self.active_node == Some(node_id) {
            self.active_node = None;
        }
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Select the node the entry trigger acts on
    pub fn set_active_node(&mut self, node_id: Option<NodeId>) {
        self.active_node = node_id.filter(|id| self.nodes.contains_key(id));
    }

    /// Currently selected node
    pub fn active_node(&self) -> Option<NodeId> {
        self.active_node
    }

    /// Nodes whose type is registered as an entry point
    pub fn entry_nodes<'a>(
        &'a self,
        registry: &'a NodeRegistry,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .values()
            .filter(move |n| registry.get(&n.node_type).is_some_and(|t| t.entry_point))
    }

    /// Add a link between sockets.
    ///
    /// Only structural rules are checked here; type tags are checked by
    /// [`Graph::prune_mismatched_links`] so an editor can draw a link before
    /// validation runs.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_socket: SocketId,
        to_node: NodeId,
        to_socket: SocketId,
    ) -> Result<LinkId, GraphError> {
        let source_node = self.nodes.get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?;

        let source_socket = source_node.socket(&from_socket)
            .ok_or(GraphError::SocketNotFound(from_socket))?;
        let target_socket = target_node.socket(&to_socket)
            .ok_or(GraphError::SocketNotFound(to_socket))?;

        if source_socket.direction != SocketDirection::Output
            || !source_socket.can_connect(target_socket)
        {
            return Err(GraphError::WrongDirection);
        }

        if from_node == to_node {
            return Err(GraphError::SelfLoop);
        }

        if self.links_to(to_socket).count() >= target_socket.link_limit {
            return Err(GraphError::LinkLimitReached(target_socket.name.clone()));
        }
        if self.links_from(from_socket).count() >= source_socket.link_limit {
            return Err(GraphError::LinkLimitReached(source_socket.name.clone()));
        }

        let link = Link::new(from_node, from_socket, to_node, to_socket);
        let id = link.id;
        self.links.insert(id, link);
        Ok(id)
    }

    /// Add a link between sockets addressed by name
    pub fn link(
        &mut self,
        from_node: NodeId,
        output: &str,
        to_node: NodeId,
        input: &str,
    ) -> Result<LinkId, GraphError> {
        let from_socket = self.output_socket(from_node, output)?.id;
        let to_socket = self.input_socket(to_node, input)?.id;
        self.connect(from_node, from_socket, to_node, to_socket)
    }

    fn output_socket(&self, node_id: NodeId, name: &str) -> Result<&Socket, GraphError> {
        self.node(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?
            .output(name)
            .ok_or_else(|| GraphError::SocketNameNotFound(name.to_string()))
    }

    fn input_socket(&self, node_id: NodeId, name: &str) -> Result<&Socket, GraphError> {
        self.node(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?
            .input(name)
            .ok_or_else(|| GraphError::SocketNameNotFound(name.to_string()))
    }

    /// Remove a link
    pub fn disconnect(&mut self, link_id: LinkId) -> Option<Link> {
        self.links.shift_remove(&link_id)
    }

    /// Get a link by ID
    pub fn get_link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get links from a specific socket, in declaration order
    pub fn links_from(&self, socket_id: SocketId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.from_socket == socket_id)
    }

    /// Get links to a specific socket, in declaration order
    pub fn links_to(&self, socket_id: SocketId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.to_socket == socket_id)
    }

    /// Whether any link is attached to a socket
    pub fn is_linked(&self, socket_id: SocketId) -> bool {
        self.links.values().any(|l| l.involves_socket(socket_id))
    }

    /// Get links involving a node
    pub fn links_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.involves_node(node_id))
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Source and target sockets of a link
    pub fn link_sockets(&self, link: &Link) -> Option<(&Socket, &Socket)> {
        let from = self.node(link.from_node)?.socket(&link.from_socket)?;
        let to = self.node(link.to_node)?.socket(&link.to_socket)?;
        Some((from, to))
    }

    /// Remove every link whose source and target type tags differ.
    ///
    /// Links pointing at sockets that no longer exist are dropped as well.
    pub fn prune_mismatched_links(&mut self) -> Vec<Link> {
        let stale: Vec<LinkId> = self
            .links
            .values()
            .filter(|link| match self.link_sockets(link) {
                Some((from, to)) => !from.socket_type().can_connect_to(&to.socket_type()),
                None => true,
            })
            .map(|link| link.id)
            .collect();

        let removed: Vec<Link> = stale
            .into_iter()
            .filter_map(|id| self.links.shift_remove(&id))
            .collect();
        for link in &removed {
            tracing::debug!(graph = %self.name, link = ?link.id, "pruned mismatched link");
        }
        removed
    }

    /// Nodes in data-dependency order, considering value links only.
    ///
    /// Execution links may form loops; value links may not.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();

        for node_id in self.nodes.keys() {
            if !visited.contains(node_id) {
                self.visit(*node_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    /// Check that value links form no cycle
    pub fn check_data_acyclic(&self) -> Result<(), CycleError> {
        self.topological_order().map(|_| ())
    }

    fn visit(
        &self,
        node_id: NodeId,
        visited: &mut HashSet<NodeId>,
        temp_mark: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&node_id) {
            return Err(CycleError(node_id));
        }
        if visited.contains(&node_id) {
            return Ok(());
        }

        temp_mark.insert(node_id);

        // Visit every producer feeding a value input of this node
        for link in self.links.values().filter(|l| l.to_node == node_id) {
            let is_value = self
                .link_sockets(link)
                .is_some_and(|(from, _)| !from.is_exec());
            if is_value {
                self.visit(link.from_node, visited, temp_mark, order)?;
            }
        }

        temp_mark.remove(&node_id);
        visited.insert(node_id);
        order.push(node_id);

        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when editing a graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Socket not found
    #[error("Socket not found: {0:?}")]
    SocketNotFound(SocketId),

    /// Socket not found by name
    #[error("Socket not found: {0}")]
    SocketNameNotFound(String),

    /// Link must go from an output to an input
    #[error("Links must go from an output to an input")]
    WrongDirection,

    /// Socket already holds its maximum number of links
    #[error("Socket link limit reached: {0}")]
    LinkLimitReached(String),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Configuration field does not exist
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Value is not one of the field's choices
    #[error("Invalid value '{value}' for field {field}")]
    InvalidFieldValue {
        /// Field name
        field: String,
        /// Rejected value
        value: String,
    },
}

/// Error when the value links of a graph contain a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Graph contains a data cycle through node {0}")]
pub struct CycleError(pub NodeId);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeCategory, NodeType};
    use crate::socket::SocketType;
    use crate::value::Value;

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry
            .register(
                NodeType::pure("test.array", "Array", NodeCategory::Array)
                    .output(Socket::output("array", SocketType::Array))
                    .produce("array", |_| Ok(Value::Array(Vec::new()))),
            )
            .unwrap();
        registry
            .register(
                NodeType::pure("test.pass", "Pass", NodeCategory::Custom)
                    .input(Socket::input("value", SocketType::Value))
                    .input(Socket::fan_in("items", SocketType::Value, 3))
                    .output(Socket::output("value", SocketType::Value))
                    .produce("value", |ctx| ctx.input("value")),
            )
            .unwrap();
        registry
            .register(
                NodeType::impure("test.step", "Step", NodeCategory::Custom)
                    .input(Socket::exec_input("exec"))
                    .output(Socket::exec_output("exec"))
                    .effect(|ctx| {
                        ctx.trigger("exec");
                        Ok(())
                    }),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_link_by_name() {
        let registry = registry();
        let mut graph = Graph::new("test");
        let a = graph.add_node(registry.create_node("test.pass").unwrap());
        let b = graph.add_node(registry.create_node("test.pass").unwrap());

        let link = graph.link(a, "value", b, "value").unwrap();
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.get_link(link).unwrap().to_node, b);
        assert!(matches!(
            graph.link(a, "nope", b, "value"),
            Err(GraphError::SocketNameNotFound(_))
        ));
    }

    #[test]
    fn test_link_limit() {
        let registry = registry();
        let mut graph = Graph::new("test");
        let sources: Vec<NodeId> = (0..4)
            .map(|_| graph.add_node(registry.create_node("test.pass").unwrap()))
            .collect();
        let sink = graph.add_node(registry.create_node("test.pass").unwrap());

        graph.link(sources[0], "value", sink, "value").unwrap();
        assert!(matches!(
            graph.link(sources[1], "value", sink, "value"),
            Err(GraphError::LinkLimitReached(_))
        ));

        for source in &sources[..3] {
            graph.link(*source, "value", sink, "items").unwrap();
        }
        assert!(graph.link(sources[3], "value", sink, "items").is_err());
    }

    #[test]
    fn test_self_loop_rejected() {
        let registry = registry();
        let mut graph = Graph::new("test");
        let a = graph.add_node(registry.create_node("test.pass").unwrap());
        assert_eq!(graph.link(a, "value", a, "value"), Err(GraphError::SelfLoop));
    }

    #[test]
    fn test_type_mismatch_pruned() {
        let registry = registry();
        let mut graph = Graph::new("test");
        let array = graph.add_node(registry.create_node("test.array").unwrap());
        let pass = graph.add_node(registry.create_node("test.pass").unwrap());
        let other = graph.add_node(registry.create_node("test.pass").unwrap());

        graph.link(array, "array", pass, "value").unwrap();
        let kept = graph.link(pass, "value", other, "value").unwrap();
        assert_eq!(graph.link_count(), 2);

        let removed = graph.prune_mismatched_links();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].from_node, array);
        assert_eq!(graph.link_count(), 1);
        assert!(graph.get_link(kept).is_some());
    }

    #[test]
    fn test_remove_node_drops_links() {
        let registry = registry();
        let mut graph = Graph::new("test");
        let a = graph.add_node(registry.create_node("test.pass").unwrap());
        let b = graph.add_node(registry.create_node("test.pass").unwrap());
        graph.link(a, "value", b, "value").unwrap();
        graph.set_active_node(Some(a));
        let input = graph.node(b).unwrap().input("value").unwrap().id;
        assert!(graph.is_linked(input));

        assert!(graph.remove_node(a).is_some());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.link_count(), 0);
        assert!(!graph.is_linked(input));
        assert_eq!(graph.active_node(), None);
    }

    #[test]
    fn test_data_cycle_detected_exec_cycle_allowed() {
        let registry = registry();
        let mut graph = Graph::new("test");
        let a = graph.add_node(registry.create_node("test.pass").unwrap());
        let b = graph.add_node(registry.create_node("test.pass").unwrap());
        graph.link(a, "value", b, "value").unwrap();
        assert_eq!(graph.topological_order().unwrap(), vec![a, b]);

        graph.link(b, "value", a, "value").unwrap();
        assert!(graph.check_data_acyclic().is_err());

        let mut flow = Graph::new("flow");
        let s1 = flow.add_node(registry.create_node("test.step").unwrap());
        let s2 = flow.add_node(registry.create_node("test.step").unwrap());
        flow.link(s1, "exec", s2, "exec").unwrap();
        flow.link(s2, "exec", s1, "exec").unwrap();
        assert!(flow.check_data_acyclic().is_ok());
    }
}
