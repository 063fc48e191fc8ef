// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::node::NodeId;
use crate::socket::SocketId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub Uuid);

impl LinkId {
    /// Create a new random link ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed link from an output socket to an input socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Unique link ID
    pub id: LinkId,
    /// Source node ID
    pub from_node: NodeId,
    /// Source (output) socket ID
    pub from_socket: SocketId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target (input) socket ID
    pub to_socket: SocketId,
}

impl Link {
    /// Create a new link
    pub fn new(
        from_node: NodeId,
        from_socket: SocketId,
        to_node: NodeId,
        to_socket: SocketId,
    ) -> Self {
        Self {
            id: LinkId::new(),
            from_node,
            from_socket,
            to_node,
            to_socket,
        }
    }

    /// Check if this link involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }

    /// Check if this link involves a specific socket
    pub fn involves_socket(&self, socket_id: SocketId) -> bool {
        self.from_socket == socket_id || self.to_socket == socket_id
    }
}
