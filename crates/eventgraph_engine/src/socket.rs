// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket definitions for node inputs/outputs.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link limit meaning "any number of links"
pub const UNLIMITED: usize = usize::MAX;

/// Unique identifier for a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId(pub Uuid);

impl SocketId {
    /// Create a new random socket ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SocketId {
    fn default() -> Self {
        Self::new()
    }
}

/// Socket direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketDirection {
    /// Input socket
    Input,
    /// Output socket
    Output,
}

/// Type tag carried by a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketType {
    /// Execution flow
    Exec,
    /// Primitive value (bool, number, string, none)
    Value,
    /// Ordered list
    Array,
    /// Unordered set
    Set,
    /// String-keyed map
    Map,
    /// Host object handle
    Object,
}

impl SocketType {
    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exec => "Execute",
            Self::Value => "Value",
            Self::Array => "Array",
            Self::Set => "Set",
            Self::Map => "Map",
            Self::Object => "Object",
        }
    }

    /// Whether this tag carries control flow rather than data
    pub fn is_exec(&self) -> bool {
        matches!(self, Self::Exec)
    }

    /// Tags link only when they are identical
    pub fn can_connect_to(&self, other: &SocketType) -> bool {
        self == other
    }
}

/// A socket on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Socket {
    /// Unique socket ID
    pub id: SocketId,
    /// Socket name, unique per direction on its node
    pub name: String,
    /// Socket direction
    pub direction: SocketDirection,
    /// Type tag, fixed after creation
    socket_type: SocketType,
    /// Maximum number of links attached to this socket
    pub link_limit: usize,
    /// Hide the default value widget while linked
    pub hide_value: bool,
    /// Value used when the socket is unconnected
    pub default_value: Value,
}

impl Socket {
    /// Declare a socket with every attribute spelled out
    pub fn declare(
        direction: SocketDirection,
        socket_type: SocketType,
        name: impl Into<String>,
        link_limit: usize,
        hide_value: bool,
        default_value: Value,
    ) -> Self {
        Self {
            id: SocketId::new(),
            name: name.into(),
            direction,
            socket_type,
            link_limit: link_limit.max(1),
            hide_value,
            default_value,
        }
    }

    /// Create a new input socket accepting a single link
    pub fn input(name: impl Into<String>, socket_type: SocketType) -> Self {
        let limit = if socket_type.is_exec() { UNLIMITED } else { 1 };
        Self::declare(SocketDirection::Input, socket_type, name, limit, true, Value::None)
    }

    /// Create a fan-in input socket collecting up to `limit` links
    pub fn fan_in(name: impl Into<String>, socket_type: SocketType, limit: usize) -> Self {
        Self::declare(SocketDirection::Input, socket_type, name, limit, true, Value::None)
    }

    /// Create a new output socket
    pub fn output(name: impl Into<String>, socket_type: SocketType) -> Self {
        Self::declare(SocketDirection::Output, socket_type, name, UNLIMITED, true, Value::None)
    }

    /// Create an execution input
    pub fn exec_input(name: impl Into<String>) -> Self {
        Self::input(name, SocketType::Exec)
    }

    /// Create an execution output
    pub fn exec_output(name: impl Into<String>) -> Self {
        Self::output(name, SocketType::Exec)
    }

    /// Set the default value and keep its widget visible while linked
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self.hide_value = false;
        self
    }

    /// Copy of this socket with a fresh ID, used when instantiating a node type
    pub fn instantiate(&self) -> Self {
        Self { id: SocketId::new(), ..self.clone() }
    }

    /// The socket's type tag
    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    /// Whether this is an execution socket
    pub fn is_exec(&self) -> bool {
        self.socket_type.is_exec()
    }

    /// Whether the default value widget is drawn given the linked state
    pub fn shows_default(&self, linked: bool) -> bool {
        !(linked && self.hide_value) && !self.is_exec()
    }

    /// Check if a link to another socket is structurally possible
    pub fn can_connect(&self, other: &Socket) -> bool {
        self.direction != other.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        assert_eq!(Socket::input("a", SocketType::Value).link_limit, 1);
        assert_eq!(Socket::exec_input("exec").link_limit, UNLIMITED);
        assert_eq!(Socket::output("out", SocketType::Array).link_limit, UNLIMITED);
        assert_eq!(Socket::fan_in("item", SocketType::Value, 100).link_limit, 100);
    }

    #[test]
    fn test_exact_tag_matching() {
        assert!(SocketType::Value.can_connect_to(&SocketType::Value));
        assert!(!SocketType::Array.can_connect_to(&SocketType::Value));
        assert!(!SocketType::Exec.can_connect_to(&SocketType::Value));
    }

    #[test]
    fn test_hide_value_when_linked() {
        let hidden = Socket::input("a", SocketType::Value);
        assert!(hidden.shows_default(false));
        assert!(!hidden.shows_default(true));

        let shown = Socket::input("start", SocketType::Value).with_default(0);
        assert!(shown.shows_default(true));
    }

    #[test]
    fn test_instantiate_fresh_id() {
        let template = Socket::output("value", SocketType::Value);
        let copy = template.instantiate();
        assert_ne!(template.id, copy.id);
        assert_eq!(template.name, copy.name);
        assert_eq!(copy.socket_type(), SocketType::Value);
    }
}
