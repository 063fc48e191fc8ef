// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable/cache store shared by every graph an engine runs.
//!
//! One ordered map backs two namespaces: user-named globals written by the
//! variable and cache nodes, and scratch entries scoped to a single run of a
//! node (`{instance}_{field}`), which is how loops hand their current item to
//! the pure nodes in their body.

use crate::node::NodeId;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one run of a node; regenerated before every execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    /// Create a new random instance ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Key into the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKey {
    /// User-named global
    Global(String),
    /// Scratch value owned by one run of a node
    Scratch {
        /// Owning node
        node: NodeId,
        /// Run that wrote the value
        instance: InstanceId,
        /// Field name
        field: String,
    },
}

impl StoreKey {
    /// Global key
    pub fn global(name: impl Into<String>) -> Self {
        Self::Global(name.into())
    }

    /// Scratch key for a node run
    pub fn scratch(node: NodeId, instance: InstanceId, field: impl Into<String>) -> Self {
        Self::Scratch {
            node,
            instance,
            field: field.into(),
        }
    }

    /// Whether the key lives in the global namespace
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global(name) => f.write_str(name),
            Self::Scratch { instance, field, .. } => write!(f, "{instance}_{field}"),
        }
    }
}

/// Keyed value store
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    entries: IndexMap<StoreKey, Value>,
}

impl VariableStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: StoreKey, value: Value) {
        self.entries.insert(key, value);
    }

    /// Read a value, [`Value::None`] when missing
    pub fn get(&self, key: &StoreKey) -> Value {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Whether a key is present
    pub fn contains(&self, key: &StoreKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a value
    pub fn remove(&mut self, key: &StoreKey) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Clear both namespaces
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Clear the global namespace only
    pub fn flush_globals(&mut self) {
        self.entries.retain(|key, _| !key.is_global());
    }

    /// Drop every scratch entry written by one run of a node
    pub fn release_instance(&mut self, node: NodeId, instance: InstanceId) {
        self.entries.retain(|key, _| {
            !matches!(key, StoreKey::Scratch { node: n, instance: i, .. } if *n == node && *i == instance)
        });
    }

    /// Drop every scratch entry of a node, whatever run wrote it
    pub fn release_node(&mut self, node: NodeId) {
        self.entries
            .retain(|key, _| !matches!(key, StoreKey::Scratch { node: n, .. } if *n == node));
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rendered keys and values, in insertion order
    pub fn dump(&self) -> Vec<(String, Value)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    /// Dump formatted as a single line
    pub fn dump_line(&self) -> String {
        let items: Vec<String> = self
            .dump()
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("'{key}': '{s}'"),
                other => format!("'{key}': {other}"),
            })
            .collect();
        format!("{{{}}}", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_is_none() {
        let store = VariableStore::new();
        assert_eq!(store.get(&StoreKey::global("x")), Value::None);
    }

    #[test]
    fn test_flush_globals_keeps_scratch() {
        let mut store = VariableStore::new();
        let node = NodeId::new();
        let instance = InstanceId::new();
        store.set(StoreKey::global("x"), Value::Int(1));
        store.set(StoreKey::scratch(node, instance, "index"), Value::Int(3));

        store.flush_globals();
        assert!(!store.contains(&StoreKey::global("x")));
        assert_eq!(store.get(&StoreKey::scratch(node, instance, "index")), Value::Int(3));

        store.flush();
        assert!(store.is_empty());
    }

    #[test]
    fn test_release_scopes() {
        let mut store = VariableStore::new();
        let node = NodeId::new();
        let first = InstanceId::new();
        let second = InstanceId::new();
        store.set(StoreKey::scratch(node, first, "changed"), Value::Bool(true));
        store.set(StoreKey::scratch(node, second, "changed"), Value::Bool(false));
        store.set(StoreKey::global("changed"), Value::Int(0));

        store.release_instance(node, first);
        assert_eq!(store.len(), 2);
        store.release_node(node);
        assert_eq!(store.len(), 1);
        assert!(store.contains(&StoreKey::global("changed")));
    }

    #[test]
    fn test_scratch_key_rendering() {
        let node = NodeId::new();
        let instance = InstanceId::new();
        let key = StoreKey::scratch(node, instance, "index");
        assert_eq!(key.to_string(), format!("{instance}_index"));

        let mut store = VariableStore::new();
        store.set(StoreKey::global("name"), Value::from("cube"));
        store.set(StoreKey::global("count"), Value::Int(2));
        assert_eq!(store.dump_line(), "{'name': 'cube', 'count': 2}");
    }
}
