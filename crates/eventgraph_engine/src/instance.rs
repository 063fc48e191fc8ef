// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-node run identifiers.
//!
//! Each execution of an impure node gets a fresh [`InstanceId`] so its
//! scratch entries never mix with those of an earlier or enclosing run.
//! Pure producers read under the innermost active run, or the most recent
//! finished one once the node is idle.
//!
//! An instance with a deferred continuation pending is pinned: its scratch
//! survives later runs of the node until the continuation has fired.

use crate::node::NodeId;
use crate::store::{InstanceId, VariableStore};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct InstanceState {
    /// Runs in progress, innermost last
    active: Vec<InstanceId>,
    /// Last finished run, kept readable after the node returns
    last: Option<InstanceId>,
    /// Pending continuation count per instance
    pinned: HashMap<InstanceId, usize>,
}

impl InstanceState {
    fn is_pinned(&self, instance: InstanceId) -> bool {
        self.pinned.contains_key(&instance)
    }

    fn is_live(&self, instance: InstanceId) -> bool {
        self.last == Some(instance) || self.active.contains(&instance)
    }

    fn release(&self, node: NodeId, instance: InstanceId, store: &mut VariableStore) {
        if !self.is_pinned(instance) && !self.is_live(instance) {
            store.release_instance(node, instance);
        }
    }
}

/// Table of live instance identifiers
#[derive(Debug, Default)]
pub struct InstanceTable {
    nodes: HashMap<NodeId, InstanceState>,
}

impl InstanceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh instance for a run of `node`.
    ///
    /// When the node is idle the scratch of its previous run is released.
    pub fn begin(&mut self, node: NodeId, store: &mut VariableStore) -> InstanceId {
        let state = self.nodes.entry(node).or_default();
        if state.active.is_empty() {
            if let Some(previous) = state.last.take() {
                state.release(node, previous, store);
            }
        }
        let instance = InstanceId::new();
        state.active.push(instance);
        instance
    }

    /// Re-enter a saved instance, for deferred continuations
    pub fn resume(&mut self, node: NodeId, instance: InstanceId) {
        self.nodes.entry(node).or_default().active.push(instance);
    }

    /// Close the innermost run of `node`
    pub fn end(&mut self, node: NodeId, store: &mut VariableStore) {
        let Some(state) = self.nodes.get_mut(&node) else {
            return;
        };
        let Some(finished) = state.active.pop() else {
            return;
        };
        if !state.active.is_empty() {
            // Nested run: the enclosing run owns what readers see
            state.release(node, finished, store);
            return;
        }
        if let Some(previous) = state.last.replace(finished) {
            state.release(node, previous, store);
        }
    }

    /// Keep the scratch of `instance` alive for a pending continuation
    pub fn pin(&mut self, node: NodeId, instance: InstanceId) {
        let state = self.nodes.entry(node).or_default();
        *state.pinned.entry(instance).or_default() += 1;
    }

    /// Drop one pin taken by [`InstanceTable::pin`], releasing the scratch once unused
    pub fn unpin(&mut self, node: NodeId, instance: InstanceId, store: &mut VariableStore) {
        let Some(state) = self.nodes.get_mut(&node) else {
            return;
        };
        let Some(count) = state.pinned.get_mut(&instance) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            state.pinned.remove(&instance);
            state.release(node, instance, store);
        }
    }

    /// Instance pure producers of `node` read under, allocated on first use
    pub fn current(&mut self, node: NodeId) -> InstanceId {
        let state = self.nodes.entry(node).or_default();
        if let Some(active) = state.active.last() {
            return *active;
        }
        *state.last.get_or_insert_with(InstanceId::new)
    }

    /// Whether a run of `node` is in progress
    pub fn is_running(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|s| !s.active.is_empty())
    }

    /// Drop all bookkeeping for a removed node
    pub fn forget(&mut self, node: NodeId) {
        self.nodes.remove(&node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreKey;
    use crate::value::Value;

    #[test]
    fn test_fresh_instance_per_run() {
        let mut table = InstanceTable::new();
        let mut store = VariableStore::new();
        let node = NodeId::new();

        let first = table.begin(node, &mut store);
        table.end(node, &mut store);
        let second = table.begin(node, &mut store);
        table.end(node, &mut store);
        assert_ne!(first, second);
        assert_eq!(table.current(node), second);
    }

    #[test]
    fn test_previous_run_scratch_released() {
        let mut table = InstanceTable::new();
        let mut store = VariableStore::new();
        let node = NodeId::new();

        let first = table.begin(node, &mut store);
        store.set(StoreKey::scratch(node, first, "changed"), Value::Bool(true));
        table.end(node, &mut store);
        assert_eq!(store.len(), 1);

        let second = table.begin(node, &mut store);
        assert!(store.is_empty());
        assert_eq!(store.get(&StoreKey::scratch(node, second, "changed")), Value::None);
    }

    #[test]
    fn test_nested_run_restores_outer() {
        let mut table = InstanceTable::new();
        let mut store = VariableStore::new();
        let node = NodeId::new();

        let outer = table.begin(node, &mut store);
        store.set(StoreKey::scratch(node, outer, "index"), Value::Int(1));
        let inner = table.begin(node, &mut store);
        assert_eq!(table.current(node), inner);
        store.set(StoreKey::scratch(node, inner, "index"), Value::Int(7));
        table.end(node, &mut store);

        assert_eq!(table.current(node), outer);
        assert_eq!(store.get(&StoreKey::scratch(node, outer, "index")), Value::Int(1));
        assert!(!store.contains(&StoreKey::scratch(node, inner, "index")));
        table.end(node, &mut store);
        assert!(!table.is_running(node));
    }

    #[test]
    fn test_pinned_scratch_survives_later_runs() {
        let mut table = InstanceTable::new();
        let mut store = VariableStore::new();
        let node = NodeId::new();

        let first = table.begin(node, &mut store);
        store.set(StoreKey::scratch(node, first, "tag"), Value::from("first"));
        table.pin(node, first);
        table.end(node, &mut store);

        let second = table.begin(node, &mut store);
        store.set(StoreKey::scratch(node, second, "tag"), Value::from("second"));
        table.end(node, &mut store);
        assert_eq!(store.get(&StoreKey::scratch(node, first, "tag")), Value::from("first"));

        // Continuation fires and becomes the last run
        table.resume(node, first);
        table.end(node, &mut store);
        table.unpin(node, first, &mut store);
        assert_eq!(table.current(node), first);
        assert!(store.contains(&StoreKey::scratch(node, first, "tag")));
        assert!(!store.contains(&StoreKey::scratch(node, second, "tag")));
    }

    #[test]
    fn test_unpin_releases_stale_instance() {
        let mut table = InstanceTable::new();
        let mut store = VariableStore::new();
        let node = NodeId::new();

        let first = table.begin(node, &mut store);
        store.set(StoreKey::scratch(node, first, "tag"), Value::Int(1));
        table.pin(node, first);
        table.end(node, &mut store);
        table.begin(node, &mut store);
        table.end(node, &mut store);

        table.unpin(node, first, &mut store);
        assert!(!store.contains(&StoreKey::scratch(node, first, "tag")));
    }

    #[test]
    fn test_current_allocates_once() {
        let mut table = InstanceTable::new();
        let node = NodeId::new();
        let a = table.current(node);
        assert_eq!(table.current(node), a);
    }
}
