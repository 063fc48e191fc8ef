// SPDX-License-Identifier: MIT OR Apache-2.0
//! The set of graphs open in one editor session.

use crate::graph::Graph;
use crate::node::{FieldChoices, FieldSpec};
use indexmap::IndexMap;

/// Named graphs plus the one currently open
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    graphs: IndexMap<String, Graph>,
    active: Option<String>,
}

impl Workspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a graph, keyed by its name; the first graph becomes active
    pub fn insert(&mut self, graph: Graph) {
        if self.active.is_none() {
            self.active = Some(graph.name.clone());
        }
        self.graphs.insert(graph.name.clone(), graph);
    }

    /// Remove a graph
    pub fn remove(&mut self, name: &str) -> Option<Graph> {
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        self.graphs.shift_remove(name)
    }

    /// Get a graph by name
    pub fn graph(&self, name: &str) -> Option<&Graph> {
        self.graphs.get(name)
    }

    /// Get a mutable graph by name
    pub fn graph_mut(&mut self, name: &str) -> Option<&mut Graph> {
        self.graphs.get_mut(name)
    }

    /// All graphs
    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    /// Graph names in insertion order
    pub fn graph_names(&self) -> Vec<String> {
        self.graphs.keys().cloned().collect()
    }

    /// Open a graph in the editor
    pub fn set_active(&mut self, name: &str) -> bool {
        if !self.graphs.contains_key(name) {
            return false;
        }
        self.active = Some(name.to_string());
        true
    }

    /// Name of the open graph
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The open graph
    pub fn active(&self) -> Option<&Graph> {
        self.active.as_deref().and_then(|name| self.graphs.get(name))
    }

    /// Items for an enum field, resolving dynamic choices against this workspace
    pub fn field_items(&self, field: &FieldSpec) -> Vec<String> {
        match &field.choices {
            FieldChoices::Fixed(choices) => choices.clone(),
            FieldChoices::Graphs => self.graph_names(),
            FieldChoices::Free => Vec::new(),
        }
    }
}
