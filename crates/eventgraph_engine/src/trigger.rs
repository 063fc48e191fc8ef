// SPDX-License-Identifier: MIT OR Apache-2.0
//! The "Execute Main" entry trigger.
//!
//! Runs the active node of the open graph as a top-level control flow,
//! after validating every graph and clearing the global variables left by
//! a previous run.

use crate::evaluation::Engine;
use crate::workspace::Workspace;
use std::fmt;

/// Message returned to the user after an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// The run happened
    Info(String),
    /// Nothing was run
    Warning(String),
}

impl Report {
    /// Whether this is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    /// Message text
    pub fn message(&self) -> &str {
        match self {
            Self::Info(message) | Self::Warning(message) => message,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info(message) => write!(f, "info: {message}"),
            Self::Warning(message) => write!(f, "warning: {message}"),
        }
    }
}

/// User-invokable action starting a run from the selected entry node
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteMain;

impl ExecuteMain {
    /// Action identifier
    pub const ID: &'static str = "node.execute_main";
    /// Menu label
    pub const LABEL: &'static str = "Execute Main";

    /// Run the active node of the active graph
    pub fn invoke(&self, engine: &mut Engine, workspace: &mut Workspace) -> Report {
        let Some(graph_name) = workspace.active_name().map(str::to_string) else {
            return warn("No graph is open");
        };
        let Some(node_id) = workspace.active().and_then(|g| g.active_node()) else {
            return warn("No node is selected");
        };
        let entry = workspace
            .active()
            .and_then(|g| g.node(node_id))
            .map(|node| {
                let is_entry = engine
                    .registry()
                    .get(&node.node_type)
                    .is_some_and(|t| t.entry_point);
                (node.label.clone(), is_entry)
            });
        let label = match entry {
            Some((label, true)) => label,
            Some((label, false)) => return warn(&format!("'{label}' is not an entry point")),
            None => return warn("Selected node no longer exists"),
        };

        if engine.config().validate_before_run {
            if let Err(report) = validate(workspace) {
                return report;
            }
        }
        if engine.config().flush_globals_before_run {
            engine.store_mut().flush_globals();
        }

        tracing::info!(graph = %graph_name, node = %label, "execute main");
        let summary = engine.execute(workspace, &graph_name, node_id);
        tracing::info!(graph = %graph_name, %summary, "execute main finished");
        Report::Info(format!("Output Node Result: {summary}"))
    }
}

/// Prune mismatched links and reject data cycles in every graph
fn validate(workspace: &mut Workspace) -> Result<(), Report> {
    for name in workspace.graph_names() {
        let Some(graph) = workspace.graph_mut(&name) else {
            continue;
        };
        let pruned = graph.prune_mismatched_links();
        if !pruned.is_empty() {
            tracing::warn!(
                graph = %name,
                count = pruned.len(),
                "removed links between mismatched socket types"
            );
        }
        if let Err(cycle) = graph.check_data_acyclic() {
            let label = graph
                .node(cycle.0)
                .map_or_else(|| cycle.0.to_string(), |n| n.label.clone());
            return Err(warn(&format!("Data cycle in graph '{name}' through '{label}'")));
        }
    }
    Ok(())
}

fn warn(message: &str) -> Report {
    tracing::warn!("{message}");
    Report::Warning(message.to_string())
}
