// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operation catalogue built on the core framework.
//!
//! Every leaf operation is a [`NodeType`](crate::node::NodeType) descriptor
//! registered by one of the category modules below.

pub mod array;
pub mod cast;
pub mod flow;
pub mod literal;
pub mod map;
pub mod operator;
pub mod scene;
pub mod set;
pub mod string;
pub mod utility;
pub mod variable;

use crate::node::{NodeRegistry, RegistryError};

/// Create a registry holding the whole catalogue, in palette order
pub fn create_default_registry() -> Result<NodeRegistry, RegistryError> {
    let mut registry = NodeRegistry::new();
    flow::register(&mut registry)?;
    utility::register(&mut registry)?;
    literal::register(&mut registry)?;
    operator::register(&mut registry)?;
    variable::register(&mut registry)?;
    array::register(&mut registry)?;
    set::register(&mut registry)?;
    map::register(&mut registry)?;
    string::register(&mut registry)?;
    cast::register(&mut registry)?;
    scene::register(&mut registry)?;
    tracing::debug!(types = registry.len(), "default registry created");
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod harness {
    //! Single-graph test bench over the default registry.

    use super::*;
    use crate::config::EngineConfig;
    use crate::evaluation::{Engine, NodeError, RunSummary};
    use crate::graph::Graph;
    use crate::host::{Console, MemoryHost};
    use crate::node::NodeId;
    use crate::value::Value;
    use crate::workspace::Workspace;
    use std::sync::Arc;

    pub const GRAPH: &str = "main";

    pub struct Harness {
        pub engine: Engine,
        pub workspace: Workspace,
        pub console: Console,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_host(MemoryHost::new())
        }

        pub fn with_host(host: MemoryHost) -> Self {
            Self::with_config(host, EngineConfig::default())
        }

        pub fn with_config(host: MemoryHost, config: EngineConfig) -> Self {
            let registry = Arc::new(create_default_registry().unwrap());
            let console = host.console();
            let mut workspace = Workspace::new();
            workspace.insert(Graph::new(GRAPH));
            Self {
                engine: Engine::new(registry, config, Box::new(host)),
                workspace,
                console,
            }
        }

        pub fn graph(&mut self) -> &mut Graph {
            self.workspace.graph_mut(GRAPH).unwrap()
        }

        pub fn add(&mut self, type_id: &str) -> NodeId {
            let node = self.engine.registry().create_node(type_id).unwrap();
            self.graph().add_node(node)
        }

        pub fn add_with(&mut self, type_id: &str, fields: &[(&str, Value)]) -> NodeId {
            let mut node = self.engine.registry().create_node(type_id).unwrap();
            for (name, value) in fields {
                self.engine
                    .registry()
                    .configure(&mut node, name, value.clone())
                    .unwrap();
            }
            self.graph().add_node(node)
        }

        /// Literal node of the matching type
        pub fn literal(&mut self, value: impl Into<Value>) -> NodeId {
            let value = value.into();
            let type_id = match value {
                Value::Bool(_) => literal::BOOLEAN,
                Value::Int(_) => literal::INTEGER,
                Value::Float(_) => literal::FLOAT,
                _ => literal::STRING,
            };
            self.add_with(type_id, &[("value", value)])
        }

        pub fn link(&mut self, from: NodeId, output: &str, to: NodeId, input: &str) {
            self.graph().link(from, output, to, input).unwrap();
        }

        pub fn set_default(&mut self, node: NodeId, input: &str, value: impl Into<Value>) {
            let socket = self.graph().node_mut(node).unwrap().input_mut(input).unwrap();
            socket.default_value = value.into();
        }

        pub fn run(&mut self, node: NodeId) -> RunSummary {
            self.engine.execute(&self.workspace, GRAPH, node)
        }

        pub fn pull(&mut self, node: NodeId, output: &str) -> Result<Value, NodeError> {
            self.engine.resolve_output(&self.workspace, GRAPH, node, output)
        }

        /// Pull an output of a fresh node whose inputs are given as defaults
        pub fn apply(&mut self, type_id: &str, inputs: &[(&str, Value)], output: &str) -> Result<Value, NodeError> {
            let node = self.add(type_id);
            for (name, value) in inputs {
                self.set_default(node, name, value.clone());
            }
            self.pull(node, output)
        }

        pub fn printed(&self) -> Vec<String> {
            self.console.drain()
        }
    }
}
