// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo graphs run by the driver.

use crate::AppError;
use eventgraph_engine::ops::{flow, literal, operator, utility};
use eventgraph_engine::{Graph, NodeId, NodeRegistry, Value, Workspace};

/// Builds a graph by type ID and socket name
struct Builder<'a> {
    registry: &'a NodeRegistry,
    graph: Graph,
}

impl<'a> Builder<'a> {
    fn new(registry: &'a NodeRegistry, name: &str) -> Self {
        Self {
            registry,
            graph: Graph::new(name),
        }
    }

    fn add(&mut self, type_id: &str) -> Result<NodeId, AppError> {
        let node = self
            .registry
            .create_node(type_id)
            .ok_or_else(|| AppError::UnknownNodeType(type_id.to_string()))?;
        Ok(self.graph.add_node(node))
    }

    fn add_with(&mut self, type_id: &str, fields: &[(&str, Value)]) -> Result<NodeId, AppError> {
        let id = self.add(type_id)?;
        if let Some(node) = self.graph.node_mut(id) {
            for (name, value) in fields {
                self.registry.configure(node, name, value.clone())?;
            }
        }
        Ok(id)
    }

    fn set_default(&mut self, node: NodeId, input: &str, value: impl Into<Value>) {
        if let Some(socket) = self.graph.node_mut(node).and_then(|n| n.input_mut(input)) {
            socket.default_value = value.into();
        }
    }

    fn link(&mut self, from: NodeId, output: &str, to: NodeId, input: &str) -> Result<(), AppError> {
        self.graph.link(from, output, to, input)?;
        Ok(())
    }

    fn finish(mut self, entry: NodeId) -> Graph {
        self.graph.set_active_node(Some(entry));
        self.graph
    }
}

/// `5 + 3` printed by a Function node
fn arithmetic(registry: &NodeRegistry) -> Result<Graph, AppError> {
    let mut b = Builder::new(registry, "arithmetic");
    let main = b.add(flow::FUNCTION)?;
    let five = b.add_with(literal::INTEGER, &[("value", Value::Int(5))])?;
    let three = b.add_with(literal::INTEGER, &[("value", Value::Int(3))])?;
    let sum = b.add_with(operator::ARITHMETIC, &[("operator", Value::from("+"))])?;
    let print = b.add(utility::PRINT)?;
    b.link(five, "value", sum, "a")?;
    b.link(three, "value", sum, "b")?;
    b.link(sum, "result", print, "value")?;
    b.link(main, "exec", print, "exec")?;
    Ok(b.finish(main))
}

/// Counts to three, then calls the `arithmetic` graph
fn counting(registry: &NodeRegistry) -> Result<Graph, AppError> {
    let mut b = Builder::new(registry, "counting");
    let main = b.add(flow::FUNCTION)?;
    let for_loop = b.add(flow::FOR_LOOP)?;
    let body = b.add(utility::PRINT)?;
    let call = b.add_with(flow::CALL_GRAPH, &[("graph", Value::from("arithmetic"))])?;
    b.set_default(for_loop, "end", 3);
    b.link(main, "exec", for_loop, "exec")?;
    b.link(for_loop, "loop", body, "exec")?;
    b.link(for_loop, "index", body, "value")?;
    b.link(for_loop, "completed", call, "exec")?;
    Ok(b.finish(main))
}

/// Prints before and after an asynchronous delay
fn delayed(registry: &NodeRegistry) -> Result<Graph, AppError> {
    let mut b = Builder::new(registry, "delayed");
    let main = b.add(flow::FUNCTION)?;
    let before = b.add(utility::PRINT)?;
    let delay = b.add(utility::ASYNC_DELAY)?;
    let after = b.add(utility::PRINT)?;
    b.set_default(before, "value", "waiting");
    b.set_default(delay, "time", 0.5);
    b.set_default(after, "value", "resumed");
    b.link(main, "exec", before, "exec")?;
    b.link(before, "exec", delay, "exec")?;
    b.link(delay, "exec", after, "exec")?;
    Ok(b.finish(main))
}

/// Build the demo workspace; graphs are run in the returned order
pub fn workspace(registry: &NodeRegistry) -> Result<(Workspace, Vec<String>), AppError> {
    let mut workspace = Workspace::new();
    let mut order = Vec::new();
    for graph in [arithmetic(registry)?, counting(registry)?, delayed(registry)?] {
        order.push(graph.name.clone());
        workspace.insert(graph);
    }
    Ok((workspace, order))
}
