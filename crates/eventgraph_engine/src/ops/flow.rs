// SPDX-License-Identifier: MIT OR Apache-2.0
//! Control flow: entry points, branching, loops and graph calls.
//!
//! Loops expose their current index or item through a producer reading the
//! node's scratch store, so a loop body linked only by execution sockets
//! can still read the loop variable.

use crate::evaluation::NodeError;
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};

/// Entry point of an execution flow
pub const FUNCTION: &str = "flow.function";
/// If/else on a condition
pub const BRANCH: &str = "flow.branch";
/// Iterate over an integer range
pub const FOR_LOOP: &str = "flow.for_loop";
/// Iterate over the items of a collection
pub const FOR_EACH: &str = "flow.for_each";
/// Run the entry points of another graph
pub const CALL_GRAPH: &str = "flow.call_graph";

/// Register the flow nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::impure(FUNCTION, "Function", NodeCategory::Flow)
            .describe("Start an execution flow")
            .output(Socket::exec_output("exec"))
            .entry_point()
            .effect(|ctx| {
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::impure(BRANCH, "Branch", NodeCategory::Flow)
            .describe("Switch the execution flow on a boolean condition")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("condition", SocketType::Value).with_default(false))
            .output(Socket::exec_output("true"))
            .output(Socket::exec_output("false"))
            .effect(|ctx| {
                let next = if ctx.input_bool("condition")? { "true" } else { "false" };
                ctx.trigger(next);
                Ok(())
            }),
    )?;

    // Loops
    registry.register(
        NodeType::impure(FOR_LOOP, "For Loop", NodeCategory::Flow)
            .describe("Iterate over a range of values")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("start", SocketType::Value).with_default(0))
            .input(Socket::input("end", SocketType::Value).with_default(10))
            .output(Socket::exec_output("loop"))
            .output(Socket::output("index", SocketType::Value))
            .output(Socket::exec_output("completed"))
            .produce("index", |ctx| Ok(ctx.scratch("index")))
            .effect(|ctx| {
                let start = ctx.input_int("start")?;
                let end = ctx.input_int("end")?;
                for i in start..end {
                    ctx.set_scratch("index", i);
                    ctx.trigger("loop");
                }
                ctx.remove_scratch("index");
                ctx.trigger("completed");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::impure(FOR_EACH, "For Each", NodeCategory::Flow)
            .describe("Iterate over a list of values")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("list", SocketType::Array))
            .output(Socket::exec_output("loop"))
            .output(Socket::output("item", SocketType::Value))
            .output(Socket::exec_output("completed"))
            .produce("item", |ctx| Ok(ctx.scratch("item")))
            .effect(|ctx| {
                for item in ctx.input_items("list")? {
                    ctx.set_scratch("item", item);
                    ctx.trigger("loop");
                }
                ctx.remove_scratch("item");
                ctx.trigger("completed");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::impure(CALL_GRAPH, "Call Graph", NodeCategory::Flow)
            .describe("Run the Function nodes of another graph")
            .input(Socket::exec_input("exec"))
            .field(FieldSpec::graph("graph"))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let graph = ctx.field_str("graph");
                if graph.is_empty() {
                    return Err(NodeError::invalid("graph", "no graph selected"));
                }
                ctx.execute_graph(&graph)?;
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::ops::harness::Harness;
    use crate::ops::utility::PRINT;
    use crate::value::Value;

    #[test]
    fn test_for_loop_range() {
        let mut h = Harness::new();
        let start = h.add(FUNCTION);
        let for_loop = h.add(FOR_LOOP);
        let body = h.add(PRINT);
        let done = h.add(PRINT);
        let text = h.literal("done");
        h.set_default(for_loop, "end", 5);
        h.link(start, "exec", for_loop, "exec");
        h.link(for_loop, "loop", body, "exec");
        h.link(for_loop, "index", body, "value");
        h.link(for_loop, "completed", done, "exec");
        h.link(text, "value", done, "value");

        let summary = h.run(start);
        assert_eq!(h.printed(), vec!["0", "1", "2", "3", "4", "done"]);
        assert_eq!(summary.executed, 1 + 1 + 5 + 1);
        // Index is cleared once the loop completes
        assert_eq!(h.pull(for_loop, "index").unwrap(), Value::None);
    }

    #[test]
    fn test_for_loop_empty_range() {
        let mut h = Harness::new();
        let for_loop = h.add(FOR_LOOP);
        let body = h.add(PRINT);
        let done = h.add(PRINT);
        h.set_default(for_loop, "start", 3);
        h.set_default(for_loop, "end", 3);
        h.link(for_loop, "loop", body, "exec");
        h.link(for_loop, "completed", done, "exec");

        h.run(for_loop);
        assert_eq!(h.printed(), vec!["None"]);
    }

    #[test]
    fn test_for_each_items() {
        let mut h = Harness::new();
        let make = h.add(crate::ops::array::MAKE);
        for text in ["a", "b"] {
            let literal = h.literal(text);
            h.link(literal, "value", make, "item");
        }
        let for_each = h.add(FOR_EACH);
        let body = h.add(PRINT);
        h.link(make, "array", for_each, "list");
        h.link(for_each, "loop", body, "exec");
        h.link(for_each, "item", body, "value");

        h.run(for_each);
        assert_eq!(h.printed(), vec!["a", "b"]);
    }

    #[test]
    fn test_nested_loops() {
        let mut h = Harness::new();
        let outer = h.add(FOR_LOOP);
        let inner = h.add(FOR_LOOP);
        let sum = h.add(crate::ops::operator::ARITHMETIC);
        let print = h.add(PRINT);
        h.set_default(outer, "end", 2);
        h.set_default(inner, "end", 2);
        h.link(outer, "loop", inner, "exec");
        h.link(inner, "loop", print, "exec");
        h.link(outer, "index", sum, "a");
        h.link(inner, "index", sum, "b");
        h.link(sum, "result", print, "value");

        h.run(outer);
        assert_eq!(h.printed(), vec!["0", "1", "1", "2"]);
        assert!(h.engine.store().is_empty());
    }

    #[test]
    fn test_branch() {
        let mut h = Harness::new();
        let branch = h.add(BRANCH);
        let yes = h.add(PRINT);
        let no = h.add(PRINT);
        let yes_text = h.literal("yes");
        let no_text = h.literal("no");
        h.link(branch, "true", yes, "exec");
        h.link(branch, "false", no, "exec");
        h.link(yes_text, "value", yes, "value");
        h.link(no_text, "value", no, "value");

        h.run(branch);
        assert_eq!(h.printed(), vec!["no"]);
        h.set_default(branch, "condition", 1);
        h.run(branch);
        assert_eq!(h.printed(), vec!["yes"]);
    }

    #[test]
    fn test_call_graph() {
        let mut h = Harness::new();
        let mut helper = Graph::new("helper");
        let registry = h.engine.registry();
        let entry = helper.add_node(registry.create_node(FUNCTION).unwrap());
        let print = helper.add_node(registry.create_node(PRINT).unwrap());
        helper.node_mut(print).unwrap().input_mut("value").unwrap().default_value =
            Value::from("from helper");
        helper.link(entry, "exec", print, "exec").unwrap();
        h.workspace.insert(helper);

        let call = h.add_with(CALL_GRAPH, &[("graph", Value::from("helper"))]);
        let after = h.add(PRINT);
        h.link(call, "exec", after, "exec");

        h.run(call);
        assert_eq!(h.printed(), vec!["from helper", "None"]);
    }

    #[test]
    fn test_call_graph_missing() {
        let mut h = Harness::new();
        let call = h.add_with(CALL_GRAPH, &[("graph", Value::from("nowhere"))]);
        let summary = h.run(call);
        assert_eq!(summary.failed, 1);

        let unset = h.add(CALL_GRAPH);
        assert_eq!(h.run(unset).failed, 1);
    }
}
