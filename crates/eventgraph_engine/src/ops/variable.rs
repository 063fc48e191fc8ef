// SPDX-License-Identifier: MIT OR Apache-2.0
//! Global variables and the cache.
//!
//! Both live in the engine's variable store under global keys. Variables
//! are named by a field on the node, cache entries by an input.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::store::StoreKey;

/// Store a value under the variable named by the `name` field
pub const SET_VARIABLE: &str = "variable.set";
/// Read the variable named by the `name` field
pub const GET_VARIABLE: &str = "variable.get";
/// Store a value under a computed name
pub const SET_CACHE: &str = "variable.set_cache";
/// Read a cache entry by computed name
pub const GET_CACHE: &str = "variable.get_cache";
/// Remove a cache entry
pub const REMOVE_CACHE: &str = "variable.remove_cache";
/// Clear all global entries
pub const FLUSH_CACHE: &str = "variable.flush_cache";
/// Print the store contents
pub const DUMP_CACHE: &str = "variable.dump_cache";

/// Register the variable and cache nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::impure(SET_VARIABLE, "Set Variable", NodeCategory::Variable)
            .describe("Store a value in a global variable")
            .field(FieldSpec::new("name", ""))
            .input(Socket::exec_input("exec"))
            .input(Socket::input("value", SocketType::Value))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let key = field_key(ctx)?;
                let value = ctx.input("value")?;
                ctx.store_mut().set(key, value);
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::pure(GET_VARIABLE, "Get Variable", NodeCategory::Variable)
            .describe("Read a global variable")
            .field(FieldSpec::new("name", ""))
            .output(Socket::output("value", SocketType::Value))
            .produce("value", |ctx| {
                let key = field_key(ctx)?;
                Ok(ctx.store().get(&key))
            }),
    )?;

    // Cache
    registry.register(
        NodeType::impure(SET_CACHE, "Set Cache", NodeCategory::Variable)
            .describe("Store a value in the cache")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("name", SocketType::Value).with_default(""))
            .input(Socket::input("value", SocketType::Value))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let key = input_key(ctx)?;
                let value = ctx.input("value")?;
                ctx.store_mut().set(key, value);
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::pure(GET_CACHE, "Get Cache", NodeCategory::Variable)
            .describe("Read a value from the cache")
            .input(Socket::input("name", SocketType::Value).with_default(""))
            .output(Socket::output("value", SocketType::Value))
            .produce("value", |ctx| {
                let key = input_key(ctx)?;
                Ok(ctx.store().get(&key))
            }),
    )?;

    registry.register(
        NodeType::impure(REMOVE_CACHE, "Remove Cache", NodeCategory::Variable)
            .describe("Remove a value from the cache")
            .field(FieldSpec::new("name", ""))
            .input(Socket::exec_input("exec"))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let key = field_key(ctx)?;
                if ctx.store_mut().remove(&key).is_none() {
                    tracing::debug!(%key, "nothing to remove");
                }
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::impure(FLUSH_CACHE, "Flush Cache", NodeCategory::Variable)
            .describe("Clear every variable and cache entry")
            .input(Socket::exec_input("exec"))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                ctx.store_mut().flush_globals();
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::impure(DUMP_CACHE, "Dump Cache", NodeCategory::Variable)
            .describe("Print the cache contents into the console")
            .input(Socket::exec_input("exec"))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let line = ctx.store().dump_line();
                ctx.host().print(&line);
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    Ok(())
}

fn field_key(ctx: &EvaluationContext<'_>) -> Result<StoreKey, NodeError> {
    let name = ctx.field_str("name");
    if name.is_empty() {
        return Err(NodeError::invalid("name", "variable name is empty"));
    }
    Ok(StoreKey::global(name))
}

fn input_key(ctx: &mut EvaluationContext<'_>) -> Result<StoreKey, NodeError> {
    let name = ctx.input_string("name")?;
    if name.is_empty() {
        return Err(NodeError::invalid("name", "cache name is empty"));
    }
    Ok(StoreKey::global(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::flow::FUNCTION;
    use crate::ops::harness::Harness;
    use crate::ops::utility::PRINT;
    use crate::value::Value;

    #[test]
    fn test_set_then_get_variable() {
        let mut h = Harness::new();
        let start = h.add(FUNCTION);
        let set = h.add_with(SET_VARIABLE, &[("name", Value::from("score"))]);
        let get = h.add_with(GET_VARIABLE, &[("name", Value::from("score"))]);
        let print = h.add(PRINT);
        let value = h.literal(42);
        h.link(start, "exec", set, "exec");
        h.link(value, "value", set, "value");
        h.link(set, "exec", print, "exec");
        h.link(get, "value", print, "value");

        let summary = h.run(start);
        assert_eq!(summary.executed, 3);
        assert_eq!(h.printed(), vec!["42"]);
        // Globals outlive the run
        assert_eq!(h.pull(get, "value").unwrap(), Value::Int(42));
    }

    #[test]
    fn test_missing_variable_is_none() {
        let mut h = Harness::new();
        let get = h.add_with(GET_VARIABLE, &[("name", Value::from("unset"))]);
        assert_eq!(h.pull(get, "value").unwrap(), Value::None);

        let unnamed = h.add(GET_VARIABLE);
        assert!(h.pull(unnamed, "value").is_err());
    }

    #[test]
    fn test_cache_by_computed_name() {
        let mut h = Harness::new();
        let set = h.add(SET_CACHE);
        let key = h.literal("slot");
        h.link(key, "value", set, "name");
        h.set_default(set, "value", "stored");
        h.run(set);

        let get = h.apply(GET_CACHE, &[("name", Value::from("slot"))], "value");
        assert_eq!(get.unwrap(), Value::from("stored"));

        let remove = h.add_with(REMOVE_CACHE, &[("name", Value::from("slot"))]);
        h.run(remove);
        assert!(h.engine.store().is_empty());
    }

    #[test]
    fn test_flush_and_dump() {
        let mut h = Harness::new();
        let first = h.add(SET_CACHE);
        let second = h.add(SET_CACHE);
        let dump = h.add(DUMP_CACHE);
        let flush = h.add(FLUSH_CACHE);
        let dump_again = h.add(DUMP_CACHE);
        h.set_default(first, "name", "a");
        h.set_default(first, "value", 1);
        h.set_default(second, "name", "b");
        h.set_default(second, "value", "x");
        h.link(first, "exec", second, "exec");
        h.link(second, "exec", dump, "exec");
        h.link(dump, "exec", flush, "exec");
        h.link(flush, "exec", dump_again, "exec");

        let summary = h.run(first);
        assert!(summary.is_clean());
        assert_eq!(h.printed(), vec!["{'a': 1, 'b': 'x'}", "{}"]);
    }

    #[test]
    fn test_flush_keeps_loop_scratch() {
        let mut h = Harness::new();
        let for_loop = h.add(crate::ops::flow::FOR_LOOP);
        let flush = h.add(FLUSH_CACHE);
        let print = h.add(PRINT);
        h.set_default(for_loop, "end", 2);
        h.link(for_loop, "loop", flush, "exec");
        h.link(flush, "exec", print, "exec");
        h.link(for_loop, "index", print, "value");

        h.run(for_loop);
        assert_eq!(h.printed(), vec!["0", "1"]);
    }
}
