// SPDX-License-Identifier: MIT OR Apache-2.0
//! String-keyed map nodes.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::node::{NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::Value;
use indexmap::IndexMap;

/// Map with a single entry
pub const MAKE: &str = "map.make";
/// Insert or replace an entry
pub const SET: &str = "map.set";
/// Value under a key
pub const GET: &str = "map.get";
/// Remove an entry
pub const POP: &str = "map.pop";
/// Keys in insertion order
pub const KEYS: &str = "map.keys";
/// Values in insertion order
pub const VALUES: &str = "map.values";
/// `[key, value]` pairs in insertion order
pub const ITEMS: &str = "map.items";
/// Merge the linked maps, later links winning
pub const MERGE: &str = "map.merge";

/// Register the map nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::pure(MAKE, "Make Map", NodeCategory::Map)
            .describe("Make a new map")
            .input(Socket::input("key", SocketType::Value).with_default(""))
            .input(Socket::input("value", SocketType::Value))
            .output(Socket::output("map", SocketType::Map))
            .produce("map", |ctx| {
                let key = ctx.input_string("key")?;
                let value = ctx.input("value")?;
                Ok(Value::Map(IndexMap::from([(key, value)])))
            }),
    )?;

    registry.register(
        NodeType::pure(SET, "Set", NodeCategory::Map)
            .describe("Set or update a value in a map by key")
            .input(Socket::input("map", SocketType::Map))
            .input(Socket::input("key", SocketType::Value).with_default(""))
            .input(Socket::input("value", SocketType::Value))
            .output(Socket::output("map", SocketType::Map))
            .produce("map", |ctx| {
                let mut map = input_map(ctx, "map")?;
                let key = ctx.input_string("key")?;
                map.insert(key, ctx.input("value")?);
                Ok(Value::Map(map))
            }),
    )?;

    registry.register(
        NodeType::pure(GET, "Get", NodeCategory::Map)
            .describe("Get a value from a map by key, None if absent")
            .input(Socket::input("map", SocketType::Map))
            .input(Socket::input("key", SocketType::Value).with_default(""))
            .output(Socket::output("value", SocketType::Value))
            .produce("value", |ctx| {
                let mut map = input_map(ctx, "map")?;
                let key = ctx.input_string("key")?;
                Ok(map.swap_remove(&key).unwrap_or_default())
            }),
    )?;

    registry.register(
        NodeType::pure(POP, "Pop", NodeCategory::Map)
            .describe("Remove a value from a map by key")
            .input(Socket::input("map", SocketType::Map))
            .input(Socket::input("key", SocketType::Value).with_default(""))
            .output(Socket::output("map", SocketType::Map))
            .produce("map", |ctx| {
                let mut map = input_map(ctx, "map")?;
                let key = ctx.input_string("key")?;
                if map.shift_remove(&key).is_none() {
                    return Err(NodeError::invalid("key", format!("no entry '{key}'")));
                }
                Ok(Value::Map(map))
            }),
    )?;

    // Views
    registry.register(
        NodeType::pure(KEYS, "Keys", NodeCategory::Map)
            .describe("Get an array of map keys")
            .input(Socket::input("map", SocketType::Map))
            .output(Socket::output("keys", SocketType::Array))
            .produce("keys", |ctx| {
                let map = input_map(ctx, "map")?;
                Ok(Value::Array(map.into_keys().map(Value::String).collect()))
            }),
    )?;

    registry.register(
        NodeType::pure(VALUES, "Values", NodeCategory::Map)
            .describe("Get an array of map values")
            .input(Socket::input("map", SocketType::Map))
            .output(Socket::output("values", SocketType::Array))
            .produce("values", |ctx| {
                let map = input_map(ctx, "map")?;
                Ok(Value::Array(map.into_values().collect()))
            }),
    )?;

    registry.register(
        NodeType::pure(ITEMS, "Items", NodeCategory::Map)
            .describe("Get an array of [key, value] pairs")
            .input(Socket::input("map", SocketType::Map))
            .output(Socket::output("items", SocketType::Array))
            .produce("items", |ctx| {
                let map = input_map(ctx, "map")?;
                let items = map
                    .into_iter()
                    .map(|(key, value)| Value::Array(vec![Value::String(key), value]))
                    .collect();
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        NodeType::pure(MERGE, "Merge", NodeCategory::Map)
            .describe("Merge multiple maps into one")
            .input(Socket::fan_in("maps", SocketType::Map, crate::ops::array::MAKE_LIMIT))
            .output(Socket::output("map", SocketType::Map))
            .produce("map", |ctx| {
                let mut merged = IndexMap::new();
                for value in ctx.inputs("maps")? {
                    match value {
                        Value::Map(map) => merged.extend(map),
                        Value::None => {}
                        other => {
                            return Err(NodeError::invalid(
                                "maps",
                                format!("expected a map, got {}", other.type_name()),
                            ))
                        }
                    }
                }
                Ok(Value::Map(merged))
            }),
    )?;

    Ok(())
}

fn input_map(ctx: &mut EvaluationContext<'_>, name: &str) -> Result<IndexMap<String, Value>, NodeError> {
    match ctx.input(name)? {
        Value::None => Ok(IndexMap::new()),
        Value::Map(map) => Ok(map),
        other => Err(NodeError::invalid(
            name,
            format!("expected a map, got {}", other.type_name()),
        )),
    }
}
