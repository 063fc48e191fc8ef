// SPDX-License-Identifier: MIT OR Apache-2.0
//! Set nodes. Sets keep insertion order.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::node::{NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::Value;
use indexmap::IndexSet;

/// Collect linked items into a set
pub const MAKE: &str = "set.make";
/// Add an item
pub const ADD: &str = "set.add";
/// Remove an item if present
pub const DISCARD: &str = "set.discard";
/// Items in either set
pub const UNION: &str = "set.union";
/// Items in both sets
pub const INTERSECTION: &str = "set.intersection";
/// Items of `a` not in `b`
pub const DIFFERENCE: &str = "set.difference";
/// Items in exactly one of the sets
pub const SYMMETRIC_DIFFERENCE: &str = "set.symmetric_difference";
/// Whether every item of `a` is in `b`
pub const IS_SUBSET: &str = "set.is_subset";
/// Whether an item is in the set
pub const CONTAINS: &str = "set.contains";
/// Number of items
pub const LENGTH: &str = "set.length";

type Combine = fn(&IndexSet<Value>, &IndexSet<Value>) -> IndexSet<Value>;

/// Register the set nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::pure(MAKE, "Make Set", NodeCategory::Set)
            .describe("Make a new set from the linked items")
            .input(Socket::fan_in("item", SocketType::Value, crate::ops::array::MAKE_LIMIT))
            .output(Socket::output("set", SocketType::Set))
            .produce("set", |ctx| Ok(Value::Set(ctx.inputs("item")?.into_iter().collect()))),
    )?;

    registry.register(
        NodeType::pure(ADD, "Add", NodeCategory::Set)
            .describe("Add an item to a set")
            .input(Socket::input("set", SocketType::Set))
            .input(Socket::input("item", SocketType::Value))
            .output(Socket::output("set", SocketType::Set))
            .produce("set", |ctx| {
                let mut items = input_set(ctx, "set")?;
                items.insert(ctx.input("item")?);
                Ok(Value::Set(items))
            }),
    )?;

    registry.register(
        NodeType::pure(DISCARD, "Discard", NodeCategory::Set)
            .describe("Remove an item from a set")
            .input(Socket::input("set", SocketType::Set))
            .input(Socket::input("item", SocketType::Value))
            .output(Socket::output("set", SocketType::Set))
            .produce("set", |ctx| {
                let mut items = input_set(ctx, "set")?;
                items.shift_remove(&ctx.input("item")?);
                Ok(Value::Set(items))
            }),
    )?;

    // Set algebra
    let combinators: [(&str, &str, &str, Combine); 4] = [
        (UNION, "Union", "Union between two sets", |a, b| a.union(b).cloned().collect()),
        (INTERSECTION, "Intersection", "Intersection between two sets", |a, b| {
            a.intersection(b).cloned().collect()
        }),
        (DIFFERENCE, "Difference", "Difference between two sets", |a, b| {
            a.difference(b).cloned().collect()
        }),
        (SYMMETRIC_DIFFERENCE, "Symmetric Difference", "Items in exactly one of two sets", |a, b| {
            a.symmetric_difference(b).cloned().collect()
        }),
    ];
    for (id, name, description, combine) in combinators {
        registry.register(
            NodeType::pure(id, name, NodeCategory::Set)
                .describe(description)
                .input(Socket::input("a", SocketType::Set))
                .input(Socket::input("b", SocketType::Set))
                .output(Socket::output("set", SocketType::Set))
                .produce("set", move |ctx| {
                    let a = input_set(ctx, "a")?;
                    let b = input_set(ctx, "b")?;
                    Ok(Value::Set(combine(&a, &b)))
                }),
        )?;
    }

    registry.register(
        NodeType::pure(IS_SUBSET, "Is Subset", NodeCategory::Set)
            .describe("Check if a set is a subset of another set")
            .input(Socket::input("a", SocketType::Set))
            .input(Socket::input("b", SocketType::Set))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let a = input_set(ctx, "a")?;
                let b = input_set(ctx, "b")?;
                Ok(Value::Bool(a.is_subset(&b)))
            }),
    )?;

    registry.register(
        NodeType::pure(CONTAINS, "Contains", NodeCategory::Set)
            .describe("Check if a set holds an item")
            .input(Socket::input("set", SocketType::Set))
            .input(Socket::input("item", SocketType::Value))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let items = input_set(ctx, "set")?;
                Ok(Value::Bool(items.contains(&ctx.input("item")?)))
            }),
    )?;

    registry.register(
        NodeType::pure(LENGTH, "Length", NodeCategory::Set)
            .describe("Get the length of a set")
            .input(Socket::input("set", SocketType::Set))
            .output(Socket::output("length", SocketType::Value))
            .produce("length", |ctx| Ok(Value::Int(input_set(ctx, "set")?.len() as i64))),
    )?;

    Ok(())
}

/// Read an input holding a set; unset is empty
pub(crate) fn input_set(ctx: &mut EvaluationContext<'_>, name: &str) -> Result<IndexSet<Value>, NodeError> {
    match ctx.input(name)? {
        Value::None => Ok(IndexSet::new()),
        Value::Set(items) => Ok(items),
        Value::Array(items) => Ok(items.into_iter().collect()),
        other => Err(NodeError::invalid(
            name,
            format!("expected a set, got {}", other.type_name()),
        )),
    }
}
