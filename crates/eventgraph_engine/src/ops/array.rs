// SPDX-License-Identifier: MIT OR Apache-2.0
//! Array nodes.
//!
//! Arrays are values: every node returns a new array and leaves its input
//! untouched, so the same upstream array can feed several consumers.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::{Value, ValueError};
use std::cmp::Ordering;

/// Collect linked items into an array
pub const MAKE: &str = "array.make";
/// Concatenate two arrays
pub const MERGE: &str = "array.merge";
/// Add an item at the end
pub const APPEND: &str = "array.append";
/// Insert an item at an index
pub const INSERT: &str = "array.insert";
/// Drop the last item
pub const POP: &str = "array.pop";
/// Drop the first occurrence of an item
pub const REMOVE: &str = "array.remove";
/// Empty array
pub const CLEAR: &str = "array.clear";
/// Item at an index
pub const GET: &str = "array.get";
/// Replace the item at an index
pub const SET: &str = "array.set";
/// Index of the first occurrence of an item
pub const INDEX: &str = "array.index";
/// Occurrences of an item
pub const COUNT: &str = "array.count";
/// Number of items
pub const LENGTH: &str = "array.length";
/// Items in reverse order
pub const REVERSE: &str = "array.reverse";
/// Items in ascending or descending order
pub const SORT: &str = "array.sort";

/// Maximum links into the `item` socket of Make Array
pub const MAKE_LIMIT: usize = 100;

/// Register the array nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::pure(MAKE, "Make Array", NodeCategory::Array)
            .describe("Make a new array from the linked items")
            .input(Socket::fan_in("item", SocketType::Value, MAKE_LIMIT))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| Ok(Value::Array(ctx.inputs("item")?))),
    )?;

    registry.register(
        NodeType::pure(MERGE, "Merge", NodeCategory::Array)
            .describe("Merge two arrays")
            .input(Socket::input("a", SocketType::Array))
            .input(Socket::input("b", SocketType::Array))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("a")?;
                items.extend(ctx.input_items("b")?);
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        with_item(NodeType::pure(APPEND, "Append", NodeCategory::Array))
            .describe("Append an item to an array")
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("array")?;
                items.push(ctx.input("item")?);
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        with_item(NodeType::pure(INSERT, "Insert", NodeCategory::Array))
            .describe("Insert an item in an array at an index")
            .input(Socket::input("index", SocketType::Value).with_default(0))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("array")?;
                let item = ctx.input("item")?;
                let index = insert_position(ctx.input_int("index")?, items.len());
                items.insert(index, item);
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        NodeType::pure(POP, "Pop", NodeCategory::Array)
            .describe("Remove the last item of an array")
            .input(Socket::input("array", SocketType::Array))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("array")?;
                if items.pop().is_none() {
                    return Err(NodeError::invalid("array", "pop from empty array"));
                }
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        with_item(NodeType::pure(REMOVE, "Remove", NodeCategory::Array))
            .describe("Remove the first occurrence of an item")
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("array")?;
                let item = ctx.input("item")?;
                let position = items
                    .iter()
                    .position(|v| *v == item)
                    .ok_or_else(|| NodeError::invalid("item", format!("{item} is not in the array")))?;
                items.remove(position);
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        NodeType::pure(CLEAR, "Clear", NodeCategory::Array)
            .describe("Clear an array")
            .input(Socket::input("array", SocketType::Array))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |_| Ok(Value::Array(Vec::new()))),
    )?;

    // Indexing
    registry.register(
        NodeType::pure(GET, "Get", NodeCategory::Array)
            .describe("Get the item at an index; negative indices count from the end")
            .input(Socket::input("array", SocketType::Array))
            .input(Socket::input("index", SocketType::Value).with_default(0))
            .output(Socket::output("item", SocketType::Value))
            .produce("item", |ctx| {
                let mut items = ctx.input_items("array")?;
                let index = Value::normalize_index(ctx.input_int("index")?, items.len())?;
                Ok(items.swap_remove(index))
            }),
    )?;

    registry.register(
        with_item(NodeType::pure(SET, "Set", NodeCategory::Array))
            .describe("Replace the item at an index if it exists")
            .input(Socket::input("index", SocketType::Value).with_default(0))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("array")?;
                let item = ctx.input("item")?;
                let index = ctx.input_int("index")?;
                match Value::normalize_index(index, items.len()) {
                    Ok(i) => items[i] = item,
                    Err(_) => tracing::debug!(index, len = items.len(), "set index out of range, unchanged"),
                }
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        with_item(NodeType::pure(INDEX, "Index", NodeCategory::Array))
            .describe("Index of the first occurrence of an item")
            .output(Socket::output("index", SocketType::Value))
            .produce("index", |ctx| {
                let items = ctx.input_items("array")?;
                let item = ctx.input("item")?;
                let position = items
                    .iter()
                    .position(|v| *v == item)
                    .ok_or_else(|| NodeError::invalid("item", format!("{item} is not in the array")))?;
                Ok(Value::Int(position as i64))
            }),
    )?;

    registry.register(
        with_item(NodeType::pure(COUNT, "Count", NodeCategory::Array))
            .describe("Count the occurrences of an item")
            .output(Socket::output("count", SocketType::Value))
            .produce("count", |ctx| {
                let items = ctx.input_items("array")?;
                let item = ctx.input("item")?;
                Ok(Value::Int(items.iter().filter(|v| **v == item).count() as i64))
            }),
    )?;

    registry.register(
        NodeType::pure(LENGTH, "Length", NodeCategory::Array)
            .describe("Get the length of an array")
            .input(Socket::input("array", SocketType::Array))
            .output(Socket::output("length", SocketType::Value))
            .produce("length", |ctx| Ok(Value::Int(ctx.input_items("array")?.len() as i64))),
    )?;

    // Ordering
    registry.register(
        NodeType::pure(REVERSE, "Reverse", NodeCategory::Array)
            .describe("Reverse an array")
            .input(Socket::input("array", SocketType::Array))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let mut items = ctx.input_items("array")?;
                items.reverse();
                Ok(Value::Array(items))
            }),
    )?;

    registry.register(
        NodeType::pure(SORT, "Sort", NodeCategory::Array)
            .describe("Sort an array")
            .field(FieldSpec::new("descending", false))
            .input(Socket::input("array", SocketType::Array))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let items = ctx.input_items("array")?;
                let descending = ctx.field("descending").truthy();
                Ok(Value::Array(sort_items(items, descending)?))
            }),
    )?;

    Ok(())
}

/// Add the `array` and `item` inputs shared by most array nodes
fn with_item(node_type: NodeType) -> NodeType {
    node_type
        .input(Socket::input("array", SocketType::Array))
        .input(Socket::input("item", SocketType::Value))
}

/// Clamp an insertion index the way list insertion does
fn insert_position(index: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if index < 0 { (index + len).max(0) } else { index.min(len) };
    resolved as usize
}

/// Stable sort in either direction; items must be mutually comparable
pub fn sort_items(mut items: Vec<Value>, descending: bool) -> Result<Vec<Value>, NodeError> {
    let mut mismatch: Option<ValueError> = None;
    items.sort_by(|a, b| {
        let ordering = a.partial_order(b).unwrap_or_else(|| {
            mismatch.get_or_insert(ValueError::TypeMismatch {
                op: "sort",
                left: a.type_name(),
                right: b.type_name(),
            });
            Ordering::Equal
        });
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
    match mismatch {
        Some(err) => Err(err.into()),
        None => Ok(items),
    }
}

/// Read an input holding an array, used by the cast nodes as well
pub(crate) fn input_array(ctx: &mut EvaluationContext<'_>, name: &str) -> Result<Vec<Value>, NodeError> {
    match ctx.input(name)? {
        Value::None => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Set(items) => Ok(items.into_iter().collect()),
        other => Err(NodeError::invalid(
            name,
            format!("expected an array, got {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::ops::harness::Harness;

    fn array(values: &[i64]) -> Value {
        Value::Array(values.iter().map(|v| Value::Int(*v)).collect())
    }

    fn make(h: &mut Harness, values: &[i64]) -> NodeId {
        let node = h.add(MAKE);
        for value in values {
            let literal = h.literal(*value);
            h.link(literal, "value", node, "item");
        }
        node
    }

    #[test]
    fn test_make_array_in_link_order() {
        let mut h = Harness::new();
        let node = make(&mut h, &[3, 1, 2]);
        assert_eq!(h.pull(node, "array").unwrap(), array(&[3, 1, 2]));

        let empty = h.add(MAKE);
        assert_eq!(h.pull(empty, "array").unwrap(), array(&[]));
    }

    #[test]
    fn test_make_array_limit() {
        let mut h = Harness::new();
        let node = make(&mut h, &[0; MAKE_LIMIT]);
        let extra = h.literal(1);
        assert!(h.graph().link(extra, "value", node, "item").is_err());
    }

    #[test]
    fn test_inputs_left_untouched() {
        let mut h = Harness::new();
        let source = make(&mut h, &[1, 2]);
        let append = h.add(APPEND);
        let length = h.add(LENGTH);
        h.link(source, "array", append, "array");
        h.set_default(append, "item", 3);
        h.link(source, "array", length, "array");

        assert_eq!(h.pull(append, "array").unwrap(), array(&[1, 2, 3]));
        assert_eq!(h.pull(length, "length").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_edit_operations() {
        let mut h = Harness::new();
        let base = array(&[1, 2, 3]);
        let merged = h.apply(MERGE, &[("a", base.clone()), ("b", array(&[4]))], "array");
        assert_eq!(merged.unwrap(), array(&[1, 2, 3, 4]));

        let inserted = h.apply(INSERT, &[("array", base.clone()), ("item", Value::Int(9)), ("index", Value::Int(1))], "array");
        assert_eq!(inserted.unwrap(), array(&[1, 9, 2, 3]));

        let popped = h.apply(POP, &[("array", base.clone())], "array");
        assert_eq!(popped.unwrap(), array(&[1, 2]));
        assert!(h.apply(POP, &[], "array").is_err());

        let removed = h.apply(REMOVE, &[("array", base.clone()), ("item", Value::Int(2))], "array");
        assert_eq!(removed.unwrap(), array(&[1, 3]));
        assert!(h.apply(REMOVE, &[("array", base.clone()), ("item", Value::Int(7))], "array").is_err());

        let cleared = h.apply(CLEAR, &[("array", base)], "array");
        assert_eq!(cleared.unwrap(), array(&[]));
    }

    #[test]
    fn test_indexing() {
        let mut h = Harness::new();
        let base = array(&[5, 6, 7, 6]);
        let last = h.apply(GET, &[("array", base.clone()), ("index", Value::Int(-1))], "item");
        assert_eq!(last.unwrap(), Value::Int(6));
        assert!(h.apply(GET, &[("array", base.clone()), ("index", Value::Int(4))], "item").is_err());

        let set = h.apply(SET, &[("array", base.clone()), ("item", Value::Int(0)), ("index", Value::Int(1))], "array");
        assert_eq!(set.unwrap(), array(&[5, 0, 7, 6]));
        let unchanged = h.apply(SET, &[("array", base.clone()), ("item", Value::Int(0)), ("index", Value::Int(9))], "array");
        assert_eq!(unchanged.unwrap(), base);

        let index = h.apply(INDEX, &[("array", base.clone()), ("item", Value::Int(6))], "index");
        assert_eq!(index.unwrap(), Value::Int(1));
        let count = h.apply(COUNT, &[("array", base), ("item", Value::Int(6))], "count");
        assert_eq!(count.unwrap(), Value::Int(2));
    }

    #[test]
    fn test_sort_and_reverse() {
        let mut h = Harness::new();
        let source = make(&mut h, &[3, 1, 2]);
        let ascending = h.add(SORT);
        let descending = h.add_with(SORT, &[("descending", Value::Bool(true))]);
        let reverse = h.add(REVERSE);
        h.link(source, "array", ascending, "array");
        h.link(source, "array", descending, "array");
        h.link(source, "array", reverse, "array");

        assert_eq!(h.pull(ascending, "array").unwrap(), array(&[1, 2, 3]));
        assert_eq!(h.pull(descending, "array").unwrap(), array(&[3, 2, 1]));
        assert_eq!(h.pull(reverse, "array").unwrap(), array(&[2, 1, 3]));
    }

    #[test]
    fn test_sort_mixed_types_fails() {
        let items = vec![Value::Int(1), Value::from("a")];
        assert!(sort_items(items, false).is_err());
        let mixed = vec![Value::Float(2.5), Value::Int(1)];
        assert_eq!(sort_items(mixed, false).unwrap(), vec![Value::Int(1), Value::Float(2.5)]);
    }

    #[test]
    fn test_sort_descending_keeps_equal_items_in_order() {
        let items = vec![Value::Float(1.0), Value::Int(2), Value::Int(1)];
        let sorted = sort_items(items, true).unwrap();
        assert_eq!(Value::Array(sorted).to_string(), "[2, 1.0, 1]");
    }
}
