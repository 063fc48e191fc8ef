// SPDX-License-Identifier: MIT OR Apache-2.0
//! String nodes. Non-string inputs are rendered to text first; indices
//! count characters, not bytes.

use crate::evaluation::NodeError;
use crate::node::{NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::Value;

/// Concatenate two strings
pub const APPEND: &str = "string.append";
/// Whether `match` occurs in `source`
pub const CONTAINS: &str = "string.contains";
/// Whether `source` starts with `match`
pub const STARTS_WITH: &str = "string.starts_with";
/// Whether `source` ends with `match`
pub const ENDS_WITH: &str = "string.ends_with";
/// Character index of `match`, -1 if absent
pub const FIND: &str = "string.find";
/// Character index of `match`, failing if absent
pub const INDEX_OF: &str = "string.index_of";
/// Non-overlapping occurrences of `match`
pub const COUNT: &str = "string.count";
/// Upper case
pub const TO_UPPER: &str = "string.to_upper";
/// Lower case
pub const TO_LOWER: &str = "string.to_lower";
/// First character upper case, the rest lower case
pub const CAPITALIZE: &str = "string.capitalize";
/// Caseless form for comparisons
pub const CASEFOLD: &str = "string.casefold";
/// Trim surrounding whitespace
pub const STRIP: &str = "string.strip";
/// Number of characters
pub const LENGTH: &str = "string.length";
/// Characters from `start` up to `end`
pub const SLICE: &str = "string.slice";
/// Characters before `start`
pub const SLICE_FROM_START: &str = "string.slice_from_start";
/// Characters from `end` onwards
pub const SLICE_FROM_END: &str = "string.slice_from_end";
/// Split on a separator into an array
pub const SPLIT: &str = "string.split";
/// Replace every occurrence of `match`
pub const REPLACE: &str = "string.replace";

fn text(name: &str) -> Socket {
    Socket::input(name, SocketType::Value).with_default("")
}

/// Register the string nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::pure(APPEND, "Append", NodeCategory::String)
            .describe("Append a string to another")
            .input(text("a"))
            .input(text("b"))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let a = ctx.input_string("a")?;
                let b = ctx.input_string("b")?;
                Ok(Value::String(a + &b))
            }),
    )?;

    // Matching
    let predicates: [(&str, &str, fn(&str, &str) -> bool); 3] = [
        (CONTAINS, "Contains", |source, pattern| source.contains(pattern)),
        (STARTS_WITH, "Starts With", |source, pattern| source.starts_with(pattern)),
        (ENDS_WITH, "Ends With", |source, pattern| source.ends_with(pattern)),
    ];
    for (id, name, predicate) in predicates {
        registry.register(
            NodeType::pure(id, name, NodeCategory::String)
                .input(text("source"))
                .input(text("match"))
                .output(Socket::output("result", SocketType::Value))
                .produce("result", move |ctx| {
                    let source = ctx.input_string("source")?;
                    let pattern = ctx.input_string("match")?;
                    Ok(Value::Bool(predicate(&source, &pattern)))
                }),
        )?;
    }

    registry.register(
        NodeType::pure(FIND, "Find", NodeCategory::String)
            .describe("Index of the first occurrence, -1 when absent")
            .input(text("source"))
            .input(text("match"))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                let pattern = ctx.input_string("match")?;
                let index = source
                    .find(&pattern)
                    .map_or(-1, |byte| source[..byte].chars().count() as i64);
                Ok(Value::Int(index))
            }),
    )?;

    registry.register(
        NodeType::pure(INDEX_OF, "Index Of", NodeCategory::String)
            .describe("Index of the first occurrence, failing when absent")
            .input(text("source"))
            .input(text("match"))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                let pattern = ctx.input_string("match")?;
                let byte = source
                    .find(&pattern)
                    .ok_or_else(|| NodeError::invalid("match", format!("'{pattern}' not found")))?;
                Ok(Value::Int(source[..byte].chars().count() as i64))
            }),
    )?;

    registry.register(
        NodeType::pure(COUNT, "Count", NodeCategory::String)
            .describe("Count the occurrences of a substring")
            .input(text("source"))
            .input(text("match"))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                let pattern = ctx.input_string("match")?;
                let count = if pattern.is_empty() {
                    source.chars().count() + 1
                } else {
                    source.matches(pattern.as_str()).count()
                };
                Ok(Value::Int(count as i64))
            }),
    )?;

    // Transforms
    let transforms: [(&str, &str, fn(&str) -> String); 5] = [
        (TO_UPPER, "To Upper", str::to_uppercase),
        (TO_LOWER, "To Lower", str::to_lowercase),
        (CAPITALIZE, "Capitalize", capitalize),
        (CASEFOLD, "Casefold", casefold),
        (STRIP, "Strip", |source| source.trim().to_string()),
    ];
    for (id, name, transform) in transforms {
        registry.register(
            NodeType::pure(id, name, NodeCategory::String)
                .input(text("source"))
                .output(Socket::output("result", SocketType::Value))
                .produce("result", move |ctx| {
                    Ok(Value::String(transform(&ctx.input_string("source")?)))
                }),
        )?;
    }

    registry.register(
        NodeType::pure(LENGTH, "Length", NodeCategory::String)
            .describe("Number of characters")
            .input(text("source"))
            .output(Socket::output("length", SocketType::Value))
            .produce("length", |ctx| {
                Ok(Value::Int(ctx.input_string("source")?.chars().count() as i64))
            }),
    )?;

    registry.register(
        NodeType::pure(SLICE, "Slice", NodeCategory::String)
            .describe("Characters from start up to end; negative positions count from the end")
            .input(text("source"))
            .input(Socket::input("start", SocketType::Value).with_default(0))
            .input(Socket::input("end", SocketType::Value))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                let start = ctx.input_int("start")?;
                let end = match ctx.input("end")? {
                    Value::None => None,
                    other => Some(other.to_int()?),
                };
                Ok(Value::String(slice(&source, start, end)))
            }),
    )?;

    registry.register(
        NodeType::pure(SLICE_FROM_START, "Slice From Start", NodeCategory::String)
            .describe("Characters before start")
            .input(text("source"))
            .input(Socket::input("start", SocketType::Value).with_default(0))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                Ok(Value::String(slice(&source, 0, Some(ctx.input_int("start")?))))
            }),
    )?;

    registry.register(
        NodeType::pure(SLICE_FROM_END, "Slice From End", NodeCategory::String)
            .describe("Characters from end onwards")
            .input(text("source"))
            .input(Socket::input("end", SocketType::Value).with_default(0))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                Ok(Value::String(slice(&source, ctx.input_int("end")?, None)))
            }),
    )?;

    registry.register(
        NodeType::pure(SPLIT, "Split", NodeCategory::String)
            .describe("Split a string; an empty separator splits on whitespace")
            .input(text("source"))
            .input(text("separator"))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| {
                let source = ctx.input_string("source")?;
                let separator = ctx.input_string("separator")?;
                let parts: Vec<Value> = if separator.is_empty() {
                    source.split_whitespace().map(Value::from).collect()
                } else {
                    source.split(separator.as_str()).map(Value::from).collect()
                };
                Ok(Value::Array(parts))
            }),
    )?;

    registry.register(
        NodeType::pure(REPLACE, "Replace", NodeCategory::String)
            .describe("Replace every occurrence of a substring")
            .input(text("source"))
            .input(text("match"))
            .input(text("replace"))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let source = ctx.input_string("source")?;
                let pattern = ctx.input_string("match")?;
                let replacement = ctx.input_string("replace")?;
                if pattern.is_empty() {
                    return Ok(Value::String(source));
                }
                Ok(Value::String(source.replace(&pattern, &replacement)))
            }),
    )?;

    Ok(())
}

fn capitalize(source: &str) -> String {
    let mut chars = source.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Lower case with the special foldings lowercasing misses
fn casefold(source: &str) -> String {
    source
        .chars()
        .flat_map(char::to_lowercase)
        .fold(String::with_capacity(source.len()), |mut folded, c| {
            match c {
                'ß' => folded.push_str("ss"),
                'ς' => folded.push('σ'),
                other => folded.push(other),
            }
            folded
        })
}

/// Character slice with clamped, possibly negative bounds
fn slice(source: &str, start: i64, end: Option<i64>) -> String {
    let len = source.chars().count() as i64;
    let clamp = |index: i64| if index < 0 { (index + len).max(0) } else { index.min(len) };
    let start = clamp(start);
    let end = end.map_or(len, clamp);
    if end <= start {
        return String::new();
    }
    source
        .chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect()
}
