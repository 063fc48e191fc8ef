// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant values set on the node.

use crate::evaluation::NodeError;
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::Value;

/// Integer constant
pub const INTEGER: &str = "literal.integer";
/// Float constant
pub const FLOAT: &str = "literal.float";
/// String constant
pub const STRING: &str = "literal.string";
/// Boolean constant
pub const BOOLEAN: &str = "literal.boolean";

/// Register the literal nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    let literals: [(&str, &str, Value); 4] = [
        (INTEGER, "Integer", Value::Int(0)),
        (FLOAT, "Float", Value::Float(0.0)),
        (STRING, "String", Value::from("")),
        (BOOLEAN, "Boolean", Value::Bool(false)),
    ];

    for (id, name, default) in literals {
        registry.register(
            NodeType::pure(id, name, NodeCategory::Literal)
                .describe("Output a constant value")
                .field(FieldSpec::new("value", default.clone()))
                .output(Socket::output("value", SocketType::Value))
                .produce("value", move |ctx| coerce(&default, ctx.field("value"))),
        )?;
    }
    Ok(())
}

/// Convert a stored field to the literal's own type
fn coerce(kind: &Value, value: Value) -> Result<Value, NodeError> {
    Ok(match kind {
        Value::Int(_) => Value::Int(value.to_int()?),
        Value::Float(_) => Value::Float(value.to_float()?),
        Value::Bool(_) => Value::Bool(value.truthy()),
        _ => match value {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        },
    })
}
