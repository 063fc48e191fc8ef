// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type conversions.

use crate::node::{NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::ops::array::input_array;
use crate::ops::set::input_set;
use crate::socket::{Socket, SocketType};
use crate::value::{Value, ValueError};

/// Convert to an integer, truncating floats
pub const TO_INTEGER: &str = "cast.to_integer";
/// Convert to a float
pub const TO_FLOAT: &str = "cast.to_float";
/// Render as text
pub const TO_STRING: &str = "cast.to_string";
/// Truthiness of a value
pub const TO_BOOLEAN: &str = "cast.to_boolean";
/// Array items as a set
pub const ARRAY_TO_SET: &str = "cast.array_to_set";
/// Set items as an array
pub const SET_TO_ARRAY: &str = "cast.set_to_array";

/// Register the cast nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    let scalars: [(&str, &str, fn(Value) -> Result<Value, ValueError>); 4] = [
        (TO_INTEGER, "To Integer", |v| v.to_int().map(Value::Int)),
        (TO_FLOAT, "To Float", |v| v.to_float().map(Value::Float)),
        (TO_STRING, "To String", |v| {
            Ok(match v {
                Value::String(s) => Value::String(s),
                other => Value::String(other.to_string()),
            })
        }),
        (TO_BOOLEAN, "To Boolean", |v| Ok(Value::Bool(v.truthy()))),
    ];
    for (id, name, convert) in scalars {
        registry.register(
            NodeType::pure(id, name, NodeCategory::Cast)
                .input(Socket::input("value", SocketType::Value))
                .output(Socket::output("result", SocketType::Value))
                .produce("result", move |ctx| Ok(convert(ctx.input("value")?)?)),
        )?;
    }

    registry.register(
        NodeType::pure(ARRAY_TO_SET, "Array To Set", NodeCategory::Cast)
            .describe("Convert an array to a set, dropping duplicates")
            .input(Socket::input("array", SocketType::Array))
            .output(Socket::output("set", SocketType::Set))
            .produce("set", |ctx| Ok(Value::Set(input_array(ctx, "array")?.into_iter().collect()))),
    )?;

    registry.register(
        NodeType::pure(SET_TO_ARRAY, "Set To Array", NodeCategory::Cast)
            .describe("Convert a set to an array")
            .input(Socket::input("set", SocketType::Set))
            .output(Socket::output("array", SocketType::Array))
            .produce("array", |ctx| Ok(Value::Array(input_set(ctx, "set")?.into_iter().collect()))),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::harness::Harness;

    fn cast(h: &mut Harness, type_id: &str, value: impl Into<Value>) -> Result<Value, crate::evaluation::NodeError> {
        h.apply(type_id, &[("value", value.into())], "result")
    }

    #[test]
    fn test_scalar_casts() {
        let mut h = Harness::new();
        assert_eq!(cast(&mut h, TO_INTEGER, 3.9).unwrap(), Value::Int(3));
        assert_eq!(cast(&mut h, TO_INTEGER, " 12 ").unwrap(), Value::Int(12));
        assert!(cast(&mut h, TO_INTEGER, "twelve").is_err());
        assert_eq!(cast(&mut h, TO_FLOAT, 2).unwrap().to_string(), "2.0");
        assert_eq!(cast(&mut h, TO_STRING, 2.5).unwrap(), Value::from("2.5"));
        assert_eq!(cast(&mut h, TO_STRING, Value::None).unwrap(), Value::from("None"));
        assert_eq!(cast(&mut h, TO_BOOLEAN, "").unwrap(), Value::Bool(false));
        assert_eq!(cast(&mut h, TO_BOOLEAN, 0.1).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_collection_casts() {
        let mut h = Harness::new();
        let items = Value::Array(vec![Value::Int(2), Value::Int(1), Value::Int(2)]);
        let set = h.apply(ARRAY_TO_SET, &[("array", items)], "set").unwrap();
        assert_eq!(set.to_string(), "{2, 1}");

        let array = h.apply(SET_TO_ARRAY, &[("set", set)], "array").unwrap();
        assert_eq!(array.to_string(), "[2, 1]");
        assert!(h.apply(ARRAY_TO_SET, &[("array", Value::Int(1))], "set").is_err());
    }
}
