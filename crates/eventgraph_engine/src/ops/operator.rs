// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic, comparison and logic operators.

use crate::evaluation::NodeError;
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::{CompareOp, Value};

/// `a <op> b` for + - * /
pub const ARITHMETIC: &str = "operator.arithmetic";
/// `a <op> b` for comparisons
pub const COMPARE: &str = "operator.compare";
/// Logical and
pub const AND: &str = "operator.and";
/// Logical or
pub const OR: &str = "operator.or";
/// Logical not
pub const NOT: &str = "operator.not";
/// `a is b` / `a is not b`
pub const IDENTITY: &str = "operator.identity";
/// `a in b` / `a not in b`
pub const MEMBERSHIP: &str = "operator.membership";
/// Whether a value is None
pub const IS_NONE: &str = "operator.is_none";

const ARITHMETIC_SYMBOLS: [&str; 4] = ["+", "-", "*", "/"];
const IDENTITY_SYMBOLS: [&str; 2] = ["is", "is not"];
const MEMBERSHIP_SYMBOLS: [&str; 2] = ["in", "not in"];

/// Register the operator nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::pure(ARITHMETIC, "Arithmetic", NodeCategory::Operator)
            .describe("Add, subtract, multiply or divide two values")
            .field(FieldSpec::choice("operator", &ARITHMETIC_SYMBOLS))
            .input(Socket::input("a", SocketType::Value).with_default(0))
            .input(Socket::input("b", SocketType::Value).with_default(0))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let a = ctx.input("a")?;
                let b = ctx.input("b")?;
                let result = match ctx.field_str("operator").as_str() {
                    "+" => a.add(&b)?,
                    "-" => a.sub(&b)?,
                    "*" => a.mul(&b)?,
                    "/" => a.div(&b)?,
                    other => return Err(NodeError::invalid("operator", format!("unknown operator {other}"))),
                };
                Ok(result)
            }),
    )?;

    registry.register(
        NodeType::pure(COMPARE, "Compare", NodeCategory::Operator)
            .describe("Compare two values")
            .field(FieldSpec::choice("operator", &CompareOp::SYMBOLS))
            .input(Socket::input("a", SocketType::Value).with_default(0))
            .input(Socket::input("b", SocketType::Value).with_default(0))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let symbol = ctx.field_str("operator");
                let op = CompareOp::from_symbol(&symbol)
                    .ok_or_else(|| NodeError::invalid("operator", format!("unknown operator {symbol}")))?;
                let a = ctx.input("a")?;
                let b = ctx.input("b")?;
                Ok(Value::Bool(a.compare(op, &b)?))
            }),
    )?;

    // Logic
    registry.register(
        NodeType::pure(AND, "And", NodeCategory::Operator)
            .input(Socket::input("a", SocketType::Value).with_default(false))
            .input(Socket::input("b", SocketType::Value).with_default(false))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                Ok(Value::Bool(ctx.input_bool("a")? && ctx.input_bool("b")?))
            }),
    )?;

    registry.register(
        NodeType::pure(OR, "Or", NodeCategory::Operator)
            .input(Socket::input("a", SocketType::Value).with_default(false))
            .input(Socket::input("b", SocketType::Value).with_default(false))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                Ok(Value::Bool(ctx.input_bool("a")? || ctx.input_bool("b")?))
            }),
    )?;

    registry.register(
        NodeType::pure(NOT, "Not", NodeCategory::Operator)
            .input(Socket::input("a", SocketType::Value).with_default(false))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| Ok(Value::Bool(!ctx.input_bool("a")?))),
    )?;

    // Predicates
    registry.register(
        NodeType::pure(IDENTITY, "Identity Comparison", NodeCategory::Operator)
            .describe("Whether two values are the same type and value")
            .field(FieldSpec::choice("operator", &IDENTITY_SYMBOLS))
            .input(Socket::input("a", SocketType::Value))
            .input(Socket::input("b", SocketType::Value))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let a = ctx.input("a")?;
                let b = ctx.input("b")?;
                let same = a.is_identical(&b);
                Ok(Value::Bool(if ctx.field_str("operator") == "is not" { !same } else { same }))
            }),
    )?;

    registry.register(
        NodeType::pure(MEMBERSHIP, "Membership Check", NodeCategory::Operator)
            .describe("Whether a is contained in b")
            .field(FieldSpec::choice("operator", &MEMBERSHIP_SYMBOLS))
            .input(Socket::input("a", SocketType::Value))
            .input(Socket::input("b", SocketType::Value))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let a = ctx.input("a")?;
                let b = ctx.input("b")?;
                let found = b.contains(&a)?;
                Ok(Value::Bool(if ctx.field_str("operator") == "not in" { !found } else { found }))
            }),
    )?;

    registry.register(
        NodeType::pure(IS_NONE, "Is None", NodeCategory::Operator)
            .input(Socket::input("a", SocketType::Value))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| Ok(Value::Bool(ctx.input("a")?.is_none()))),
    )?;

    Ok(())
}
