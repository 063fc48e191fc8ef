// SPDX-License-Identifier: MIT OR Apache-2.0
//! Console output, delays and math functions.

use crate::evaluation::{EvaluationContext, NodeError};
use crate::node::{FieldSpec, NodeCategory, NodeRegistry, NodeType, RegistryError};
use crate::socket::{Socket, SocketType};
use crate::value::{Value, ValueError};
use std::time::Duration;

/// Print a value to the console
pub const PRINT: &str = "utility.print";
/// Block before continuing
pub const SYNC_DELAY: &str = "utility.sync_delay";
/// Continue later without blocking
pub const ASYNC_DELAY: &str = "utility.async_delay";
/// Single and double argument math functions
pub const MATH: &str = "utility.math";

/// Math functions of one float argument
const SINGLE_ARG: &[&str] = &[
    "acos", "acosh", "asin", "asinh", "atan", "atanh", "ceil", "cos", "cosh", "degrees", "erf",
    "erfc", "exp", "expm1", "fabs", "floor", "frexp", "gamma", "lgamma", "log", "log10", "log1p",
    "log2", "radians", "sin", "sinh", "sqrt", "tan", "tanh", "trunc",
];

/// Math functions of two float arguments (`ldexp` takes an integer exponent)
const DOUBLE_ARG: &[&str] = &["atan2", "copysign", "fmod", "hypot", "ldexp", "pow", "remainder"];

/// Math functions over a whole array
const ARRAY_ARG: &[&str] = &["prod"];

/// Math functions over integers
const INTEGER_ARG: &[&str] = &["factorial", "gcd", "comb", "perm"];

/// Register the utility nodes
pub fn register(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
    registry.register(
        NodeType::impure(PRINT, "Print", NodeCategory::Utility)
            .describe("Print a value into the console")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("value", SocketType::Value))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let line = ctx.input_string("value")?;
                ctx.host().print(&line);
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    // Delays
    registry.register(
        NodeType::impure(SYNC_DELAY, "Sync Delay", NodeCategory::Utility)
            .describe("Block for a time before the next execution")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("time", SocketType::Value).with_default(5.0))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let delay = delay(ctx)?;
                ctx.host().sleep(delay);
                ctx.trigger("exec");
                Ok(())
            }),
    )?;

    registry.register(
        NodeType::impure(ASYNC_DELAY, "Async Delay", NodeCategory::Utility)
            .describe("Schedule the next execution after a time, without blocking")
            .input(Socket::exec_input("exec"))
            .input(Socket::input("time", SocketType::Value).with_default(5.0))
            .output(Socket::exec_output("exec"))
            .effect(|ctx| {
                let delay = delay(ctx)?;
                ctx.defer(delay, "exec");
                Ok(())
            }),
    )?;

    let methods: Vec<&str> = SINGLE_ARG
        .iter()
        .chain(DOUBLE_ARG)
        .chain(INTEGER_ARG)
        .chain(ARRAY_ARG)
        .copied()
        .collect();
    registry.register(
        NodeType::pure(MATH, "Math", NodeCategory::Utility)
            .describe("Apply a math function; `b` is used by two-argument functions")
            .field(FieldSpec::choice("method", &methods))
            .input(Socket::input("a", SocketType::Value).with_default(0.0))
            .input(Socket::input("b", SocketType::Value).with_default(0.0))
            .output(Socket::output("result", SocketType::Value))
            .produce("result", |ctx| {
                let method = ctx.field_str("method");
                let a = ctx.input("a")?;
                let b = if DOUBLE_ARG.contains(&method.as_str())
                    || matches!(method.as_str(), "gcd" | "comb" | "perm")
                {
                    ctx.input("b")?
                } else {
                    Value::None
                };
                apply_math(&method, &a, &b)
            }),
    )?;

    Ok(())
}

/// Delay input in seconds, rejected below the configured minimum
fn delay(ctx: &mut EvaluationContext<'_>) -> Result<Duration, NodeError> {
    let seconds = ctx.input_float("time")?;
    let minimum = ctx.config().min_delay_secs;
    if !seconds.is_finite() || seconds < minimum {
        return Err(NodeError::invalid(
            "time",
            format!("minimum time is {minimum} seconds"),
        ));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Evaluate a math function by name
pub fn apply_math(method: &str, a: &Value, b: &Value) -> Result<Value, NodeError> {
    if INTEGER_ARG.contains(&method) {
        return integer_math(method, a.to_int()?, b);
    }
    if method == "prod" {
        return product(a.clone().into_items()?);
    }

    let x = a.to_float()?;
    let range_error = || NodeError::invalid("a", format!("math range error in {method}"));
    let pole = || NodeError::invalid("a", format!("math domain error in {method}"));
    let result = match method {
        "acos" => x.acos(),
        "acosh" => x.acosh(),
        "asin" => x.asin(),
        "asinh" => x.asinh(),
        "atan" => x.atan(),
        "atanh" => x.atanh(),
        "ceil" => return float_to_int(x.ceil()),
        "cos" => x.cos(),
        "cosh" => x.cosh(),
        "degrees" => x.to_degrees(),
        "erf" => libm::erf(x),
        "erfc" => libm::erfc(x),
        "exp" => x.exp(),
        "expm1" => x.exp_m1(),
        "fabs" => x.abs(),
        "floor" => return float_to_int(x.floor()),
        "frexp" => {
            let (mantissa, exponent) = libm::frexp(x);
            return Ok(Value::Array(vec![Value::Float(mantissa), Value::Int(i64::from(exponent))]));
        }
        "gamma" | "lgamma" if x <= 0.0 && x.fract() == 0.0 => return Err(pole()),
        "gamma" => match libm::tgamma(x) {
            result if result.is_infinite() && x.is_finite() => return Err(range_error()),
            result => result,
        },
        "lgamma" => libm::lgamma(x),
        "log" => x.ln(),
        "log10" => x.log10(),
        "log1p" => x.ln_1p(),
        "log2" => x.log2(),
        "radians" => x.to_radians(),
        "sin" => x.sin(),
        "sinh" => x.sinh(),
        "sqrt" => x.sqrt(),
        "tan" => x.tan(),
        "tanh" => x.tanh(),
        "trunc" => return float_to_int(x.trunc()),
        _ => {
            let y = b.to_float()?;
            match method {
                "atan2" => x.atan2(y),
                "copysign" => x.copysign(y),
                "fmod" if y == 0.0 => return Err(ValueError::DivisionByZero.into()),
                "fmod" => x % y,
                "hypot" => x.hypot(y),
                "ldexp" => {
                    let exponent = b.to_int()?.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
                    match libm::ldexp(x, exponent) {
                        result if result.is_infinite() && x.is_finite() => return Err(range_error()),
                        result => result,
                    }
                }
                "pow" => x.powf(y),
                "remainder" if y == 0.0 => return Err(ValueError::DivisionByZero.into()),
                "remainder" => x - y * (x / y).round_ties_even(),
                _ => return Err(NodeError::invalid("method", format!("unknown function {method}"))),
            }
        }
    };

    if result.is_nan() && !x.is_nan() {
        return Err(NodeError::invalid("a", format!("math domain error in {method}")));
    }
    Ok(Value::Float(result))
}

/// Product of numeric items, exact while every item is an integer
fn product(items: Vec<Value>) -> Result<Value, NodeError> {
    items.into_iter().try_fold(Value::Int(1), |acc, item| {
        if !matches!(item, Value::Bool(_) | Value::Int(_) | Value::Float(_)) {
            let mismatch = ValueError::TypeMismatch {
                op: "prod",
                left: acc.type_name(),
                right: item.type_name(),
            };
            return Err(mismatch.into());
        }
        Ok(acc.mul(&item)?)
    })
}

fn float_to_int(value: f64) -> Result<Value, NodeError> {
    if !value.is_finite() {
        return Err(ValueError::Conversion { from: "float", to: "int" }.into());
    }
    Ok(Value::Int(value as i64))
}

fn integer_math(method: &str, n: i64, b: &Value) -> Result<Value, NodeError> {
    let overflow = || NodeError::invalid("a", format!("{method} result too large"));
    let negative = || NodeError::invalid("a", format!("{method} is not defined for negative values"));

    let result = match method {
        "factorial" => {
            if n < 0 {
                return Err(negative());
            }
            (1..=n).try_fold(1_i64, |acc, k| acc.checked_mul(k)).ok_or_else(overflow)?
        }
        "gcd" => {
            let (mut x, mut y) = (n.unsigned_abs(), b.to_int()?.unsigned_abs());
            while y != 0 {
                (x, y) = (y, x % y);
            }
            i64::try_from(x).map_err(|_| overflow())?
        }
        "comb" | "perm" => {
            let k = b.to_int()?;
            if n < 0 || k < 0 {
                return Err(negative());
            }
            if k > n {
                0
            } else if method == "perm" {
                ((n - k + 1)..=n).try_fold(1_i64, |acc, i| acc.checked_mul(i)).ok_or_else(overflow)?
            } else {
                let k = k.min(n - k);
                let mut acc: i64 = 1;
                for i in 0..k {
                    // Exact at each step: acc * (n - i) is divisible by (i + 1)
                    acc = acc.checked_mul(n - i).ok_or_else(overflow)? / (i + 1);
                }
                acc
            }
        }
        _ => return Err(NodeError::invalid("method", format!("unknown function {method}"))),
    };
    Ok(Value::Int(result))
}
