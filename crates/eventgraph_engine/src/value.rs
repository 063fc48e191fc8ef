// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamic values flowing through sockets.
//!
//! Values follow scripting-language semantics: integers and floats mix
//! freely, `+` concatenates strings and arrays, and `/` is true division.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Error raised by a value operation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// Operand types are not supported by the operation
    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        /// Operation name
        op: &'static str,
        /// Left operand type
        left: &'static str,
        /// Right operand type
        right: &'static str,
    },

    /// Division or modulo by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Index outside of a sequence
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: i64,
        /// Sequence length
        len: usize,
    },

    /// Result would exceed the size limit for a single value
    #[error("result of {len} bytes exceeds the limit of {limit}")]
    TooLarge {
        /// Requested size
        len: u128,
        /// Largest size accepted
        limit: usize,
    },

    /// Value cannot be converted to the requested type
    #[error("cannot convert {from} to {to}")]
    Conversion {
        /// Source type
        from: &'static str,
        /// Target type
        to: &'static str,
    },
}

/// Largest string a repetition may produce, in bytes
pub const MAX_STRING_LEN: usize = 1 << 24;

/// Comparison operator selectable on compare nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl CompareOp {
    /// All operator symbols in menu order
    pub const SYMBOLS: [&'static str; 6] = ["<", ">", "<=", ">=", "==", "!="];

    /// Parse an operator symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(Self::Less),
            ">" => Some(Self::Greater),
            "<=" => Some(Self::LessEqual),
            ">=" => Some(Self::GreaterEqual),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            _ => None,
        }
    }
}

/// A runtime value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum Value {
    /// Absence of a value (unconnected, unresolved, or not found)
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// String
    String(String),
    /// Ordered list
    Array(Vec<Value>),
    /// Insertion-ordered set
    Set(IndexSet<Value>),
    /// Insertion-ordered string-keyed map
    Map(IndexMap<String, Value>),
    /// Handle to a host scene object, by name
    Object(String),
}

impl Value {
    /// Short type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Whether this is [`Value::None`]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Truthiness: empty containers, zero, empty strings and none are false
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) | Self::Object(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
            Self::Set(s) => !s.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to an integer (floats truncate, numeric strings parse)
    pub fn to_int(&self) -> Result<i64, ValueError> {
        let err = ValueError::Conversion { from: self.type_name(), to: "int" };
        match self {
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Int(i) => Ok(*i),
            Self::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            Self::String(s) => s.trim().parse::<i64>().map_err(|_| err),
            _ => Err(err),
        }
    }

    /// Convert to a float (numeric strings parse)
    pub fn to_float(&self) -> Result<f64, ValueError> {
        let err = ValueError::Conversion { from: self.type_name(), to: "float" };
        match self {
            Self::String(s) => s.trim().parse::<f64>().map_err(|_| err),
            other => other.as_number().ok_or(err),
        }
    }

    /// Borrow the string contents of a string or object value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Object(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a list of items (arrays, sets, map keys, string characters)
    pub fn into_items(self) -> Result<Vec<Value>, ValueError> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Array(a) => Ok(a),
            Self::Set(s) => Ok(s.into_iter().collect()),
            Self::Map(m) => Ok(m.into_keys().map(Value::String).collect()),
            Self::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            other => Err(ValueError::Conversion { from: other.type_name(), to: "array" }),
        }
    }

    fn mismatch(op: &'static str, left: &Value, right: &Value) -> ValueError {
        ValueError::TypeMismatch { op, left: left.type_name(), right: right.type_name() }
    }

    /// `self + other`
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Ok(Self::String(format!("{a}{b}"))),
            (Self::Array(a), Self::Array(b)) => {
                Ok(Self::Array(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => self.arithmetic("+", other, i64::checked_add, |a, b| a + b),
        }
    }

    /// `self - other`
    pub fn sub(&self, other: &Value) -> Result<Value, ValueError> {
        self.arithmetic("-", other, i64::checked_sub, |a, b| a - b)
    }

    /// `self * other`
    pub fn mul(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Self::String(s), Self::Int(n)) | (Self::Int(n), Self::String(s)) => {
                let count = usize::try_from((*n).max(0)).unwrap_or(usize::MAX);
                match s.len().checked_mul(count) {
                    Some(len) if len <= MAX_STRING_LEN => Ok(Self::String(s.repeat(count))),
                    _ => Err(ValueError::TooLarge {
                        len: s.len() as u128 * count as u128,
                        limit: MAX_STRING_LEN,
                    }),
                }
            }
            _ => self.arithmetic("*", other, i64::checked_mul, |a, b| a * b),
        }
    }

    /// `self / other`, always true division
    pub fn div(&self, other: &Value) -> Result<Value, ValueError> {
        let (Some(a), Some(b)) = (self.as_number(), other.as_number()) else {
            return Err(Self::mismatch("/", self, other));
        };
        if b == 0.0 {
            return Err(ValueError::DivisionByZero);
        }
        Ok(Self::Float(a / b))
    }

    fn arithmetic(
        &self,
        op: &'static str,
        other: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, ValueError> {
        if let (Some(a), Some(b)) = (self.as_integer(), other.as_integer()) {
            if let Some(result) = int_op(a, b) {
                return Ok(Self::Int(result));
            }
        }
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok(Self::Float(float_op(a, b))),
            _ => Err(Self::mismatch(op, self, other)),
        }
    }

    /// Compare two values with the given operator
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool, ValueError> {
        match op {
            CompareOp::Equal => return Ok(self == other),
            CompareOp::NotEqual => return Ok(self != other),
            _ => {}
        }
        let ordering = self
            .partial_order(other)
            .ok_or_else(|| Self::mismatch("comparison", self, other))?;
        Ok(match op {
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::Greater => ordering == Ordering::Greater,
            CompareOp::LessEqual => ordering != Ordering::Greater,
            CompareOp::GreaterEqual => ordering != Ordering::Less,
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
        })
    }

    /// Ordering between comparable values (numbers, strings, arrays)
    pub fn partial_order(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Array(a), Self::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.partial_order(y)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => self.number_order(other),
        }
    }

    /// Numeric ordering, exact between integers and between an integer and a float
    fn number_order(&self, other: &Value) -> Option<Ordering> {
        match (self.as_integer(), other.as_integer()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (Some(a), None) => int_float_order(a, other.as_float()?),
            (None, Some(b)) => int_float_order(b, self.as_float()?).map(Ordering::reverse),
            (None, None) => self.as_float()?.partial_cmp(&other.as_float()?),
        }
    }

    fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Resolve a possibly negative index against a length
    pub fn normalize_index(index: i64, len: usize) -> Result<usize, ValueError> {
        let resolved = if index < 0 { index + len as i64 } else { index };
        if resolved < 0 || resolved as usize >= len {
            return Err(ValueError::IndexOutOfRange { index, len });
        }
        Ok(resolved as usize)
    }

    /// Same type and equal value. Values have no shared identity, so `1 is 1.0` is false.
    pub fn is_identical(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other) && self == other
    }

    /// `item in self`: elements of arrays and sets, keys of maps, substrings of strings
    pub fn contains(&self, item: &Value) -> Result<bool, ValueError> {
        match (self, item) {
            (Self::Array(items), _) => Ok(items.contains(item)),
            (Self::Set(items), _) => Ok(items.contains(item)),
            (Self::Map(map), Self::String(key)) => Ok(map.contains_key(key)),
            (Self::Map(_), _) => Ok(false),
            (Self::String(s), Self::String(part)) => Ok(s.contains(part.as_str())),
            _ => Err(Self::mismatch("in", item, self)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::String(a), Self::String(b)) | (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a.len() == b.len() && a.iter().all(|v| b.contains(v)),
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Self::Float(a), Self::Float(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.number_order(other) == Some(Ordering::Equal),
        }
    }
}

/// `2^63` as a float, the first value past the `i64` range
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Integer equal to a float, when the float holds a whole number in range
fn float_as_integer(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f)).then_some(f as i64)
}

fn int_float_order(i: i64, f: f64) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if f < -I64_BOUND {
        return Some(Ordering::Greater);
    }
    match i.cmp(&(f.trunc() as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&f.fract()),
        unequal => Some(unequal),
    }
}

// NaN is treated as equal to itself so sets stay well-formed
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::None => 0u8.hash(state),
            Self::Bool(_) | Self::Int(_) => {
                1u8.hash(state);
                self.as_integer().unwrap_or_default().hash(state);
            }
            Self::Float(f) => match float_as_integer(*f) {
                Some(i) => {
                    1u8.hash(state);
                    i.hash(state);
                }
                None if f.is_nan() => {
                    2u8.hash(state);
                    f64::NAN.to_bits().hash(state);
                }
                None => {
                    2u8.hash(state);
                    f.to_bits().hash(state);
                }
            },
            Self::String(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Self::Array(a) => {
                4u8.hash(state);
                a.hash(state);
            }
            Self::Set(s) => {
                5u8.hash(state);
                s.len().hash(state);
            }
            Self::Map(m) => {
                6u8.hash(state);
                m.len().hash(state);
            }
            Self::Object(name) => {
                7u8.hash(state);
                name.hash(state);
            }
        }
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    close: &str,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item.fmt_nested(f)?;
    }
    f.write_str(close)
}

impl Value {
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{s}'"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) | Self::Object(s) => f.write_str(s),
            Self::Array(a) => write_items(f, "[", "]", a.iter()),
            Self::Set(s) if s.is_empty() => f.write_str("set()"),
            Self::Set(s) => write_items(f, "{", "}", s.iter()),
            Self::Map(m) => {
                f.write_str("{")?;
                for (i, (key, value)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': ")?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Array(value)
    }
}
