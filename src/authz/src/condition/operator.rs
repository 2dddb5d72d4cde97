//! Leaf comparison operators
//!
//! Comparison rules:
//! - An absent attribute is unequal to everything, including another absent
//!   attribute and JSON `null`. Only `ne` and `not_in` hold against it.
//! - Numbers compare by value (`1 == 1.0`), everything else by strict JSON
//!   equality. Two integers compare exactly at any magnitude.
//! - `gt`/`lt`/`gte`/`lte` order two numbers numerically and two strings
//!   lexicographically. Any other pairing is non-comparable and yields `false`.
//! - `in`/`not_in` require the expected value to be an array; otherwise both
//!   yield `false`.
//! - `contains` tests whether the stringified attribute contains the
//!   stringified expected value. Strings stringify to their raw text, other
//!   values to their JSON text.

use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::fmt;

/// Closed set of leaf operators
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    NotIn,
    Contains,
    /// Operator name outside the closed set; never holds
    Unknown(String),
}

impl Operator {
    /// Parse an operator name; names outside the closed set become `Unknown`
    pub fn parse(name: &str) -> Self {
        match name {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "contains" => Self::Contains,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Serialized operator name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Apply the operator to a context attribute and a resolved expected value
    ///
    /// Returns `None` for an unknown operator so callers can fail closed.
    pub fn apply(&self, actual: Option<&Value>, expected: Option<&Value>) -> Option<bool> {
        let result = match self {
            Self::Eq => matches!((actual, expected), (Some(a), Some(b)) if values_equal(a, b)),
            Self::Ne => !matches!((actual, expected), (Some(a), Some(b)) if values_equal(a, b)),
            Self::Gt => ordering(actual, expected).map_or(false, Ordering::is_gt),
            Self::Lt => ordering(actual, expected).map_or(false, Ordering::is_lt),
            Self::Gte => ordering(actual, expected).map_or(false, Ordering::is_ge),
            Self::Lte => ordering(actual, expected).map_or(false, Ordering::is_le),
            Self::In => match (actual, expected) {
                (Some(a), Some(Value::Array(items))) => items.iter().any(|item| values_equal(a, item)),
                _ => false,
            },
            Self::NotIn => match (actual, expected) {
                (Some(a), Some(Value::Array(items))) => !items.iter().any(|item| values_equal(a, item)),
                (None, Some(Value::Array(_))) => true,
                _ => false,
            },
            Self::Contains => match (actual, expected) {
                (Some(a), Some(b)) => stringify(a).contains(stringify(b).as_str()),
                _ => false,
            },
            Self::Unknown(_) => return None,
        };

        Some(result)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict equality, with numbers compared by value
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn ordering(actual: Option<&Value>, expected: Option<&Value>) -> Option<Ordering> {
    match (actual?, expected?) {
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Integers compare exactly; `f64` only when either side is a float
fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (integer(a), integer(b)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
