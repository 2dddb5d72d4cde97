//! Condition tree nodes, parsing and evaluation

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::error::{ConditionError, Result};
use super::operator::Operator;
use crate::types::Context;

const AND: &str = "and";
const OR: &str = "or";
const NOT: &str = "not";
const FIELD: &str = "field";
const OPERATOR: &str = "operator";
const VALUE: &str = "value";

/// Prefix marking a context reference in a leaf value
pub const REFERENCE_PREFIX: char = '@';

/// Recursive predicate over a context
///
/// Constructed once from the JSON shape via [`Condition::parse`] and
/// evaluated many times. Parsing never fails: structurally invalid input is
/// kept as [`Condition::Malformed`], which never holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// All children must hold; empty holds
    And(Vec<Condition>),
    /// At least one child must hold; empty does not hold
    Or(Vec<Condition>),
    /// The child must not hold
    Not(Box<Condition>),
    /// `{field, operator, value}` comparison
    Leaf(Predicate),
    /// Input that is neither a logical node nor a leaf
    Malformed {
        raw: Value,
        error: ConditionError,
    },
}

/// Leaf comparison of `context[field]` against a value
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Operand,
}

/// Right-hand side of a leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Used as-is
    Literal(Value),
    /// `@name`, resolved to `context[name]` at evaluation time
    Reference(String),
}

impl Operand {
    /// Interpret a JSON value, turning `@name` strings into references
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) if s.starts_with(REFERENCE_PREFIX) => {
                Self::Reference(s[REFERENCE_PREFIX.len_utf8()..].to_string())
            }
            other => Self::Literal(other),
        }
    }

    fn resolve<'a>(&'a self, context: &'a Context) -> Option<&'a Value> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Reference(name) => context.get(name),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Reference(name) => Value::String(format!("{}{}", REFERENCE_PREFIX, name)),
        }
    }
}

impl Predicate {
    /// `None` when the operator is outside the closed set
    fn evaluate(&self, context: &Context) -> Option<bool> {
        let actual = context.get(&self.field);
        let expected = self.value.resolve(context);
        self.operator.apply(actual, expected)
    }
}

impl Condition {
    /// Parse a JSON condition specification
    ///
    /// `null` and `{}` are the empty condition and always hold. An object
    /// whose values are all `{operator, value}` objects is read as the flat
    /// per-field shape: an implicit `and` of leaves keyed by field name.
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Null => Self::And(Vec::new()),
            Value::Object(map) if map.is_empty() => Self::And(Vec::new()),
            Value::Object(map) => Self::parse_object(value, map),
            _ => Self::malformed(value, ConditionError::InvalidShape("expected an object".into())),
        }
    }

    fn parse_object(raw: &Value, map: &Map<String, Value>) -> Self {
        let logical: Vec<&str> = [AND, OR, NOT]
            .into_iter()
            .filter(|k| map.contains_key(*k))
            .collect();
        let leaf = [FIELD, OPERATOR, VALUE].iter().any(|k| map.contains_key(*k));

        if logical.len() > 1 || (!logical.is_empty() && leaf) {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            return Self::malformed(raw, ConditionError::AmbiguousNode(keys.join(", ")));
        }

        if let Some(&key) = logical.first() {
            if map.len() > 1 {
                return Self::malformed(
                    raw,
                    ConditionError::InvalidShape(format!("unexpected keys next to '{}'", key)),
                );
            }
            return Self::parse_logical(raw, key, &map[key]);
        }

        if leaf {
            return Self::parse_leaf(raw, map);
        }

        Self::parse_flat(raw, map)
    }

    fn parse_logical(raw: &Value, key: &str, body: &Value) -> Self {
        match (key, body) {
            (AND, Value::Array(children)) => Self::And(children.iter().map(Self::parse).collect()),
            (OR, Value::Array(children)) => Self::Or(children.iter().map(Self::parse).collect()),
            (NOT, Value::Object(_)) => Self::Not(Box::new(Self::parse(body))),
            (NOT, _) => Self::malformed(raw, ConditionError::InvalidNot),
            _ => Self::malformed(
                raw,
                ConditionError::InvalidShape(format!("'{}' expects an array", key)),
            ),
        }
    }

    fn parse_leaf(raw: &Value, map: &Map<String, Value>) -> Self {
        if let Some(extra) = map.keys().find(|k| ![FIELD, OPERATOR, VALUE].contains(&k.as_str())) {
            return Self::malformed(
                raw,
                ConditionError::InvalidShape(format!("unexpected leaf key '{}'", extra)),
            );
        }

        let field = match map.get(FIELD) {
            Some(Value::String(field)) => field.clone(),
            _ => {
                return Self::malformed(raw, ConditionError::InvalidShape("leaf requires a string 'field'".into()))
            }
        };
        let operator = match map.get(OPERATOR) {
            Some(Value::String(op)) => Operator::parse(op),
            _ => {
                return Self::malformed(raw, ConditionError::InvalidShape("leaf requires a string 'operator'".into()))
            }
        };
        let value = map.get(VALUE).cloned().unwrap_or(Value::Null);

        Self::Leaf(Predicate {
            field,
            operator,
            value: Operand::from_value(value),
        })
    }

    /// `{ "<field>": {"operator": .., "value": ..}, ... }`
    fn parse_flat(raw: &Value, map: &Map<String, Value>) -> Self {
        let mut leaves = Vec::with_capacity(map.len());

        for (field, rule) in map {
            let Value::Object(rule) = rule else {
                return Self::malformed(
                    raw,
                    ConditionError::InvalidShape(format!("field '{}' is not a rule object", field)),
                );
            };
            let only_rule_keys = rule.keys().all(|k| k == OPERATOR || k == VALUE);
            let operator = match rule.get(OPERATOR) {
                Some(Value::String(op)) if only_rule_keys => Operator::parse(op),
                _ => {
                    return Self::malformed(
                        raw,
                        ConditionError::InvalidShape(format!("field '{}' is not a rule object", field)),
                    )
                }
            };

            leaves.push(Self::Leaf(Predicate {
                field: field.clone(),
                operator,
                value: Operand::from_value(rule.get(VALUE).cloned().unwrap_or(Value::Null)),
            }));
        }

        Self::And(leaves)
    }

    fn malformed(raw: &Value, error: ConditionError) -> Self {
        Self::Malformed {
            raw: raw.clone(),
            error,
        }
    }

    /// Build a leaf; `@name` string values become context references
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Leaf(Predicate {
            field: field.into(),
            operator,
            value: Operand::from_value(value.into()),
        })
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Self::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Condition) -> Self {
        Self::Not(Box::new(child))
    }

    /// The empty condition, which always holds
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Self::And(children) if children.is_empty())
    }

    /// Report the first malformed node or unknown operator in the tree
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::And(children) | Self::Or(children) => children.iter().try_for_each(Self::validate),
            Self::Not(child) => child.validate(),
            Self::Leaf(predicate) if !predicate.operator.is_known() => {
                Err(ConditionError::UnknownOperator(predicate.operator.as_str().to_string()))
            }
            Self::Leaf(_) => Ok(()),
            Self::Malformed { error, .. } => Err(error.clone()),
        }
    }

    /// Evaluate against a context
    ///
    /// Fails closed: a malformed node or unknown operator makes its subtree
    /// indeterminate, and an indeterminate result at the root is `false`.
    /// Indeterminacy propagates through `not`, so negating a bad leaf never
    /// grants.
    pub fn evaluate(&self, context: &Context) -> bool {
        self.eval(context).unwrap_or(false)
    }

    fn eval(&self, context: &Context) -> Option<bool> {
        match self {
            Self::And(children) => {
                let mut determinate = true;
                for child in children {
                    match child.eval(context) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => determinate = false,
                    }
                }
                determinate.then_some(true)
            }
            Self::Or(children) => {
                let mut determinate = true;
                for child in children {
                    match child.eval(context) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => determinate = false,
                    }
                }
                determinate.then_some(false)
            }
            Self::Not(child) => child.eval(context).map(|held| !held),
            Self::Leaf(predicate) => predicate.evaluate(context),
            Self::Malformed { .. } => None,
        }
    }

    /// Nested tree JSON shape; malformed nodes keep their original JSON
    pub fn to_value(&self) -> Value {
        let mut node = Map::new();
        match self {
            Self::And(children) => {
                node.insert(AND.into(), children.iter().map(Self::to_value).collect());
            }
            Self::Or(children) => {
                node.insert(OR.into(), children.iter().map(Self::to_value).collect());
            }
            Self::Not(child) => {
                node.insert(NOT.into(), child.to_value());
            }
            Self::Leaf(predicate) => {
                node.insert(FIELD.into(), Value::String(predicate.field.clone()));
                node.insert(OPERATOR.into(), Value::String(predicate.operator.as_str().to_string()));
                node.insert(VALUE.into(), predicate.value.to_value());
            }
            Self::Malformed { raw, .. } => return raw.clone(),
        }
        Value::Object(node)
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

impl From<&Value> for Condition {
    fn from(value: &Value) -> Self {
        Self::parse(value)
    }
}
