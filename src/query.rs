use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("operator {0} needs an array value")]
    NotAnArray(Operator),
    #[error("conditions must be an array of {{field, operator, value}}: {0}")]
    Malformed(String),
    #[error("condition field must not be empty")]
    EmptyField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::NotIn => "not-in",
            Operator::ArrayContains => "array-contains",
            Operator::ArrayContainsAny => "array-contains-any",
        }
    }

    fn wants_array(self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::ArrayContainsAny
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "==" | "=" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "in" => Operator::In,
            "not-in" => Operator::NotIn,
            "array-contains" => Operator::ArrayContains,
            "array-contains-any" => Operator::ArrayContainsAny,
            other => return Err(QueryError::UnknownOperator(other.to_string())),
        })
    }
}

/// A `{field, operator, value}` triple. Conditions in a list are joined with AND.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value.into())
    }

    /// A missing field never matches, whatever the operator.
    pub fn matches(&self, doc: &Value) -> bool {
        let Some(actual) = lookup(doc, &self.field) else {
            return false;
        };
        let expected = &self.value;
        match self.operator {
            Operator::Eq => values_equal(actual, expected),
            Operator::Ne => !values_equal(actual, expected),
            Operator::Lt => ordered(actual, expected) == Some(Ordering::Less),
            Operator::Le => matches!(
                ordered(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => ordered(actual, expected) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                ordered(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::In => array_items(expected).any(|v| values_equal(actual, v)),
            Operator::NotIn => !array_items(expected).any(|v| values_equal(actual, v)),
            Operator::ArrayContains => array_items(actual).any(|v| values_equal(v, expected)),
            Operator::ArrayContainsAny => {
                array_items(actual).any(|v| array_items(expected).any(|e| values_equal(v, e)))
            }
        }
    }
}

#[derive(Deserialize)]
struct RawCondition {
    field: String,
    #[serde(alias = "op")]
    operator: String,
    #[serde(default)]
    value: Value,
}

/// Parses the `conditions` param. Absent or null means no conditions.
pub fn parse_conditions(raw: Option<&Value>) -> Result<Vec<Condition>, QueryError> {
    let Some(raw) = raw.filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };
    let parsed: Vec<RawCondition> = serde_json::from_value(raw.clone())
        .map_err(|e| QueryError::Malformed(e.to_string()))?;

    parsed
        .into_iter()
        .map(|c| {
            let field = c.field.trim().to_string();
            if field.is_empty() {
                return Err(QueryError::EmptyField);
            }
            let operator: Operator = c.operator.parse()?;
            if operator.wants_array() && !c.value.is_array() {
                return Err(QueryError::NotAnArray(operator));
            }
            Ok(Condition::new(field, operator, c.value))
        })
        .collect()
}

pub fn matches_all(conditions: &[Condition], doc: &Value) -> bool {
    conditions.iter().all(|c| c.matches(doc))
}

/// Resolves a dotted field path such as `address.city`.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |cur, seg| cur.get(seg))
}

fn array_items(v: &Value) -> impl Iterator<Item = &Value> {
    v.as_array().into_iter().flatten()
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

// Only numbers and strings have an order; everything else fails range operators.
fn ordered(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
