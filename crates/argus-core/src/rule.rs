//! Rule Set schema and load-time validation.
//!
//! Rules arrive as loosely-typed configuration (`[{field: {operator: arg}}]`)
//! and are resolved once into typed criteria. Anything the matcher could not
//! evaluate is rejected here with a [`ConfigurationError`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

use crate::error::ConfigurationError;

/// Match operators, declared in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    In,
    Matches,
    Contains,
}

impl Operator {
    /// When a criterion names several operators, the first of these wins.
    pub const PRECEDENCE: [Operator; 4] = [
        Operator::Equals,
        Operator::In,
        Operator::Matches,
        Operator::Contains,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::In => "in",
            Operator::Matches => "matches",
            Operator::Contains => "contains",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::PRECEDENCE.into_iter().find(|op| op.key() == key)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Scalar argument of `equals` and `in`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Integer)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Record values are text, so only text scalars can ever match them.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{:?}", s),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A resolved field-level test.
#[derive(Debug, Clone)]
pub enum Criterion {
    Equals(Scalar),
    In(Vec<Scalar>),
    Matches(Regex),
    /// Needle is lower-cased at load time.
    Contains(String),
}

impl Criterion {
    pub fn operator(&self) -> Operator {
        match self {
            Criterion::Equals(_) => Operator::Equals,
            Criterion::In(_) => Operator::In,
            Criterion::Matches(_) => Operator::Matches,
            Criterion::Contains(_) => Operator::Contains,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criterion::Equals(v) => write!(f, "equals {}", v),
            Criterion::In(values) => {
                let list = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "in [{}]", list)
            }
            Criterion::Matches(re) => write!(f, "matches /{}/", re.as_str()),
            Criterion::Contains(needle) => write!(f, "contains {:?}", needle),
        }
    }
}

/// One `field: criterion` pair of a rule.
#[derive(Debug, Clone)]
pub struct FieldCriterion {
    pub field: String,
    pub criterion: Criterion,
    /// Terms of the criterion's `in` key, shadowed or not. The `category`
    /// title fallback searches for these.
    pub fallback_terms: Option<Vec<Scalar>>,
}

/// AND-combination of field criteria. An empty rule matches every record.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    pub conditions: Vec<FieldCriterion>,
}

impl Rule {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// OR-combination of rules, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build from a configuration value: a list of rule mappings, or null
    /// for an empty set.
    pub fn from_value(value: &Value) -> Result<Self, ConfigurationError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Array(items) => Self::from_rules(items),
            other => Err(ConfigurationError::NotAList {
                found: kind_of(other),
            }),
        }
    }

    pub fn from_rules(items: &[Value]) -> Result<Self, ConfigurationError> {
        let rules = items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_rule(index, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn parse_rule(index: usize, value: &Value) -> Result<Rule, ConfigurationError> {
    let Value::Object(fields) = value else {
        return Err(ConfigurationError::RuleNotMapping {
            rule: index,
            found: kind_of(value),
        });
    };

    if fields.is_empty() {
        warn!(rule = index, "Rule has no fields and matches every record");
    }

    let mut conditions = Vec::with_capacity(fields.len());
    for (field, criterion) in fields {
        conditions.push(parse_criterion(index, field, criterion)?);
    }

    Ok(Rule { conditions })
}

fn parse_criterion(
    rule: usize,
    field: &str,
    value: &Value,
) -> Result<FieldCriterion, ConfigurationError> {
    let Value::Object(operators) = value else {
        return Err(ConfigurationError::CriterionNotMapping {
            rule,
            field: field.to_string(),
            found: kind_of(value),
        });
    };

    if let Some(unknown) = operators.keys().find(|k| Operator::from_key(k).is_none()) {
        return Err(ConfigurationError::UnknownOperator {
            rule,
            field: field.to_string(),
            operator: unknown.clone(),
        });
    }

    // Every named operator is validated, even the shadowed ones.
    let mut resolved = Vec::with_capacity(operators.len());
    for op in Operator::PRECEDENCE {
        if let Some(arg) = operators.get(op.key()) {
            resolved.push(parse_argument(rule, field, op, arg)?);
        }
    }

    let fallback_terms = resolved.iter().find_map(|c| match c {
        Criterion::In(terms) => Some(terms.clone()),
        _ => None,
    });

    let mut resolved = resolved.into_iter();
    let Some(applied) = resolved.next() else {
        return Err(ConfigurationError::MissingOperator {
            rule,
            field: field.to_string(),
        });
    };

    let shadowed: Vec<&str> = resolved.map(|c| c.operator().key()).collect();
    if !shadowed.is_empty() {
        warn!(
            rule,
            field,
            applied = applied.operator().key(),
            ?shadowed,
            "Criterion names several operators; only the first by precedence applies"
        );
    }

    Ok(FieldCriterion {
        field: field.to_string(),
        criterion: applied,
        fallback_terms,
    })
}

fn parse_argument(
    rule: usize,
    field: &str,
    op: Operator,
    arg: &Value,
) -> Result<Criterion, ConfigurationError> {
    let invalid = |expected: &'static str| ConfigurationError::InvalidArgument {
        rule,
        field: field.to_string(),
        operator: op,
        expected,
        found: kind_of(arg),
    };

    match op {
        Operator::Equals => Scalar::from_value(arg)
            .map(Criterion::Equals)
            .ok_or_else(|| invalid("a scalar")),
        Operator::In => {
            let Value::Array(items) = arg else {
                return Err(invalid("a list of scalars"));
            };
            let allowed = items
                .iter()
                .map(Scalar::from_value)
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid("a list of scalars"))?;
            if allowed.is_empty() {
                warn!(rule, field, "'in' list is empty and can never match");
            }
            Ok(Criterion::In(allowed))
        }
        Operator::Matches => {
            let Value::String(pattern) = arg else {
                return Err(invalid("a regular expression string"));
            };
            Regex::new(pattern)
                .map(Criterion::Matches)
                .map_err(|e| ConfigurationError::InvalidPattern {
                    rule,
                    field: field.to_string(),
                    message: e.to_string(),
                })
        }
        Operator::Contains => match arg {
            Value::String(needle) => Ok(Criterion::Contains(needle.to_lowercase())),
            _ => Err(invalid("a string")),
        },
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

impl TryFrom<&Value> for RuleSet {
    type Error = ConfigurationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        RuleSet::from_value(value)
    }
}
