//! Typed errors for rule set loading.

use thiserror::Error;

use crate::rule::Operator;

/// A malformed Rule Set. Raised while building the engine, never mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("filters must be a list of rules, got {found}")]
    NotAList { found: &'static str },

    #[error("rule {rule}: expected a mapping of field to criterion, got {found}")]
    RuleNotMapping { rule: usize, found: &'static str },

    #[error("rule {rule}, field '{field}': criterion must be a mapping, got {found}")]
    CriterionNotMapping {
        rule: usize,
        field: String,
        found: &'static str,
    },

    #[error("rule {rule}, field '{field}': criterion has no operator (expected one of equals, in, matches, contains)")]
    MissingOperator { rule: usize, field: String },

    #[error("rule {rule}, field '{field}': unknown operator '{operator}' (expected one of equals, in, matches, contains)")]
    UnknownOperator {
        rule: usize,
        field: String,
        operator: String,
    },

    #[error("rule {rule}, field '{field}': '{operator}' expects {expected}, got {found}")]
    InvalidArgument {
        rule: usize,
        field: String,
        operator: Operator,
        expected: &'static str,
        found: &'static str,
    },

    #[error("rule {rule}, field '{field}': invalid regular expression: {message}")]
    InvalidPattern {
        rule: usize,
        field: String,
        message: String,
    },
}

impl ConfigurationError {
    /// Index of the offending rule, when the error is about a single rule.
    pub fn rule_index(&self) -> Option<usize> {
        match self {
            ConfigurationError::NotAList { .. } => None,
            ConfigurationError::RuleNotMapping { rule, .. }
            | ConfigurationError::CriterionNotMapping { rule, .. }
            | ConfigurationError::MissingOperator { rule, .. }
            | ConfigurationError::UnknownOperator { rule, .. }
            | ConfigurationError::InvalidArgument { rule, .. }
            | ConfigurationError::InvalidPattern { rule, .. } => Some(*rule),
        }
    }

    /// Name of the offending field, when the error is about a single criterion.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigurationError::NotAList { .. } | ConfigurationError::RuleNotMapping { .. } => None,
            ConfigurationError::CriterionNotMapping { field, .. }
            | ConfigurationError::MissingOperator { field, .. }
            | ConfigurationError::UnknownOperator { field, .. }
            | ConfigurationError::InvalidArgument { field, .. }
            | ConfigurationError::InvalidPattern { field, .. } => Some(field),
        }
    }
}
