//! Argus Core - Record model and rule-matching filter engine
//!
//! This crate decides which enriched feed records are forwarded:
//! - Record model with typed fields, tags and pass-through extras
//! - Rule Set loading and validation (field -> criterion mappings)
//! - Field matching with the `category` title fallback
//! - OR-across-rules / AND-across-fields evaluation over record batches
//!
//! Nothing here performs I/O. Diagnostics go through an injected
//! [`MatchObserver`].

pub mod engine;
pub mod error;
pub mod matcher;
pub mod observer;
pub mod record;
pub mod rule;

pub use engine::FilterEngine;
pub use error::ConfigurationError;
pub use matcher::{MatchEvaluationWarning, MismatchReason, Shape};
pub use observer::{MatchObserver, NoopObserver, Rejection, TracingObserver};
pub use record::{FieldRef, FieldValue, Record, Tags};
pub use rule::{Criterion, FieldCriterion, Operator, Rule, RuleSet, Scalar};
