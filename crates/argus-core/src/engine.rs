//! Filter engine: OR across rules, applied over a batch of records.

use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ConfigurationError;
use crate::matcher::{MatchEvaluationWarning, MismatchReason, RuleMismatch};
use crate::observer::{MatchObserver, Rejection, TracingObserver};
use crate::record::Record;
use crate::rule::RuleSet;

/// Selects the records that match at least one rule.
///
/// Stateless over an immutable [`RuleSet`]; safe to share across threads.
/// An empty rule set rejects every record.
pub struct FilterEngine {
    rules: RuleSet,
    observer: Arc<dyn MatchObserver>,
}

impl FilterEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Validate a raw rule list and build the engine from it.
    pub fn from_config(value: &Value) -> Result<Self, ConfigurationError> {
        Ok(Self::new(RuleSet::from_value(value)?))
    }

    pub fn with_observer(mut self, observer: Arc<dyn MatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    /// True if any rule matches `record`.
    pub fn is_match(&self, record: &Record) -> bool {
        let mut misses: Vec<(usize, RuleMismatch<'_>)> = Vec::new();

        for (index, rule) in self.rules.rules().iter().enumerate() {
            match rule.evaluate(record) {
                Ok(()) => {
                    self.observer.selected(&record.id, index);
                    return true;
                }
                Err(mismatch) => {
                    if let MismatchReason::UnexpectedShape { expected, found } = mismatch.reason {
                        self.observer.warning(&MatchEvaluationWarning {
                            record_id: record.id.clone(),
                            field: mismatch.condition.field.clone(),
                            expected,
                            found,
                        });
                    }
                    misses.push((index, mismatch));
                }
            }
        }

        for (rule, mismatch) in misses {
            self.observer.rejected(&Rejection {
                record_id: &record.id,
                rule,
                field: &mismatch.condition.field,
                criterion: &mismatch.condition.criterion,
                reason: mismatch.reason,
            });
        }
        false
    }

    /// Keep matching records, in input order.
    pub fn filter(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().filter(|r| self.is_match(r)).collect()
    }

    /// Borrowing variant of [`FilterEngine::filter`].
    pub fn select<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.is_match(r)).collect()
    }

    /// Same result as [`FilterEngine::filter`], evaluated on the rayon pool.
    pub fn filter_parallel(&self, records: Vec<Record>) -> Vec<Record> {
        records
            .into_par_iter()
            .filter(|r| self.is_match(r))
            .collect()
    }
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}
