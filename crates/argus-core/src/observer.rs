//! Diagnostic observers injected into the filter engine.

use tracing::{debug, warn};

use crate::matcher::{MatchEvaluationWarning, MismatchReason};
use crate::rule::Criterion;

/// One failed rule for a record that no rule selected.
#[derive(Debug, Clone, Copy)]
pub struct Rejection<'a> {
    pub record_id: &'a str,
    pub rule: usize,
    pub field: &'a str,
    pub criterion: &'a Criterion,
    pub reason: MismatchReason,
}

/// Receives match diagnostics. Must not influence selection.
pub trait MatchObserver: Send + Sync {
    /// Called once per rule for every rejected record.
    fn rejected(&self, rejection: &Rejection<'_>);

    fn warning(&self, warning: &MatchEvaluationWarning);

    fn selected(&self, _record_id: &str, _rule: usize) {}
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MatchObserver for TracingObserver {
    fn rejected(&self, rejection: &Rejection<'_>) {
        debug!(
            record_id = rejection.record_id,
            rule = rejection.rule,
            field = rejection.field,
            criterion = %rejection.criterion,
            reason = %rejection.reason,
            "Record rejected by rule"
        );
    }

    fn warning(&self, warning: &MatchEvaluationWarning) {
        warn!(
            record_id = %warning.record_id,
            field = %warning.field,
            expected = %warning.expected,
            found = %warning.found,
            "Unexpected field shape; treating as no match"
        );
    }

    fn selected(&self, record_id: &str, rule: usize) {
        debug!(record_id, rule, "Record selected");
    }
}

/// Discards all diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MatchObserver for NoopObserver {
    fn rejected(&self, _rejection: &Rejection<'_>) {}

    fn warning(&self, _warning: &MatchEvaluationWarning) {}
}
