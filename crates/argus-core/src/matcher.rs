//! Field matching: one `field: criterion` pair against one record.

use std::fmt;

use crate::record::{FieldRef, Record, CATEGORY_FIELD};
use crate::rule::{Criterion, FieldCriterion, Rule, Scalar};

/// Shape of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Text,
    List,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Text => f.write_str("text"),
            Shape::List => f.write_str("list"),
        }
    }
}

/// Why a field criterion did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    MissingField,
    /// Category was empty and the title contained none of the `in` terms.
    CategoryFallbackMiss,
    /// Category was empty and the criterion has no `in` terms.
    CategoryFallbackUnsupported,
    NotEqual,
    NotMember,
    NoPatternMatch,
    SubstringAbsent,
    UnexpectedShape { expected: Shape, found: Shape },
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::MissingField => f.write_str("field missing"),
            MismatchReason::CategoryFallbackMiss => {
                f.write_str("category empty and title contains none of the terms")
            }
            MismatchReason::CategoryFallbackUnsupported => {
                f.write_str("category empty and criterion has no 'in' terms for the title fallback")
            }
            MismatchReason::NotEqual => f.write_str("value not equal"),
            MismatchReason::NotMember => f.write_str("no allowed value present"),
            MismatchReason::NoPatternMatch => f.write_str("pattern not found"),
            MismatchReason::SubstringAbsent => f.write_str("substring not found"),
            MismatchReason::UnexpectedShape { expected, found } => {
                write!(f, "expected {} value, got {}", expected, found)
            }
        }
    }
}

/// Non-fatal: a field had a shape the criterion cannot test. Degrades to
/// a non-match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvaluationWarning {
    pub record_id: String,
    pub field: String,
    pub expected: Shape,
    pub found: Shape,
}

impl fmt::Display for MatchEvaluationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record '{}' field '{}': expected {} value, got {}",
            self.record_id, self.field, self.expected, self.found
        )
    }
}

/// First failing condition of a rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleMismatch<'r> {
    pub condition: &'r FieldCriterion,
    pub reason: MismatchReason,
}

impl FieldCriterion {
    /// Evaluate this condition. Never panics, whatever the record holds.
    pub fn evaluate(&self, record: &Record) -> Result<(), MismatchReason> {
        if self.field == CATEGORY_FIELD && record.category.is_empty() {
            return self.category_fallback(record);
        }

        let value = record
            .field(&self.field)
            .ok_or(MismatchReason::MissingField)?;
        self.criterion.test(&value)
    }

    // With no categories, search the title for the `in` terms, ignoring
    // case. The terms are used even when another operator takes precedence.
    fn category_fallback(&self, record: &Record) -> Result<(), MismatchReason> {
        let Some(terms) = &self.fallback_terms else {
            return Err(MismatchReason::CategoryFallbackUnsupported);
        };

        let title = record.title.as_deref().unwrap_or_default().to_lowercase();
        let hit = terms
            .iter()
            .filter_map(Scalar::as_text)
            .any(|term| title.contains(&term.to_lowercase()));

        if hit {
            Ok(())
        } else {
            Err(MismatchReason::CategoryFallbackMiss)
        }
    }
}

impl Criterion {
    /// Test a present field value.
    pub fn test(&self, value: &FieldRef<'_>) -> Result<(), MismatchReason> {
        let matched = match self {
            Criterion::Equals(expected) => match value {
                FieldRef::Text(text) => expected.as_text() == Some(*text),
                FieldRef::List(_) => {
                    return Err(MismatchReason::UnexpectedShape {
                        expected: Shape::Text,
                        found: Shape::List,
                    })
                }
            },
            Criterion::In(allowed) => match value {
                FieldRef::Text(text) => is_member(allowed, text),
                FieldRef::List(items) => items.iter().any(|item| is_member(allowed, item)),
            },
            Criterion::Matches(pattern) => pattern.is_match(&value.render()),
            Criterion::Contains(needle) => value.render().to_lowercase().contains(needle.as_str()),
        };

        if matched {
            Ok(())
        } else {
            Err(self.miss())
        }
    }

    fn miss(&self) -> MismatchReason {
        match self {
            Criterion::Equals(_) => MismatchReason::NotEqual,
            Criterion::In(_) => MismatchReason::NotMember,
            Criterion::Matches(_) => MismatchReason::NoPatternMatch,
            Criterion::Contains(_) => MismatchReason::SubstringAbsent,
        }
    }
}

impl Rule {
    /// AND across conditions, stopping at the first failure. An empty rule
    /// matches.
    pub fn evaluate(&self, record: &Record) -> Result<(), RuleMismatch<'_>> {
        for condition in &self.conditions {
            condition
                .evaluate(record)
                .map_err(|reason| RuleMismatch { condition, reason })?;
        }
        Ok(())
    }
}

fn is_member(allowed: &[Scalar], value: &str) -> bool {
    allowed.iter().any(|a| a.as_text() == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::rule::{Operator, RuleSet};
    use serde_json::json;

    fn condition(rule: serde_json::Value) -> FieldCriterion {
        let rules = RuleSet::from_value(&json!([rule])).unwrap();
        rules.rules()[0].conditions[0].clone()
    }

    // --- equals ---
    #[test]
    fn test_equals_text() {
        let c = condition(json!({"source": {"equals": "https://feed/a"}}));
        let mut record = Record::new("1");
        record.source = Some("https://feed/a".to_string());
        assert_eq!(c.evaluate(&record), Ok(()));
        record.source = Some("https://feed/b".to_string());
        assert_eq!(c.evaluate(&record), Err(MismatchReason::NotEqual));
    }

    #[test]
    fn test_equals_is_case_sensitive() {
        let c = condition(json!({"title": {"equals": "Alert"}}));
        assert_eq!(
            c.evaluate(&Record::new("1").with_title("alert")),
            Err(MismatchReason::NotEqual)
        );
    }

    #[test]
    fn test_equals_number_never_matches_text() {
        let c = condition(json!({"title": {"equals": 5}}));
        assert_eq!(
            c.evaluate(&Record::new("1").with_title("5")),
            Err(MismatchReason::NotEqual)
        );
    }

    #[test]
    fn test_equals_against_list_is_unexpected_shape() {
        let c = condition(json!({"category": {"equals": "cisco"}}));
        let record = Record::new("1").with_category(["cisco"]);
        assert_eq!(
            c.evaluate(&record),
            Err(MismatchReason::UnexpectedShape {
                expected: Shape::Text,
                found: Shape::List
            })
        );
    }

    // --- in ---
    #[test]
    fn test_in_scalar_membership() {
        let c = condition(json!({"vendor": {"in": ["cisco", "f5"]}}));
        let hit = Record::new("1").with_extra("vendor", FieldValue::Text("f5".to_string()));
        let miss = Record::new("2").with_extra("vendor", FieldValue::Text("F5".to_string()));
        assert_eq!(c.evaluate(&hit), Ok(()));
        assert_eq!(c.evaluate(&miss), Err(MismatchReason::NotMember));
    }

    #[test]
    fn test_in_list_intersection() {
        let c = condition(json!({"category": {"in": ["Vulnerabilities", "Malware"]}}));
        let hit = Record::new("1").with_category(["News", "Malware"]);
        let miss = Record::new("2").with_category(["News"]);
        assert_eq!(c.evaluate(&hit), Ok(()));
        assert_eq!(c.evaluate(&miss), Err(MismatchReason::NotMember));
    }

    #[test]
    fn test_in_against_tag_kind() {
        let c = condition(json!({"tags.sector": {"in": ["banking"]}}));
        let record = Record::new("1").with_tag("sector", "banking");
        assert_eq!(c.evaluate(&record), Ok(()));
    }

    #[test]
    fn test_in_empty_list_never_matches() {
        let c = condition(json!({"title": {"in": []}}));
        assert_eq!(
            c.evaluate(&Record::new("1").with_title("anything")),
            Err(MismatchReason::NotMember)
        );
    }

    // --- matches ---
    #[test]
    fn test_matches_uses_search_semantics() {
        let c = condition(json!({"summary": {"matches": "CVE-\\d{4}-\\d{4,7}"}}));
        let hit = Record::new("1").with_summary("Patch for CVE-2023-12345 released");
        let miss = Record::new("2").with_summary("Tracked as CVE-23-1");
        assert_eq!(c.evaluate(&hit), Ok(()));
        assert_eq!(c.evaluate(&miss), Err(MismatchReason::NoPatternMatch));
    }

    #[test]
    fn test_matches_against_list_string_form() {
        let c = condition(json!({"category": {"matches": "^\\[.*Ransom"}}));
        let record = Record::new("1").with_category(["News", "Ransomware"]);
        assert_eq!(c.evaluate(&record), Ok(()));
    }

    // --- contains ---
    #[test]
    fn test_contains_case_insensitive() {
        let c = condition(json!({"title": {"contains": "ransomware"}}));
        assert_eq!(c.evaluate(&Record::new("1").with_title("New Ransomware Strain")), Ok(()));
        assert_eq!(
            c.evaluate(&Record::new("2").with_title("Phishing wave")),
            Err(MismatchReason::SubstringAbsent)
        );
    }

    #[test]
    fn test_contains_mixed_case_needle() {
        let c = condition(json!({"title": {"contains": "LockBit"}}));
        assert_eq!(c.evaluate(&Record::new("1").with_title("lockbit 3.0 returns")), Ok(()));
    }

    // --- missing fields ---
    #[test]
    fn test_missing_field_fails_for_every_operator() {
        let record = Record::new("1").with_title("Fortinet advisory");
        for criterion in [
            json!({"equals": "fortinet"}),
            json!({"in": ["fortinet"]}),
            json!({"matches": ".*"}),
            json!({"contains": ""}),
        ] {
            let c = condition(json!({"vendor": criterion}));
            assert_eq!(c.evaluate(&record), Err(MismatchReason::MissingField));
        }
    }

    #[test]
    fn test_missing_optional_text_field() {
        let c = condition(json!({"summary": {"contains": "x"}}));
        assert_eq!(c.evaluate(&Record::new("1")), Err(MismatchReason::MissingField));
    }

    // --- category fallback ---
    #[test]
    fn test_category_fallback_searches_title() {
        let c = condition(json!({"category": {"in": ["fortinet"]}}));
        let record = Record::new("1").with_title("Fortinet FortiOS Vulnerability");
        assert_eq!(c.evaluate(&record), Ok(()));
    }

    #[test]
    fn test_category_fallback_mixed_case_terms() {
        let c = condition(json!({"category": {"in": ["Palo Alto"]}}));
        let record = Record::new("1").with_title("PALO ALTO PAN-OS flaw exploited");
        assert_eq!(c.evaluate(&record), Ok(()));
    }

    #[test]
    fn test_category_fallback_only_when_empty() {
        let c = condition(json!({"category": {"in": ["fortinet"]}}));
        let record = Record::new("1")
            .with_title("Fortinet FortiOS Vulnerability")
            .with_category(["other"]);
        assert_eq!(c.evaluate(&record), Err(MismatchReason::NotMember));
    }

    #[test]
    fn test_category_fallback_miss() {
        let c = condition(json!({"category": {"in": ["cisco"]}}));
        let record = Record::new("1").with_title("Fortinet FortiOS Vulnerability");
        assert_eq!(c.evaluate(&record), Err(MismatchReason::CategoryFallbackMiss));
    }

    #[test]
    fn test_category_fallback_without_title() {
        let c = condition(json!({"category": {"in": ["cisco"]}}));
        assert_eq!(
            c.evaluate(&Record::new("1")),
            Err(MismatchReason::CategoryFallbackMiss)
        );
    }

    #[test]
    fn test_category_fallback_not_for_other_operators() {
        let record = Record::new("1").with_title("Fortinet FortiOS Vulnerability");
        for criterion in [
            json!({"equals": "fortinet"}),
            json!({"matches": "(?i)fortinet"}),
            json!({"contains": "fortinet"}),
        ] {
            let c = condition(json!({"category": criterion}));
            assert_eq!(
                c.evaluate(&record),
                Err(MismatchReason::CategoryFallbackUnsupported)
            );
        }
    }

    #[test]
    fn test_category_fallback_uses_shadowed_in_terms() {
        let c = condition(json!({"category": {"equals": "Fortinet", "in": ["fortinet"]}}));
        assert_eq!(c.criterion.operator(), Operator::Equals);

        let hit = Record::new("1").with_title("Fortinet FortiOS Vulnerability");
        assert_eq!(c.evaluate(&hit), Ok(()));
        let miss = Record::new("2").with_title("Cisco IOS XE flaw");
        assert_eq!(c.evaluate(&miss), Err(MismatchReason::CategoryFallbackMiss));

        // With categories present the applied operator decides.
        let categorized = hit.clone().with_category(["fortinet"]);
        assert!(matches!(
            c.evaluate(&categorized),
            Err(MismatchReason::UnexpectedShape { .. })
        ));
    }

    #[test]
    fn test_category_fallback_ignores_non_text_terms() {
        let c = condition(json!({"category": {"in": [42, "fortinet"]}}));
        let record = Record::new("1").with_title("Fortinet 42 bulletin");
        assert_eq!(c.evaluate(&record), Ok(()));
    }

    // --- rule evaluation ---
    #[test]
    fn test_rule_requires_all_conditions() {
        let rules = RuleSet::from_value(&json!([
            {"title": {"contains": "ransomware"}, "summary": {"contains": "hospital"}}
        ]))
        .unwrap();
        let rule = &rules.rules()[0];
        let both = Record::new("1")
            .with_title("Ransomware hits")
            .with_summary("A hospital network was encrypted");
        let one = Record::new("2")
            .with_title("Ransomware hits")
            .with_summary("A retailer was encrypted");
        assert!(rule.evaluate(&both).is_ok());
        let mismatch = rule.evaluate(&one).unwrap_err();
        assert_eq!(mismatch.condition.field, "summary");
        assert_eq!(mismatch.reason, MismatchReason::SubstringAbsent);
    }

    #[test]
    fn test_rule_stops_at_first_failure() {
        let rules = RuleSet::from_value(&json!([
            {"vendor": {"equals": "x"}, "title": {"contains": "nope"}}
        ]))
        .unwrap();
        let mismatch = rules.rules()[0].evaluate(&Record::new("1")).unwrap_err();
        assert_eq!(mismatch.condition.field, "vendor");
        assert_eq!(mismatch.reason, MismatchReason::MissingField);
    }

    #[test]
    fn test_empty_rule_matches_vacuously() {
        assert!(Rule::default().evaluate(&Record::new("1")).is_ok());
    }

    #[test]
    fn test_reason_display() {
        let reason = MismatchReason::UnexpectedShape {
            expected: Shape::Text,
            found: Shape::List,
        };
        assert_eq!(reason.to_string(), "expected text value, got list");
    }
}
