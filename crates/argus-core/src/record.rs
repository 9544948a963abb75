//! Normalized, enriched feed record.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

/// Field name with the title fallback in the matcher.
pub const CATEGORY_FIELD: &str = "category";

/// Prefix addressing one tag kind, e.g. `tags.vendor`.
pub const TAGS_PREFIX: &str = "tags.";

/// Inferred tags keyed by kind ("sector", "vendor", "cve").
pub type Tags = BTreeMap<String, BTreeSet<String>>;

/// Value of an upstream field the record model has no slot for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

/// One feed item as produced by a source and decorated by an enricher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Dedup key. Uniqueness is assumed upstream.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// ISO-8601 date-time, or the raw feed string when it could not be parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub tags: Tags,
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

/// Borrowed view of a field value as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Text(&'a str),
    List(Vec<Cow<'a, str>>),
}

impl FieldRef<'_> {
    /// String form used by `matches` and `contains`. Lists render as `[a, b]`.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            FieldRef::Text(text) => Cow::Borrowed(text),
            FieldRef::List(items) => Cow::Owned(format!("[{}]", items.join(", "))),
        }
    }
}

impl<'a> From<&'a FieldValue> for FieldRef<'a> {
    fn from(value: &'a FieldValue) -> Self {
        match value {
            FieldValue::Text(text) => FieldRef::Text(text),
            FieldValue::List(items) => {
                FieldRef::List(items.iter().map(|i| Cow::Borrowed(i.as_str())).collect())
            }
        }
    }
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_category<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tag(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.entry(kind.into()).or_default().insert(value.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Resolve a rule field name against this record.
    ///
    /// Typed fields win over `extra`. `tags.<kind>` addresses one tag kind;
    /// bare `tags` yields every tag as `kind:value`. Returns `None` when the
    /// field is absent.
    pub fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "id" => Some(FieldRef::Text(&self.id)),
            "title" => self.title.as_deref().map(FieldRef::Text),
            "summary" => self.summary.as_deref().map(FieldRef::Text),
            "link" => self.link.as_deref().map(FieldRef::Text),
            "published" => self.published.as_deref().map(FieldRef::Text),
            "source" => self.source.as_deref().map(FieldRef::Text),
            CATEGORY_FIELD => Some(FieldRef::List(
                self.category.iter().map(|c| Cow::Borrowed(c.as_str())).collect(),
            )),
            "tags" => Some(FieldRef::List(
                self.tag_labels().into_iter().map(Cow::Owned).collect(),
            )),
            _ => match name.strip_prefix(TAGS_PREFIX) {
                Some(kind) => self.tags.get(kind).map(|values| {
                    FieldRef::List(values.iter().map(|v| Cow::Borrowed(v.as_str())).collect())
                }),
                None => self.extra.get(name).map(FieldRef::from),
            },
        }
    }

    /// Every tag rendered as `kind:value`, ordered by kind then value.
    pub fn tag_labels(&self) -> Vec<String> {
        self.tags
            .iter()
            .flat_map(|(kind, values)| values.iter().map(move |v| format!("{}:{}", kind, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_fields_resolve() {
        let record = Record::new("a1").with_title("Hello").with_link("https://x");
        assert_eq!(record.field("id"), Some(FieldRef::Text("a1")));
        assert_eq!(record.field("title"), Some(FieldRef::Text("Hello")));
        assert_eq!(record.field("link"), Some(FieldRef::Text("https://x")));
        assert_eq!(record.field("summary"), None);
    }

    #[test]
    fn test_unknown_field_is_missing() {
        let record = Record::new("a1");
        assert!(record.field("vendor").is_none());
    }

    #[test]
    fn test_dotted_tag_kind() {
        let record = Record::new("a1")
            .with_tag("vendor", "fortinet")
            .with_tag("vendor", "cisco");
        match record.field("tags.vendor") {
            Some(FieldRef::List(items)) => assert_eq!(items, vec!["cisco", "fortinet"]),
            other => panic!("Expected tag list, got {:?}", other),
        }
        assert!(record.field("tags.sector").is_none());
    }

    #[test]
    fn test_bare_tags_render_as_labels() {
        let record = Record::new("a1")
            .with_tag("sector", "banking")
            .with_tag("cve", "CVE-2024-1234");
        assert_eq!(
            record.tag_labels(),
            vec!["cve:CVE-2024-1234".to_string(), "sector:banking".to_string()]
        );
        let rendered = record.field("tags").unwrap().render().into_owned();
        assert_eq!(rendered, "[cve:CVE-2024-1234, sector:banking]");
    }

    #[test]
    fn test_list_renders_unquoted_in_brackets() {
        let record = Record::new("a1").with_category(["News", "Malware"]);
        let rendered = record.field("category").unwrap().render().into_owned();
        assert_eq!(rendered, "[News, Malware]");

        let empty = Record::new("a2");
        assert_eq!(empty.field("category").unwrap().render(), "[]");
    }

    #[test]
    fn test_extra_fields_resolve() {
        let record = Record::new("a1")
            .with_extra("vendor", FieldValue::Text("f5".to_string()))
            .with_extra("regions", FieldValue::List(vec!["eu".to_string()]));
        assert_eq!(record.field("vendor"), Some(FieldRef::Text("f5")));
        assert!(matches!(record.field("regions"), Some(FieldRef::List(ref l)) if l.len() == 1));
    }

    #[test]
    fn test_deserialize_with_extras() {
        let json = r#"{
            "id": "urn:1",
            "title": "Patch Tuesday",
            "category": ["Microsoft"],
            "tags": {"cve": ["CVE-2024-0001"]},
            "vendor": "microsoft"
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "urn:1");
        assert_eq!(record.category, vec!["Microsoft"]);
        assert!(record.tags["cve"].contains("CVE-2024-0001"));
        assert_eq!(
            record.extra.get("vendor"),
            Some(&FieldValue::Text("microsoft".to_string()))
        );
    }

    #[test]
    fn test_missing_category_defaults_to_empty() {
        let record: Record = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(record.category.is_empty());
        assert!(record.tags.is_empty());
    }
}
