//! MISP event payloads.

use argus_core::Record;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MispError;

/// Analysis: ongoing.
pub const ANALYSIS_ONGOING: u8 = 1;
/// Threat level: low.
pub const THREAT_LEVEL_LOW: u8 = 3;
/// Distribution: your organisation only.
pub const DISTRIBUTION_ORG: u8 = 0;

const LINK_CATEGORY: &str = "External analysis";
const TAG_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MispAttribute {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub value: String,
    pub to_ids: bool,
}

impl MispAttribute {
    fn new(kind: &str, category: &str, value: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            category: category.to_string(),
            value: value.into(),
            to_ids: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MispEvent {
    pub uuid: Uuid,
    pub info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub analysis: u8,
    pub threat_level_id: u8,
    pub distribution: u8,
    #[serde(rename = "Attribute")]
    pub attributes: Vec<MispAttribute>,
}

/// Build the event for `record`. The title becomes the event info and is
/// required; every other field is optional.
pub fn build_event(record: &Record) -> Result<MispEvent, MispError> {
    let info = record
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MispError::MissingField {
            record_id: record.id.clone(),
            field: "title",
        })?;

    let date = record
        .published
        .as_deref()
        .map(|p| p.chars().take(10).collect::<String>())
        .filter(|d| !d.is_empty());

    let mut attributes = Vec::new();
    if let Some(link) = record.link.as_deref().filter(|l| !l.is_empty()) {
        attributes.push(MispAttribute::new("url", LINK_CATEGORY, link));
    }
    for (kind, values) in &record.tags {
        for value in values {
            attributes.push(MispAttribute::new(
                "text",
                TAG_CATEGORY,
                format!("{}:{}", kind, value),
            ));
        }
    }
    for category in &record.category {
        attributes.push(MispAttribute::new(
            "text",
            TAG_CATEGORY,
            format!("category:{}", category),
        ));
    }

    Ok(MispEvent {
        uuid: Uuid::new_v4(),
        info: info.to_string(),
        date,
        analysis: ANALYSIS_ONGOING,
        threat_level_id: THREAT_LEVEL_LOW,
        distribution: DISTRIBUTION_ORG,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        Record::new("news-1001")
            .with_title("Fortinet FortiOS Vulnerability")
            .with_link("https://news.example/fortios")
            .with_category(["Vulnerabilities", "Fortinet"])
            .with_tag("vendor", "fortinet")
            .with_tag("cve", "CVE-2024-21762")
            .with_tag("sector", "government")
    }

    fn values(event: &MispEvent) -> Vec<(&str, &str, &str)> {
        event
            .attributes
            .iter()
            .map(|a| (a.kind.as_str(), a.category.as_str(), a.value.as_str()))
            .collect()
    }

    #[test]
    fn test_event_header() {
        let mut r = record();
        r.published = Some("2024-01-02T10:30:00".to_string());
        let event = build_event(&r).unwrap();
        assert_eq!(event.info, "Fortinet FortiOS Vulnerability");
        assert_eq!(event.date.as_deref(), Some("2024-01-02"));
        assert_eq!(event.analysis, 1);
        assert_eq!(event.threat_level_id, 3);
        assert_eq!(event.distribution, 0);
    }

    #[test]
    fn test_attributes_in_order() {
        let event = build_event(&record()).unwrap();
        assert_eq!(
            values(&event),
            vec![
                ("url", "External analysis", "https://news.example/fortios"),
                ("text", "Other", "cve:CVE-2024-21762"),
                ("text", "Other", "sector:government"),
                ("text", "Other", "vendor:fortinet"),
                ("text", "Other", "category:Vulnerabilities"),
                ("text", "Other", "category:Fortinet"),
            ]
        );
        assert!(event.attributes.iter().all(|a| !a.to_ids));
    }

    #[test]
    fn test_title_required() {
        let mut r = record();
        r.title = Some("   ".to_string());
        assert!(matches!(
            build_event(&r),
            Err(MispError::MissingField { field: "title", .. })
        ));
    }

    #[test]
    fn test_optional_fields_absent() {
        let event = build_event(&Record::new("x").with_title("Bare")).unwrap();
        assert!(event.date.is_none());
        assert!(event.attributes.is_empty());
    }

    #[test]
    fn test_raw_published_prefix() {
        let mut r = record();
        r.published = Some("Tue".to_string());
        assert_eq!(build_event(&r).unwrap().date.as_deref(), Some("Tue"));
    }

    #[test]
    fn test_wire_shape() {
        let event = build_event(&Record::new("x").with_title("Bare").with_link("https://l")).unwrap();
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["info"], "Bare");
        assert!(value.get("date").is_none());
        assert_eq!(
            value["Attribute"],
            json!([{"type": "url", "category": "External analysis", "value": "https://l", "to_ids": false}])
        );
        assert_eq!(value["uuid"], event.uuid.to_string());
    }
}
