//! Sector, vendor and CVE tag inference.

use argus_core::{Record, Tags};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use crate::classifier::{HfInferenceClient, KeywordClassifier, ZeroShotClassifier};
use crate::config::EnrichConfig;
use crate::error::EnrichError;
use crate::Enricher;

pub const SECTOR_KIND: &str = "sector";
pub const VENDOR_KIND: &str = "vendor";
pub const CVE_KIND: &str = "cve";

static CVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"CVE-\d{4}-\d{4,7}")
        .case_insensitive(true)
        .build()
        .expect("CVE pattern is valid")
});

/// CVE identifiers in `text`, upper-cased and deduplicated.
pub fn extract_cves(text: &str) -> BTreeSet<String> {
    CVE_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_uppercase())
        .collect()
}

/// Classifies a record against candidate sectors and vendors.
pub struct TagInferer {
    classifier: Arc<dyn ZeroShotClassifier>,
    sectors: Vec<String>,
    vendors: Vec<String>,
    threshold: f32,
}

impl TagInferer {
    pub fn new(
        classifier: Arc<dyn ZeroShotClassifier>,
        sectors: Vec<String>,
        vendors: Vec<String>,
        threshold: f32,
    ) -> Self {
        Self {
            classifier,
            sectors,
            vendors,
            threshold,
        }
    }

    /// Uses the hosted classifier when a token is configured, the keyword
    /// classifier otherwise.
    pub fn from_config(config: &EnrichConfig) -> Self {
        let classifier: Arc<dyn ZeroShotClassifier> = match &config.api_token {
            Some(token) => {
                info!("Tag inference via hosted model {}", config.model);
                Arc::new(HfInferenceClient::new(
                    config.api_base.clone(),
                    config.model.clone(),
                    token.clone(),
                ))
            }
            None => {
                info!("HF_API_TOKEN not set, using keyword tag inference");
                Arc::new(KeywordClassifier)
            }
        };
        Self::new(
            classifier,
            config.sectors.clone(),
            config.vendors.clone(),
            config.threshold,
        )
    }

    pub async fn infer(&self, record: &Record) -> Result<Tags, EnrichError> {
        let text = format!(
            "{} {}",
            record.title.as_deref().unwrap_or_default(),
            record.summary.as_deref().unwrap_or_default()
        );

        let mut sectors = BTreeSet::new();
        let mut vendors = BTreeSet::new();

        let labels: Vec<String> = self.sectors.iter().chain(&self.vendors).cloned().collect();
        if !labels.is_empty() {
            let scores = self.classifier.classify(&text, &labels).await?;
            for scored in scores.into_iter().filter(|s| s.score >= self.threshold) {
                if contains_ignore_case(&self.sectors, &scored.label) {
                    sectors.insert(scored.label);
                } else if contains_ignore_case(&self.vendors, &scored.label) {
                    vendors.insert(scored.label);
                }
            }
        }

        let cves = extract_cves(&text);
        debug!(
            record_id = %record.id,
            sectors = sectors.len(),
            vendors = vendors.len(),
            cves = cves.len(),
            "Inferred tags"
        );

        let mut tags = Tags::new();
        tags.insert(SECTOR_KIND.to_string(), sectors);
        tags.insert(VENDOR_KIND.to_string(), vendors);
        tags.insert(CVE_KIND.to_string(), cves);
        Ok(tags)
    }
}

fn contains_ignore_case(candidates: &[String], label: &str) -> bool {
    candidates.iter().any(|c| c.eq_ignore_ascii_case(label))
}

#[async_trait]
impl Enricher for TagInferer {
    async fn enrich(&self, record: &Record) -> Result<Tags, EnrichError> {
        self.infer(record).await
    }
}
