//! Argus Enrich - Tag inference for feed records
//!
//! This crate provides:
//! - Zero-shot label classification (hosted inference API or offline keywords)
//! - CVE identifier extraction
//! - The [`Enricher`] seam the pipeline drives

pub mod classifier;
pub mod config;
pub mod error;
pub mod inferer;

pub use classifier::{HfInferenceClient, KeywordClassifier, LabelScore, ZeroShotClassifier};
pub use config::EnrichConfig;
pub use error::EnrichError;
pub use inferer::{extract_cves, TagInferer};

use argus_core::{Record, Tags};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::warn;

/// Attaches inferred tags to a record.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, record: &Record) -> Result<Tags, EnrichError>;
}

/// Enrich a batch, keeping input order. A record whose enrichment fails
/// keeps empty tags.
pub async fn enrich_all<E>(enricher: &E, records: Vec<Record>, concurrency: usize) -> Vec<Record>
where
    E: Enricher + ?Sized,
{
    stream::iter(records)
        .map(|mut record| async move {
            match enricher.enrich(&record).await {
                Ok(tags) => record.tags = tags,
                Err(e) => {
                    warn!(record_id = %record.id, "Enrichment failed: {}", e);
                    record.tags = Tags::default();
                }
            }
            record
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}
