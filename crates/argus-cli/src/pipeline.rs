//! One ingestion run: fetch, enrich, filter, dedup, publish, persist.

use anyhow::{Context, Result};
use argus_core::FilterEngine;
use argus_enrich::{enrich_all, Enricher};
use argus_feeds::{RecencyWindow, Source};
use argus_misp::{EventSink, Publication};
use argus_store::SeenStore;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

/// Records enriched concurrently.
const ENRICH_CONCURRENCY: usize = 4;
/// Batches at least this large are filtered on the rayon pool.
const PARALLEL_FILTER_THRESHOLD: usize = 256;

/// Counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub selected: usize,
    pub already_seen: usize,
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
    /// Records a dry run would have published.
    pub planned: usize,
}

impl RunReport {
    /// Ids newly marked as seen.
    pub fn new_entries(&self) -> usize {
        self.created + self.existing
    }
}

pub struct Pipeline {
    source: Box<dyn Source>,
    enricher: Box<dyn Enricher>,
    /// None = no rules, every record passes.
    filter: Option<FilterEngine>,
    /// None = dry run.
    sink: Option<Box<dyn EventSink>>,
    store: SeenStore,
    window: RecencyWindow,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn Source>,
        enricher: Box<dyn Enricher>,
        filter: Option<FilterEngine>,
        sink: Option<Box<dyn EventSink>>,
        store: SeenStore,
        window: RecencyWindow,
    ) -> Self {
        Self {
            source,
            enricher,
            filter,
            sink,
            store,
            window,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.sink.is_none()
    }

    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        let records = self
            .source
            .fetch(self.window)
            .await
            .context("Failed to fetch feeds")?;
        report.fetched = records.len();
        info!("Fetched {} entries", report.fetched);

        let records = enrich_all(self.enricher.as_ref(), records, ENRICH_CONCURRENCY).await;
        info!("Completed inference tagging");

        let selected = match &self.filter {
            Some(engine) if records.len() >= PARALLEL_FILTER_THRESHOLD => {
                engine.filter_parallel(records)
            }
            Some(engine) => engine.filter(records),
            None => {
                warn!("No filters defined; passing all entries through");
                records
            }
        };
        report.selected = selected.len();
        info!("{} entries match filters", report.selected);

        let mut seen = self.store.load();
        let mut handled = BTreeSet::new();

        for record in &selected {
            if seen.contains(&record.id) || handled.contains(&record.id) {
                info!("Skipping already-processed {}", record.id);
                report.already_seen += 1;
                continue;
            }

            let Some(sink) = &self.sink else {
                info!(
                    "[dry-run] Would publish {} '{}'",
                    record.id,
                    record.title.as_deref().unwrap_or_default()
                );
                report.planned += 1;
                handled.insert(record.id.clone());
                continue;
            };

            match sink.publish(record).await {
                Ok(Publication::Created { event_id }) => {
                    info!("Published {} as event {}", record.id, event_id);
                    report.created += 1;
                    handled.insert(record.id.clone());
                }
                Ok(Publication::AlreadyExists) => {
                    report.existing += 1;
                    handled.insert(record.id.clone());
                }
                // Left unmarked so the next run retries it.
                Err(e) => {
                    error!("Failed to publish {}: {}", record.id, e);
                    report.failed += 1;
                }
            }
        }

        if self.is_dry_run() {
            info!("[dry-run] {} entries would be published", report.planned);
            return Ok(report);
        }

        seen.extend(handled);
        self.store
            .save(&seen)
            .with_context(|| format!("Failed to save seen ids to {:?}", self.store.path()))?;
        info!("Processed {} new entries", report.new_entries());
        Ok(report)
    }
}
