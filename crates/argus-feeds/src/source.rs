//! HTTP feed source.

use argus_core::Record;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::dates::{normalize_published, RecencyWindow};
use crate::error::FeedError;
use crate::parse::{parse_feed, FeedEntry};
use crate::Source;

const USER_AGENT: &str = concat!("argus-cti/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches a fixed list of RSS/Atom URLs.
#[derive(Debug, Clone)]
pub struct FeedSource {
    urls: Vec<Url>,
    client: reqwest::Client,
}

impl FeedSource {
    pub fn new<S: AsRef<str>>(urls: &[S]) -> Result<Self, FeedError> {
        let urls = urls
            .iter()
            .map(|raw| {
                Url::parse(raw.as_ref()).map_err(|e| FeedError::InvalidUrl {
                    url: raw.as_ref().to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { urls, client })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    async fn fetch_one(&self, url: &Url) -> Result<Vec<FeedEntry>, FeedError> {
        debug!("Fetching feed {}", url);
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let body = response.text().await?;
        parse_feed(&body)
    }
}

#[async_trait]
impl Source for FeedSource {
    async fn fetch(&self, window: RecencyWindow) -> Result<Vec<Record>, FeedError> {
        let now = Utc::now();
        let results = join_all(self.urls.iter().map(|url| self.fetch_one(url))).await;

        let mut records = Vec::new();
        for (url, result) in self.urls.iter().zip(results) {
            match result {
                Ok(entries) => {
                    let before = records.len();
                    records.extend(normalize_entries(entries, url.as_str(), window, now));
                    info!("Feed {} yielded {} recent entries", url, records.len() - before);
                }
                // One broken feed must not sink the run.
                Err(e) => error!("Failed to fetch feed {}: {}", url, e),
            }
        }
        Ok(records)
    }
}

/// Convert parsed entries to records, dropping those older than the window.
pub fn normalize_entries(
    entries: Vec<FeedEntry>,
    source: &str,
    window: RecencyWindow,
    now: DateTime<Utc>,
) -> Vec<Record> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let published = entry
                .published
                .as_deref()
                .or(entry.updated.as_deref())
                .map(normalize_published);

            if !window.contains(published.as_ref().and_then(|p| p.at), now) {
                return None;
            }

            let id = entry
                .id
                .clone()
                .or_else(|| entry.link.clone())
                .unwrap_or_default();

            Some(Record {
                id,
                title: entry.title,
                summary: entry.summary.or(entry.content),
                link: entry.link,
                published: published.map(|p| p.text),
                source: Some(source.to_string()),
                category: entry.categories,
                ..Default::default()
            })
        })
        .collect()
}
