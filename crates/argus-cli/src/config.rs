//! Feeds and filters documents.

use anyhow::{Context, Result};
use argus_core::RuleSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
pub struct FeedsDocument {
    #[serde(default)]
    pub feeds: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FiltersDocument {
    #[serde(default)]
    pub filters: Value,
}

/// Parse `path` as JSON when it ends in `.json`, as YAML otherwise. An
/// empty document yields the type's default.
pub fn load_document<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str::<Option<T>>(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str::<Option<T>>(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    };
    Ok(parsed.unwrap_or_default())
}

/// Feed URLs from the feeds document. No feeds is an error.
pub fn load_feeds(path: &Path) -> Result<Vec<String>> {
    let document: FeedsDocument = load_document(path)?;
    let feeds = document.feeds.unwrap_or_default();
    if feeds.is_empty() {
        anyhow::bail!("No RSS feeds defined in {}", path.display());
    }
    debug!("Loaded {} feed URLs from {}", feeds.len(), path.display());
    Ok(feeds)
}

/// Rule set from the filters document. `None` when the document defines
/// no rules.
pub fn load_filters(path: &Path) -> Result<Option<RuleSet>> {
    let document: FiltersDocument = load_document(path)?;
    let rules = RuleSet::from_value(&document.filters)
        .with_context(|| format!("Invalid filters in {}", path.display()))?;
    if rules.is_empty() {
        warn!("No filters defined in {}", path.display());
        return Ok(None);
    }
    Ok(Some(rules))
}
