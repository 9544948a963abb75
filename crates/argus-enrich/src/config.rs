//! Enrichment configuration from environment variables.

use anyhow::{Context, Result};

pub const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";
pub const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_SECTORS: &[&str] = &["banking", "healthcare", "energy", "government"];
pub const DEFAULT_VENDORS: &[&str] = &["fortinet", "f5", "cisco", "palo alto"];
pub const DEFAULT_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichConfig {
    /// None = offline keyword classifier.
    pub api_token: Option<String>,
    pub model: String,
    pub api_base: String,
    pub sectors: Vec<String>,
    pub vendors: Vec<String>,
    /// Minimum score for a label to become a tag.
    pub threshold: f32,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            sectors: DEFAULT_SECTORS.iter().map(|s| s.to_string()).collect(),
            vendors: DEFAULT_VENDORS.iter().map(|s| s.to_string()).collect(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EnrichConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let threshold: f32 = match std::env::var("ARGUS_TAG_THRESHOLD") {
            Ok(raw) => raw.trim().parse().context("Invalid ARGUS_TAG_THRESHOLD")?,
            Err(_) => defaults.threshold,
        };
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("ARGUS_TAG_THRESHOLD must be between 0 and 1, got {}", threshold);
        }

        Ok(Self {
            api_token: std::env::var("HF_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            model: std::env::var("HF_MODEL").unwrap_or(defaults.model),
            api_base: std::env::var("HF_API_BASE").unwrap_or(defaults.api_base),
            sectors: std::env::var("ARGUS_SECTORS")
                .map(|raw| split_labels(&raw))
                .unwrap_or(defaults.sectors),
            vendors: std::env::var("ARGUS_VENDORS")
                .map(|raw| split_labels(&raw))
                .unwrap_or(defaults.vendors),
            threshold,
        })
    }
}

fn split_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "HF_API_TOKEN",
            "HF_MODEL",
            "HF_API_BASE",
            "ARGUS_SECTORS",
            "ARGUS_VENDORS",
            "ARGUS_TAG_THRESHOLD",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn from_env_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = EnrichConfig::from_env().unwrap();
        assert_eq!(config, EnrichConfig::default());
        assert!(config.api_token.is_none());
        assert_eq!(config.vendors, vec!["fortinet", "f5", "cisco", "palo alto"]);
    }

    #[test]
    fn from_env_with_all_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe {
            std::env::set_var("HF_API_TOKEN", "hf_test");
            std::env::set_var("HF_MODEL", "MoritzLaurer/deberta-v3-base-zeroshot");
            std::env::set_var("HF_API_BASE", "http://localhost:8080");
            std::env::set_var("ARGUS_SECTORS", "finance, telecom ,,");
            std::env::set_var("ARGUS_VENDORS", "ivanti");
            std::env::set_var("ARGUS_TAG_THRESHOLD", "0.8");
        }

        let config = EnrichConfig::from_env().unwrap();
        assert_eq!(config.api_token.as_deref(), Some("hf_test"));
        assert_eq!(config.model, "MoritzLaurer/deberta-v3-base-zeroshot");
        assert_eq!(config.api_base, "http://localhost:8080");
        assert_eq!(config.sectors, vec!["finance", "telecom"]);
        assert_eq!(config.vendors, vec!["ivanti"]);
        assert!((config.threshold - 0.8).abs() < f32::EPSILON);

        clear_env();
    }

    #[test]
    fn from_env_blank_token_means_offline() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe { std::env::set_var("HF_API_TOKEN", "  ") };
        assert!(EnrichConfig::from_env().unwrap().api_token.is_none());

        clear_env();
    }

    #[test]
    fn from_env_invalid_threshold() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        unsafe { std::env::set_var("ARGUS_TAG_THRESHOLD", "high") };
        let err = EnrichConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ARGUS_TAG_THRESHOLD"));

        unsafe { std::env::set_var("ARGUS_TAG_THRESHOLD", "1.5") };
        assert!(EnrichConfig::from_env().is_err());

        clear_env();
    }
}
