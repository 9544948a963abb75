//! Zero-shot label classifiers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::EnrichError;

/// Score assigned to one candidate label.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Scores `text` against each candidate label independently.
#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, EnrichError>;
}

/// Client for the hosted zero-shot classification endpoint.
pub struct HfInferenceClient {
    api_base: String,
    model: String,
    token: String,
    client: reqwest::Client,
}

impl HfInferenceClient {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            model: model.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.api_base.trim_end_matches('/'), self.model)
    }
}

// The token stays out of logs.
impl fmt::Debug for HfInferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HfInferenceClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// The endpoint answers either column-wise or as a list of pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f32> },
    Pairs(Vec<LabelScore>),
}

impl ZeroShotResponse {
    fn into_scores(self) -> Result<Vec<LabelScore>, EnrichError> {
        match self {
            ZeroShotResponse::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(EnrichError::InvalidResponse(format!(
                        "{} labels but {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                Ok(labels
                    .into_iter()
                    .zip(scores)
                    .map(|(label, score)| LabelScore { label, score })
                    .collect())
            }
            ZeroShotResponse::Pairs(pairs) => Ok(pairs),
        }
    }
}

#[async_trait]
impl ZeroShotClassifier for HfInferenceClient {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, EnrichError> {
        #[derive(Serialize)]
        struct ClassifyRequest<'a> {
            inputs: &'a str,
            parameters: ClassifyParameters<'a>,
        }

        #[derive(Serialize)]
        struct ClassifyParameters<'a> {
            candidate_labels: &'a [String],
            multi_label: bool,
        }

        let request = ClassifyRequest {
            inputs: text,
            parameters: ClassifyParameters {
                candidate_labels: labels,
                multi_label: true,
            },
        };

        debug!("Calling inference API with model: {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(EnrichError::Api { status, body });
        }

        let response: ZeroShotResponse = response.json().await?;
        response.into_scores()
    }
}

/// Offline classifier: a label scores 1.0 when it occurs in the text,
/// ignoring case, and 0.0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn scores(text: &str, labels: &[String]) -> Vec<LabelScore> {
        let haystack = text.to_lowercase();
        labels
            .iter()
            .map(|label| LabelScore {
                label: label.clone(),
                score: if haystack.contains(&label.to_lowercase()) {
                    1.0
                } else {
                    0.0
                },
            })
            .collect()
    }
}

#[async_trait]
impl ZeroShotClassifier for KeywordClassifier {
    async fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, EnrichError> {
        Ok(Self::scores(text, labels))
    }
}
