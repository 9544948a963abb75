//! MISP REST client.

use argus_core::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::MispError;
use crate::event::{build_event, MispEvent};
use crate::{EventSink, Publication};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct EventEnvelope<'a> {
    #[serde(rename = "Event")]
    event: &'a MispEvent,
}

#[derive(Debug, Deserialize)]
struct EventSummary {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "Event")]
    event: EventSummary,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    response: Vec<SummaryEnvelope>,
}

/// Client for one MISP instance.
pub struct MispClient {
    base_url: Url,
    api_key: String,
    client: reqwest::Client,
}

impl MispClient {
    /// `verify_tls = false` accepts self-signed certificates.
    pub fn new(base_url: &str, api_key: impl Into<String>, verify_tls: bool) -> Result<Self, MispError> {
        let base_url = Url::parse(base_url).map_err(|e| MispError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !verify_tls {
            warn!("TLS certificate verification disabled for {}", base_url);
        }
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, MispError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path).map_err(|e| MispError::InvalidUrl {
            url: format!("{}{}", base, path),
            reason: e.to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, MispError> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("Authorization", &self.api_key)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(MispError::Api { status, body });
        }

        Ok(response.json().await?)
    }

    /// Whether an event with exactly this info string exists.
    pub async fn event_exists(&self, info: &str) -> Result<bool, MispError> {
        let query = serde_json::json!({
            "returnFormat": "json",
            "eventinfo": info,
            "metadata": true,
        });
        let response = self.post("events/restSearch", &query).await?;
        parse_search(response, info)
    }

    /// Create the event and return its MISP id.
    pub async fn create_event(&self, event: &MispEvent) -> Result<String, MispError> {
        let response = self.post("events/add", &EventEnvelope { event }).await?;
        parse_created(response)
    }

    /// Attach a tag to the event with `uuid`.
    pub async fn tag_event(&self, uuid: &Uuid, tag: &str) -> Result<(), MispError> {
        let body = serde_json::json!({ "uuid": uuid, "tag": tag });
        self.post("tags/attachTagToObject", &body).await?;
        Ok(())
    }
}

impl fmt::Debug for MispClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MispClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventSink for MispClient {
    async fn publish(&self, record: &Record) -> Result<Publication, MispError> {
        let event = build_event(record)?;

        if self.event_exists(&event.info).await? {
            info!("Event already exists for: {}", event.info);
            return Ok(Publication::AlreadyExists);
        }

        let event_id = self.create_event(&event).await?;
        info!("Created MISP event '{}' (ID: {})", event.info, event_id);

        for category in &record.category {
            match self.tag_event(&event.uuid, category).await {
                Ok(()) => debug!("Tagged event {} with '{}'", event_id, category),
                Err(e) => warn!("Failed tagging event {} with '{}': {}", event_id, category, e),
            }
        }

        Ok(Publication::Created { event_id })
    }
}

// restSearch matches info as a substring; only an exact title counts.
fn parse_search(response: Value, info: &str) -> Result<bool, MispError> {
    // Older instances answer a bare array instead of {"response": [...]}.
    let response = match response {
        Value::Array(items) => serde_json::json!({ "response": items }),
        other => other,
    };
    let search: SearchResponse =
        serde_json::from_value(response).map_err(|e| MispError::InvalidResponse(e.to_string()))?;
    Ok(search.response.iter().any(|hit| hit.event.info == info))
}

fn parse_created(response: Value) -> Result<String, MispError> {
    let envelope: SummaryEnvelope =
        serde_json::from_value(response).map_err(|e| MispError::InvalidResponse(e.to_string()))?;
    match envelope.event.id {
        Some(Value::String(id)) => Ok(id),
        Some(Value::Number(id)) => Ok(id.to_string()),
        other => Err(MispError::InvalidResponse(format!(
            "event id missing or malformed: {:?}",
            other
        ))),
    }
}
