//! Typed errors for MISP publication.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MispError {
    #[error("invalid MISP URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// The record lacks a field the event needs.
    #[error("record {record_id} has no {field}")]
    MissingField {
        record_id: String,
        field: &'static str,
    },
    #[error("MISP request failed: {0}")]
    Request(String),
    #[error("MISP API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("unexpected MISP response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for MispError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            MispError::InvalidResponse(e.to_string())
        } else {
            MispError::Request(e.to_string())
        }
    }
}
