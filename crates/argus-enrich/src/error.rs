//! Typed errors for tag inference.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    /// The inference endpoint could not be reached.
    #[error("inference request failed: {0}")]
    Request(String),
    /// The inference endpoint answered with a non-success status.
    #[error("inference API error ({status}): {body}")]
    Api { status: u16, body: String },
    /// The response body did not have the zero-shot shape.
    #[error("invalid inference response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for EnrichError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            EnrichError::InvalidResponse(e.to_string())
        } else {
            EnrichError::Request(e.to_string())
        }
    }
}
