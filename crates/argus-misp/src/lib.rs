//! Argus MISP - Event sink
//!
//! Publishes selected records to a MISP instance as events, one event per
//! record, skipping titles MISP already knows.

pub mod client;
pub mod error;
pub mod event;

pub use client::MispClient;
pub use error::MispError;
pub use event::{build_event, MispAttribute, MispEvent};

use argus_core::Record;
use async_trait::async_trait;

/// Outcome of handing one record to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publication {
    Created { event_id: String },
    AlreadyExists,
}

/// Consumer of selected records.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, record: &Record) -> Result<Publication, MispError>;
}
