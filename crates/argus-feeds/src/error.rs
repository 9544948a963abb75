//! Typed errors for the feeds crate.

use thiserror::Error;

/// Errors that can occur while retrieving or parsing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// A configured feed location is not a valid URL.
    #[error("invalid feed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    RequestFailed(String),
    /// The server answered with a non-success status.
    #[error("feed {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    /// The document is not well-formed XML.
    #[error("parse failed: {0}")]
    ParseFailed(String),
    /// The document is XML but neither RSS nor Atom.
    #[error("unsupported feed format (root element '{0}')")]
    UnsupportedFormat(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::RequestFailed(e.to_string())
    }
}

impl From<quick_xml::Error> for FeedError {
    fn from(e: quick_xml::Error) -> Self {
        FeedError::ParseFailed(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for FeedError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        FeedError::ParseFailed(e.to_string())
    }
}
