use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::Track;

pub type ArcedResolver = Arc<dyn TrackResolver>;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No provider matched the reference")]
    NoMatch,

    #[error("Reference is invalid: {0}")]
    Invalid(String),

    #[error("Reference is supported but the resource was not found")]
    NotFound,

    #[error("Resource was found but is unavailable")]
    Unavailable,

    #[error("Failed to fetch resource: {0}")]
    FetchError(String),

    #[error("Failed to parse resource: {0}")]
    ParseError(String),

    #[error("{0}")]
    Other(String),
}

/// Turns a station's playlist reference (a URL or a search string) into tracks.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolves the reference into zero or more tracks, in playlist order.
    async fn resolve(&self, reference: &str) -> Result<Vec<Track>, ResolveError>;
}
