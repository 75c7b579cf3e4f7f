// src/enrich/types.rs
use thiserror::Error;

/// Why a timestamp lookup failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("no record for this id")]
    NotFound,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// One by-id lookup against the authoritative data source.
#[async_trait::async_trait]
pub trait TimestampSource: Send + Sync {
    /// Unix seconds for `id`.
    async fn lookup(&self, id: &str) -> Result<i64, FetchError>;
    fn name(&self) -> &'static str;
}
