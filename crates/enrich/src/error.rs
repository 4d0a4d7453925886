use thiserror::Error;

/// Result type for enrichment operations
pub type Result<T> = std::result::Result<T, EnrichError>;

/// Errors raised by classifiers, annotators and index sinks.
///
/// None of these abort a run: the enricher falls back to the local heuristic and
/// records the message.
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Reply could not be decoded into the expected JSON shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EnrichError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
