use thiserror::Error;

/// Result type for annotation operations
pub type Result<T> = std::result::Result<T, AnnotationError>;

/// Errors that can occur while reading, writing or synchronizing annotation blocks
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Block text without the expected sentinels
    #[error("Malformed annotation block: {0}")]
    MalformedBlock(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnnotationError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedBlock(msg.into())
    }
}
