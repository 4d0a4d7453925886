use thiserror::Error;

/// Result type for segmentation operations
pub type Result<T> = std::result::Result<T, SegmentError>;

/// Errors that can occur while segmenting source files
#[derive(Error, Debug)]
pub enum SegmentError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// A unit record is missing a required field
    #[error("Invalid unit: {0}")]
    InvalidUnit(String),

    /// Invalid unit boundaries
    #[error("Invalid line range: start={start}, end={end}")]
    InvalidRange { start: usize, end: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SegmentError {
    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create an invalid unit error
    pub fn invalid_unit(msg: impl Into<String>) -> Self {
        Self::InvalidUnit(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
