use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Segmenter error: {0}")]
    SegmentError(#[from] madl_segmenter::SegmentError),

    #[error("Call graph error: {0}")]
    GraphError(#[from] madl_graph::GraphError),

    #[error("Annotation error: {0}")]
    AnnotationError(#[from] madl_annotation::AnnotationError),

    #[error("Enrichment error: {0}")]
    EnrichError(#[from] madl_enrich::EnrichError),

    #[error("Task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    #[error("Invalid project root: {0}")]
    InvalidRoot(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
