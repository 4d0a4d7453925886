//! Seams to the external services.

use crate::error::Result;
use async_trait::async_trait;
use madl_segmenter::{Annotation, Classification, SourceUnit};

/// Decides whether a unit is reusable
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Verdict for one unit; confidence in `0.0..=1.0`
    async fn classify(&self, unit: &SourceUnit) -> Result<Classification>;

    /// Name used in logs and reports
    fn name(&self) -> &str;
}

/// Produces the structured annotation for a reusable unit
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, unit: &SourceUnit) -> Result<Annotation>;

    fn name(&self) -> &str;
}

/// Receives finalized units for semantic search; returns an opaque id
#[async_trait]
pub trait IndexSink: Send + Sync {
    async fn ingest(&self, unit: &SourceUnit) -> Result<String>;

    fn name(&self) -> &str;
}
