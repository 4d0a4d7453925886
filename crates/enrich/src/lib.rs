//! # MADL Enrich
//!
//! Reusability classification, annotation generation and index ingestion for
//! extracted units.
//!
//! External services sit behind the [`Classifier`], [`Annotator`] and [`IndexSink`]
//! traits. The [`Enricher`] calls them while the shared [`QuotaLimiter`] allows and
//! falls back to the local heuristic on exhaustion, failure or malformed replies, so
//! a run always completes.
//!
//! ```text
//! SourceUnit
//!     │
//!     ├──> quota.try_acquire()?
//!     │      ├─ yes → Classifier (LlmClient) ──error──┐
//!     │      └─ no  → HeuristicClassifier <───────────┘
//!     │
//!     ├──> reusable? → Annotator / HeuristicAnnotator (same routing)
//!     │
//!     └──> IndexSink::ingest → index id
//! ```

mod enricher;
mod error;
mod heuristic;
mod llm;
mod prompt;
mod provider;
mod quota;
mod sink;

pub use enricher::{EnrichReport, Enricher};
pub use error::{EnrichError, Result};
pub use heuristic::{
    name_keywords, truncate_chars, HeuristicAnnotator, HeuristicClassifier, SIDE_EFFECT_KEYWORDS,
};
pub use llm::{LlmClient, LlmConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use prompt::{
    annotation_prompt, parse_annotation, parse_classification, reusability_prompt,
    strip_code_fence,
};
pub use provider::{Annotator, Classifier, IndexSink};
pub use quota::QuotaLimiter;
pub use sink::{embedding_text, index_id, JsonlSink, NullSink};
