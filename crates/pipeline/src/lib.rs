//! # MADL Pipeline
//!
//! Orchestrates a run over a project tree.
//!
//! ## Pipeline
//!
//! ```text
//! Root directory
//!     │
//!     ├──> TreeWalker (.gitignore aware, extension map, exclusions)
//!     │      └─> SourceFile[]
//!     │
//!     ├──> Segmenter ──> SourceUnit[] per file
//!     │
//!     ├──> CallGraphBuilder ──> calls_in for every unit
//!     │
//!     ├──> per file, bounded by a semaphore:
//!     │      Enricher (model or heuristic) → Synchronizer → commit → IndexSink
//!     │
//!     └──> Manifest + RunReport
//! ```
//!
//! Only an invalid root or configuration aborts a run. Unreadable files, model
//! failures, units that cannot be re-anchored and failed writes are reported as
//! [`Diagnostic`]s.
//!
//! ## Example
//!
//! ```no_run
//! use madl_pipeline::{Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(PipelineConfig::for_root("/path/to/project")).await?;
//!     let report = pipeline.run().await?;
//!
//!     println!("{} units, {} annotated", report.units, report.annotations_inserted);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod manifest;
mod pipeline;
mod scanner;
mod stats;

pub use config::{
    default_parallelism, PipelineConfig, DEFAULT_MANIFEST, DEFAULT_MAX_FILE_SIZE, DEFAULT_QUOTA,
};
pub use error::{PipelineError, Result};
pub use manifest::{read_manifest, write_manifest, ManifestRecord};
pub use pipeline::{ParsedFile, Pipeline, ScanOutput};
pub use scanner::{SourceFile, TreeWalker};
pub use stats::{Diagnostic, DiagnosticKind, RunReport};
