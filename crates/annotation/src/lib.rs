//! # MADL Annotation
//!
//! Persists unit metadata as comment blocks directly above each definition and keeps
//! those blocks in sync across runs.
//!
//! ## Synchronization
//!
//! ```text
//! File text + units (annotation attached)
//!     │
//!     ├──> Strip     every known block format, one pass, to completion
//!     │
//!     ├──> Re-anchor each unit by name near its shifted start line
//!     │
//!     ├──> Insert    (anchor, lines) patches, descending anchor order
//!     │
//!     └──> Commit    temp file + rename; unchanged text is not written
//! ```
//!
//! Blocks are never patched in place. Running the pipeline twice with the same
//! annotations yields byte-identical files.
//!
//! ## Current block format
//!
//! ```text
//! # --- MADL ---
//! # {
//! #   "method_name": "add",
//! #   ...
//! # }
//! # --- END MADL ---
//! def add(a, b):
//! ```

mod anchor;
mod block;
mod error;
mod format;
mod strip;
mod sync;

pub use block::{parse_block, render_block, AnnotationBlock};
pub use error::{AnnotationError, Result};
pub use format::{BlockFormat, EndCondition, END_SENTINEL, METADATA_SENTINEL, START_SENTINEL};
pub use strip::{split_lines, strip_blocks, RemovedBlock, StrippedBuffer};
pub use sync::{commit, SkipReason, SkippedUnit, SyncOutcome, Synchronizer, DEFAULT_LOOKBACK};
