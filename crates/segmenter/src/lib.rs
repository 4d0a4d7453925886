//! # MADL Segmenter
//!
//! Lexical, line-oriented segmentation of source files into method-level units.
//!
//! No grammar is involved: a unit starts on a line matching a per-language definition
//! pattern (keyword + name + parameter list on one line) and ends where braces balance
//! or, failing that, at the first non-blank line indented no deeper than the start.
//!
//! ## Architecture
//!
//! ```text
//! File text
//!     │
//!     ├──> Line buffer (`str::lines`, CR stripped)
//!     │
//!     ├──> Scope stack (class / impl / namespace, popped by indentation)
//!     │
//!     ├──> Unit start match (patterns.rs)
//!     │    ├─> End: brace balancing (brace languages)
//!     │    └─> End: indentation rule (fallback)
//!     │
//!     └──> SourceUnit[] (ordered, non-overlapping)
//!          └─> calls_out = `identifier(` tokens in the body
//! ```
//!
//! ## Example
//!
//! ```rust
//! use madl_segmenter::{Language, Segmenter};
//!
//! let code = "def add(a, b):\n    return norm(a) + b\n";
//! let units = Segmenter::default().segment(code, "util.py", Language::Python);
//!
//! assert_eq!(units.len(), 1);
//! assert_eq!(units[0].signature, "add(a, b)");
//! assert_eq!(units[0].calls_out, vec!["norm".to_string()]);
//! ```

mod calls;
mod config;
mod error;
mod language;
mod patterns;
mod segmenter;
mod types;

pub use calls::extract_calls;
pub use config::SegmenterConfig;
pub use error::{Result, SegmentError};
pub use language::Language;
pub use patterns::{is_comment_line, match_unit_start, UnitStart};
pub use segmenter::Segmenter;
pub use types::{
    Annotation, Classification, LineRange, SourceUnit, UnitDraft, UnitId, VerdictSource,
    MODULE_SCOPE,
};
