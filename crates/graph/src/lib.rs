//! # MADL Graph
//!
//! Approximate call graph between the units of one scan.
//!
//! ## Architecture
//!
//! ```text
//! SourceUnit[] (calls_out filled by the segmenter)
//!     │
//!     ├──> CallGraphBuilder
//!     │      ├─ Nodes: one per unit (petgraph DiGraph)
//!     │      ├─ Name lookup (last writer wins)
//!     │      └─ Edges: caller → callee per resolved token
//!     │
//!     └──> calls_in mirrored back onto each unit
//! ```
//!
//! Resolution is by bare name only: overloads, inheritance and closures are not
//! distinguished, and namesakes collapse onto the last unit registered.

mod builder;
mod error;
mod graph;
mod types;

pub use builder::CallGraphBuilder;
pub use error::{GraphError, Result};
pub use types::{CallEdge, CallGraph, CallNode, GraphStats};
