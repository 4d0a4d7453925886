use madl_segmenter::{UnitId, VerdictSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of a non-fatal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// File could not be read or decoded
    Read,
    /// External classifier/annotator failed; heuristic used instead
    Enrich,
    /// Annotated unit received no block
    Skipped,
    /// Rewritten file could not be committed
    Write,
    /// Index sink rejected a unit
    Index,
    /// Call graph could not be built
    Graph,
    /// File left untouched after cancellation
    Cancelled,
    /// Per-file task panicked; the file was left as it was
    Task,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Enrich => "enrich",
            Self::Skipped => "skipped",
            Self::Write => "write",
            Self::Index => "index",
            Self::Graph => "graph",
            Self::Cancelled => "cancelled",
            Self::Task => "task",
        };
        f.write_str(name)
    }
}

/// One skipped or failed item with its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitId>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn file(path: impl Into<String>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            unit: None,
            kind,
            message: message.into(),
        }
    }

    pub fn unit(
        path: impl Into<String>,
        unit: &UnitId,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            unit: Some(unit.clone()),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "[{}] {} ({}): {}", self.kind, self.path, unit, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.path, self.message),
        }
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of files walked
    pub files_scanned: usize,

    /// Files whose content was (or in a dry run, would be) rewritten
    pub files_changed: usize,

    /// Units extracted
    pub units: usize,

    /// Units classified reusable
    pub reusable: usize,

    /// Annotation blocks inserted
    pub annotations_inserted: usize,

    /// Stale blocks removed
    pub blocks_stripped: usize,

    pub call_edges: usize,

    /// Verdicts answered by the external model
    pub model_verdicts: usize,

    /// Verdicts from the heuristic (failure or quota)
    pub fallback_verdicts: usize,

    /// External calls spent
    pub quota_used: usize,

    /// Units handed to the index sink
    pub indexed: usize,

    /// Files per language
    pub languages: BTreeMap<String, usize>,

    /// Time taken in milliseconds
    pub time_ms: u64,

    pub cancelled: bool,

    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, language: &str) {
        self.files_scanned += 1;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_verdict(&mut self, source: VerdictSource) {
        if source.is_fallback() {
            self.fallback_verdicts += 1;
        } else {
            self.model_verdicts += 1;
        }
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}
