use crate::error::{Result, SegmentError};
use crate::language::Language;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Scope label used in unit ids when no enclosing type/module was seen
pub const MODULE_SCOPE: &str = "module";

/// Half-open `[start, end)` range of 0-based line indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    /// Create a non-empty range
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if start >= end {
            return Err(SegmentError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of lines covered
    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// 1-based line number of the first line
    #[must_use]
    pub const fn start_line(self) -> usize {
        self.start + 1
    }

    #[must_use]
    pub const fn contains(self, line: usize) -> bool {
        line >= self.start && line < self.end
    }

    #[must_use]
    pub const fn overlaps(self, other: LineRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Stable composite key of a unit: path, scope, name and starting line
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// Compose an id; `start_line` is 1-based
    pub fn compose(file_path: &str, scope: Option<&str>, name: &str, start_line: usize) -> Self {
        Self(format!(
            "file://{file_path}::{}::{name}::line{start_line}",
            scope.unwrap_or(MODULE_SCOPE)
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structured metadata persisted above a unit as an annotation block.
///
/// Field names on the wire follow the block JSON layout (`semantic_description`,
/// `method_code`) so blocks written by earlier runs stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub method_name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub class_name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub intent: String,

    #[serde(rename = "semantic_description", default, deserialize_with = "null_as_empty")]
    pub description: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: String,

    #[serde(rename = "method_code", default, deserialize_with = "null_as_empty")]
    pub code_snippet: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where a reusability verdict came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// External classifier/annotator answered
    Model,
    /// External call failed or returned garbage; local heuristic used
    Heuristic,
    /// Quota exhausted before the call; local heuristic used
    QuotaFallback,
}

impl VerdictSource {
    #[must_use]
    pub const fn is_fallback(self) -> bool {
        !matches!(self, Self::Model)
    }
}

/// Reusability verdict for a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub reusable: bool,
    pub reason: String,
    /// In `0.0..=1.0`
    pub confidence: f32,
    pub source: VerdictSource,
}

impl Classification {
    pub fn new(reusable: bool, reason: impl Into<String>, confidence: f32, source: VerdictSource) -> Self {
        Self {
            reusable,
            reason: reason.into(),
            confidence: if confidence.is_finite() {
                confidence.clamp(0.0, 1.0)
            } else {
                0.0
            },
            source,
        }
    }
}

/// Raw fields of a unit as discovered by the segmenter, before validation
#[derive(Debug, Clone)]
pub struct UnitDraft {
    pub file_path: String,
    pub language: Language,
    pub enclosing_scope: Option<String>,
    pub name: String,
    pub params: String,
    pub line_range: LineRange,
    pub body_text: String,
}

/// A single extracted method/function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub id: UnitId,
    pub file_path: String,
    pub language: Language,
    pub enclosing_scope: Option<String>,
    pub name: String,
    /// `name(params)`
    pub signature: String,
    pub line_range: LineRange,
    pub body_text: String,
    pub calls_out: Vec<String>,
    /// Derived by the call graph builder
    calls_in: Vec<UnitId>,
    pub classification: Option<Classification>,
    pub annotation: Option<Annotation>,
    pub index_id: Option<String>,
}

impl SourceUnit {
    /// Validate a draft and build the unit
    pub fn from_draft(draft: UnitDraft) -> Result<Self> {
        let UnitDraft {
            file_path,
            language,
            enclosing_scope,
            name,
            params,
            line_range,
            body_text,
        } = draft;

        if file_path.trim().is_empty() {
            return Err(SegmentError::invalid_unit("file path is empty"));
        }
        if name.trim().is_empty() {
            return Err(SegmentError::invalid_unit(format!(
                "unit at {}:{} has no name",
                file_path,
                line_range.start_line()
            )));
        }
        if line_range.is_empty() {
            return Err(SegmentError::InvalidRange {
                start: line_range.start,
                end: line_range.end,
            });
        }

        let enclosing_scope = enclosing_scope.filter(|scope| !scope.trim().is_empty());
        let id = UnitId::compose(
            &file_path,
            enclosing_scope.as_deref(),
            &name,
            line_range.start_line(),
        );
        let signature = format!("{}({})", name, params.trim());

        Ok(Self {
            id,
            file_path,
            language,
            enclosing_scope,
            name,
            signature,
            line_range,
            body_text,
            calls_out: Vec::new(),
            calls_in: Vec::new(),
            classification: None,
            annotation: None,
            index_id: None,
        })
    }

    /// Builder: set outgoing call names
    #[must_use]
    pub fn with_calls_out(mut self, calls: Vec<String>) -> Self {
        self.calls_out = calls;
        self
    }

    /// Ids of units whose `calls_out` resolved to this unit
    #[must_use]
    pub fn calls_in(&self) -> &[UnitId] {
        &self.calls_in
    }

    /// Record an incoming call edge; returns false if already present
    pub fn add_caller(&mut self, caller: &UnitId) -> bool {
        if self.calls_in.contains(caller) {
            return false;
        }
        self.calls_in.push(caller.clone());
        true
    }

    /// Drop derived call edges before a rebuild
    pub fn clear_callers(&mut self) {
        self.calls_in.clear();
    }

    /// Parameter text inside the signature parentheses
    #[must_use]
    pub fn params(&self) -> &str {
        self.signature
            .strip_prefix(self.name.as_str())
            .and_then(|rest| rest.strip_prefix('('))
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or("")
    }

    #[must_use]
    pub fn is_reusable(&self) -> bool {
        self.classification.as_ref().is_some_and(|c| c.reusable)
    }
}
