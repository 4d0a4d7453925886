use crate::anchor::DefinitionIndex;
use crate::block::render_block;
use crate::error::{AnnotationError, Result};
use crate::format::START_SENTINEL;
use crate::strip::{strip_blocks, RemovedBlock, StrippedBuffer};
use madl_segmenter::{Annotation, Language, SourceUnit, UnitId};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;

/// Look-back window used when none is configured
pub const DEFAULT_LOOKBACK: usize = 10;

/// Markers that mean a block already sits above an anchor
const SURVIVING_MARKERS: &[&str] = &[START_SENTINEL, "MADL_METADATA", "MADL:"];

/// Why an annotated unit got no block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// No definition with the unit's name in the stripped buffer
    NotFound,
    /// A sentinel survived stripping inside the look-back window
    AlreadyAnnotated,
    /// The annotation could not be serialized
    RenderFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => f.write_str("definition not found after stripping"),
            SkipReason::AlreadyAnnotated => f.write_str("already synchronized"),
            SkipReason::RenderFailed(e) => write!(f, "render failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub unit_id: UnitId,
    pub name: String,
    pub reason: SkipReason,
}

/// Result of synchronizing one buffer
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Full rewritten text
    pub text: String,
    /// `text` differs from the input
    pub changed: bool,
    /// Units that received a block, in file order
    pub inserted: Vec<UnitId>,
    pub skipped: Vec<SkippedUnit>,
    pub stripped: Vec<RemovedBlock>,
}

/// Rewrites annotation blocks: strip every known block, re-anchor units by name,
/// insert fresh blocks bottom-up, commit once.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    lookback: usize,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

impl Synchronizer {
    pub fn new(lookback: usize) -> Result<Self> {
        if lookback == 0 {
            return Err(AnnotationError::InvalidConfig(
                "look-back window must be at least one line".to_string(),
            ));
        }
        Ok(Self { lookback })
    }

    pub const fn lookback(&self) -> usize {
        self.lookback
    }

    /// Synchronize `text` with the annotations carried by `units`.
    ///
    /// `units` must come from segmenting this same `text`; their `line_range.start`
    /// is the position hint for re-anchoring. Units without an annotation are ignored,
    /// but stale blocks above them are still removed.
    pub fn synchronize_text(
        &self,
        text: &str,
        language: Language,
        units: &[SourceUnit],
    ) -> SyncOutcome {
        let buffer = strip_blocks(text, language);
        let mut index = DefinitionIndex::build(&buffer, language);

        let mut annotated: Vec<(&SourceUnit, &Annotation)> = units
            .iter()
            .filter_map(|unit| unit.annotation.as_ref().map(|a| (unit, a)))
            .collect();
        annotated.sort_by_key(|(unit, _)| unit.line_range.start);

        let mut patches: Vec<(usize, Vec<String>, UnitId)> = Vec::new();
        let mut skipped = Vec::new();

        for (unit, annotation) in annotated {
            let hint = buffer.shifted(unit.line_range.start);
            let Some(anchor) = index.claim(&unit.name, hint) else {
                log::warn!("{}: cannot re-anchor `{}`, skipping", unit.file_path, unit.name);
                skipped.push(skip(unit, SkipReason::NotFound));
                continue;
            };

            if self.has_surviving_block(&buffer, anchor) {
                log::debug!("{}: `{}` already synchronized", unit.file_path, unit.name);
                skipped.push(skip(unit, SkipReason::AlreadyAnnotated));
                continue;
            }

            let line = buffer.lines[anchor];
            let indent = leading_whitespace(line);
            let newline = newline_for(&buffer, anchor);
            match render_block(annotation, language, indent, newline) {
                Ok(block) => patches.push((anchor, block, unit.id.clone())),
                Err(e) => {
                    log::warn!("{}: cannot render block for `{}`: {e}", unit.file_path, unit.name);
                    skipped.push(skip(unit, SkipReason::RenderFailed(e.to_string())));
                }
            }
        }

        let mut inserted: Vec<(usize, UnitId)> = patches
            .iter()
            .map(|(anchor, _, id)| (*anchor, id.clone()))
            .collect();
        inserted.sort_by_key(|(anchor, _)| *anchor);

        let output = apply_patches(&buffer, patches);
        let changed = output != text;

        SyncOutcome {
            text: output,
            changed,
            inserted: inserted.into_iter().map(|(_, id)| id).collect(),
            skipped,
            stripped: buffer.removed,
        }
    }

    /// Remove every recognized block without inserting anything
    pub fn strip_text(&self, text: &str, language: Language) -> SyncOutcome {
        let buffer = strip_blocks(text, language);
        let output = buffer.lines.concat();
        SyncOutcome {
            changed: output != text,
            text: output,
            stripped: buffer.removed,
            ..Default::default()
        }
    }

    /// Read, synchronize and (unless `dry_run`) commit a file
    pub fn synchronize_file(
        &self,
        path: impl AsRef<Path>,
        language: Language,
        units: &[SourceUnit],
        dry_run: bool,
    ) -> Result<SyncOutcome> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let outcome = self.synchronize_text(&text, language, units);
        if outcome.changed && !dry_run {
            commit(path, &outcome.text)?;
        }
        Ok(outcome)
    }

    /// Read, strip and (unless `dry_run`) commit a file
    pub fn strip_file(
        &self,
        path: impl AsRef<Path>,
        language: Language,
        dry_run: bool,
    ) -> Result<SyncOutcome> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let outcome = self.strip_text(&text, language);
        if outcome.changed && !dry_run {
            commit(path, &outcome.text)?;
        }
        Ok(outcome)
    }

    fn has_surviving_block(&self, buffer: &StrippedBuffer<'_>, anchor: usize) -> bool {
        buffer.lines[anchor.saturating_sub(self.lookback)..anchor]
            .iter()
            .any(|line| SURVIVING_MARKERS.iter().any(|marker| line.contains(marker)))
    }
}

/// Replace `path` with `text` through a temporary file in the same directory
pub fn commit(path: &Path, text: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AnnotationError::InvalidConfig(format!("not a file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.madl.tmp"));

    fs::write(&tmp, text)?;
    if let Ok(metadata) = fs::metadata(path) {
        if let Err(e) = fs::set_permissions(&tmp, metadata.permissions()) {
            log::debug!("{}: permissions not carried over: {e}", path.display());
        }
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn skip(unit: &SourceUnit, reason: SkipReason) -> SkippedUnit {
    SkippedUnit {
        unit_id: unit.id.clone(),
        name: unit.name.clone(),
        reason,
    }
}

fn leading_whitespace(line: &str) -> &str {
    let content = line.trim_end_matches(['\r', '\n']);
    &content[..content.len() - content.trim_start().len()]
}

/// Terminator of the anchor line, or of the first terminated line when the anchor is
/// the unterminated last line
fn newline_for(buffer: &StrippedBuffer<'_>, anchor: usize) -> &'static str {
    let terminator = |line: &str| {
        if line.ends_with("\r\n") {
            Some("\r\n")
        } else if line.ends_with('\n') {
            Some("\n")
        } else {
            None
        }
    };
    terminator(buffer.lines[anchor])
        .or_else(|| buffer.lines.iter().find_map(|line| terminator(line)))
        .unwrap_or("\n")
}

/// Apply `(anchor, lines)` patches to the immutable buffer in descending anchor order
fn apply_patches(buffer: &StrippedBuffer<'_>, mut patches: Vec<(usize, Vec<String>, UnitId)>) -> String {
    patches.sort_by(|a, b| b.0.cmp(&a.0));

    let mut lines: Vec<Cow<'_, str>> = buffer.lines.iter().map(|line| Cow::Borrowed(*line)).collect();
    for (anchor, block, _) in patches {
        lines.splice(anchor..anchor, block.into_iter().map(Cow::Owned));
    }
    lines.concat()
}
