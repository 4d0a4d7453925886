use crate::error::{AnnotationError, Result};
use crate::format::{comment_body, recognize, BlockFormat, LineKind, END_SENTINEL, START_SENTINEL};
use madl_segmenter::{Annotation, Language};

/// Decoded annotation block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationBlock {
    pub format: BlockFormat,
    pub annotation: Annotation,
}

/// Render `annotation` as a current-format block.
///
/// Every returned line starts with `indent` and ends with `newline`.
pub fn render_block(
    annotation: &Annotation,
    language: Language,
    indent: &str,
    newline: &str,
) -> Result<Vec<String>> {
    let prefix = language.comment_prefix();
    let json = serde_json::to_string_pretty(annotation)?;

    let mut lines = Vec::with_capacity(json.lines().count() + 2);
    lines.push(format!("{indent}{prefix} {START_SENTINEL}{newline}"));
    for json_line in json.lines() {
        lines.push(format!("{indent}{prefix} {json_line}{newline}"));
    }
    lines.push(format!("{indent}{prefix} {END_SENTINEL}{newline}"));
    Ok(lines)
}

/// Decode a block from its lines (terminators allowed).
///
/// Accepts every format that carries a JSON payload; the payload is the comment
/// bodies between the start sentinel and the end sentinel or separator.
pub fn parse_block(lines: &[&str], language: Language) -> Result<AnnotationBlock> {
    let kinds: Vec<LineKind> = lines
        .iter()
        .map(|line| LineKind::classify(language, line))
        .collect();

    let (format, end) = recognize(&kinds, 0)
        .ok_or_else(|| AnnotationError::malformed("block does not open with a sentinel"))?;
    if format == BlockFormat::StrayEnd {
        return Err(AnnotationError::malformed("end sentinel without a block"));
    }

    let payload: Vec<&str> = lines[1..end]
        .iter()
        .zip(&kinds[1..end])
        .filter(|(_, kind)| **kind == LineKind::Comment(None))
        .filter_map(|(line, _)| comment_body(language, line))
        .collect();

    if payload.is_empty() {
        return Err(AnnotationError::malformed(format!("{format:?} block has no payload")));
    }

    let annotation = serde_json::from_str(&payload.join("\n"))?;
    Ok(AnnotationBlock { format, annotation })
}
