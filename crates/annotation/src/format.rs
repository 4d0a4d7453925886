//! Annotation block formats and line classification.
//!
//! Every format is a (start sentinel, end condition) pair. A non-comment, non-blank
//! line ends every format without being consumed, so code is never part of a block.

use madl_segmenter::Language;
use serde::{Deserialize, Serialize};

/// Opens the current block format
pub const START_SENTINEL: &str = "--- MADL ---";
/// Closes the current block format
pub const END_SENTINEL: &str = "--- END MADL ---";
/// Opens the metadata block format written by older releases
pub const METADATA_SENTINEL: &str = "====== MADL_METADATA ======";

const METADATA_MARKER: &str = "MADL_METADATA";
const SEPARATOR_PREFIX: &str = "=====";
const LEGACY_PREFIX: &str = "#";

/// Sentinel role of a comment line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sentinel {
    Start,
    End,
    MetadataStart,
    Separator,
}

/// Classified physical line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    Blank,
    Comment(Option<Sentinel>),
    Code,
}

impl LineKind {
    pub(crate) fn classify(language: Language, line: &str) -> Self {
        if line.trim().is_empty() {
            return LineKind::Blank;
        }
        match comment_body(language, line) {
            Some(body) => LineKind::Comment(sentinel(body.trim())),
            None => LineKind::Code,
        }
    }

    const fn is_comment(self) -> bool {
        matches!(self, LineKind::Comment(_))
    }

    const fn sentinel(self) -> Option<Sentinel> {
        match self {
            LineKind::Comment(sentinel) => sentinel,
            _ => None,
        }
    }
}

/// Text after the comment prefix and one following space, if `line` is a comment.
///
/// Both the language's prefix and the legacy `#` prefix are accepted; in `//`
/// languages a `#` line only counts when followed by a space or nothing, so
/// preprocessor directives stay code.
pub(crate) fn comment_body(language: Language, line: &str) -> Option<&str> {
    let trimmed = line.trim_start().trim_end_matches(['\r', '\n']);
    let prefix = language.comment_prefix();

    let rest = if let Some(rest) = trimmed.strip_prefix(prefix) {
        rest
    } else {
        let rest = trimmed.strip_prefix(LEGACY_PREFIX)?;
        if !(rest.is_empty() || rest.starts_with(' ')) {
            return None;
        }
        rest
    };
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn sentinel(body: &str) -> Option<Sentinel> {
    if body == START_SENTINEL {
        Some(Sentinel::Start)
    } else if body == END_SENTINEL {
        Some(Sentinel::End)
    } else if body.starts_with('=') && body.contains(METADATA_MARKER) {
        Some(Sentinel::MetadataStart)
    } else if body.starts_with(SEPARATOR_PREFIX) {
        Some(Sentinel::Separator)
    } else {
        None
    }
}

/// How a block of a given format ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
    /// End sentinel line, only comment lines in between
    Sentinel,
    /// End sentinel possibly preceded by blank lines; trailing blank lines absorbed
    PaddedSentinel,
    /// First separator comment line
    Separator,
    /// End of the contiguous comment run
    CommentRun,
    /// The start line alone
    SameLine,
}

/// Known annotation block layouts, in recognition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockFormat {
    /// Current format written by the synchronizer
    Delimited,
    PaddedDelimited,
    OpenJson,
    Metadata,
    OpenMetadata,
    /// Orphaned end sentinel
    StrayEnd,
}

impl BlockFormat {
    /// Formats in the order they are tried at a sentinel line
    pub const ALL: [BlockFormat; 6] = [
        BlockFormat::Delimited,
        BlockFormat::PaddedDelimited,
        BlockFormat::OpenJson,
        BlockFormat::Metadata,
        BlockFormat::OpenMetadata,
        BlockFormat::StrayEnd,
    ];

    pub const fn start_sentinel(self) -> &'static str {
        match self {
            BlockFormat::Delimited | BlockFormat::PaddedDelimited | BlockFormat::OpenJson => {
                START_SENTINEL
            }
            BlockFormat::Metadata | BlockFormat::OpenMetadata => METADATA_SENTINEL,
            BlockFormat::StrayEnd => END_SENTINEL,
        }
    }

    pub const fn end_condition(self) -> EndCondition {
        match self {
            BlockFormat::Delimited => EndCondition::Sentinel,
            BlockFormat::PaddedDelimited => EndCondition::PaddedSentinel,
            BlockFormat::Metadata => EndCondition::Separator,
            BlockFormat::OpenJson | BlockFormat::OpenMetadata => EndCondition::CommentRun,
            BlockFormat::StrayEnd => EndCondition::SameLine,
        }
    }

    /// Anything but the current format
    pub const fn is_legacy(self) -> bool {
        !matches!(self, BlockFormat::Delimited)
    }

    const fn opens_with(self) -> Sentinel {
        match self {
            BlockFormat::Delimited | BlockFormat::PaddedDelimited | BlockFormat::OpenJson => {
                Sentinel::Start
            }
            BlockFormat::Metadata | BlockFormat::OpenMetadata => Sentinel::MetadataStart,
            BlockFormat::StrayEnd => Sentinel::End,
        }
    }

    /// Exclusive end of a block of this format opening at `start`
    pub(crate) fn match_at(self, kinds: &[LineKind], start: usize) -> Option<usize> {
        if kinds.get(start)?.sentinel() != Some(self.opens_with()) {
            return None;
        }

        let mut j = start + 1;
        match self.end_condition() {
            EndCondition::SameLine => Some(j),
            EndCondition::CommentRun => {
                while kinds.get(j).is_some_and(|k| k.is_comment()) {
                    j += 1;
                }
                Some(j)
            }
            EndCondition::Sentinel | EndCondition::Separator => {
                let closer = if self.end_condition() == EndCondition::Sentinel {
                    Sentinel::End
                } else {
                    Sentinel::Separator
                };
                while let Some(kind) = kinds.get(j) {
                    match kind {
                        LineKind::Comment(Some(s)) if *s == closer => return Some(j + 1),
                        LineKind::Comment(_) => j += 1,
                        LineKind::Blank | LineKind::Code => return None,
                    }
                }
                None
            }
            EndCondition::PaddedSentinel => {
                while let Some(kind) = kinds.get(j) {
                    match kind {
                        LineKind::Comment(Some(Sentinel::End)) => {
                            let mut end = j + 1;
                            while kinds.get(end) == Some(&LineKind::Blank) {
                                end += 1;
                            }
                            return Some(end);
                        }
                        LineKind::Comment(_) | LineKind::Blank => j += 1,
                        LineKind::Code => return None,
                    }
                }
                None
            }
        }
    }
}

/// First format in recognition order that matches at `start`
pub(crate) fn recognize(kinds: &[LineKind], start: usize) -> Option<(BlockFormat, usize)> {
    BlockFormat::ALL
        .iter()
        .find_map(|format| format.match_at(kinds, start).map(|end| (*format, end)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(language: Language, text: &str) -> Vec<LineKind> {
        text.lines().map(|l| LineKind::classify(language, l)).collect()
    }

    #[test]
    fn classifies_prefixes() {
        assert_eq!(
            LineKind::classify(Language::Java, "    // --- MADL ---"),
            LineKind::Comment(Some(Sentinel::Start))
        );
        assert_eq!(
            LineKind::classify(Language::Java, "# --- END MADL ---"),
            LineKind::Comment(Some(Sentinel::End))
        );
        assert_eq!(LineKind::classify(Language::Cpp, "#include <vector>"), LineKind::Code);
        assert_eq!(LineKind::classify(Language::Python, "  "), LineKind::Blank);
        assert_eq!(
            LineKind::classify(Language::Python, "# ==========================="),
            LineKind::Comment(Some(Sentinel::Separator))
        );
        assert_eq!(
            LineKind::classify(Language::Python, "# ====== MADL_METADATA ======"),
            LineKind::Comment(Some(Sentinel::MetadataStart))
        );
    }

    #[test]
    fn comment_body_strips_one_space() {
        assert_eq!(comment_body(Language::Python, "    #   \"a\": 1"), Some("  \"a\": 1"));
        assert_eq!(comment_body(Language::Go, "\t// {"), Some("{"));
        assert_eq!(comment_body(Language::Go, "x := 1"), None);
    }

    #[test]
    fn delimited_wins_over_padded() {
        let k = kinds(
            Language::Python,
            "# --- MADL ---\n# {}\n# --- END MADL ---\n\ndef f():",
        );
        assert_eq!(recognize(&k, 0), Some((BlockFormat::Delimited, 3)));
    }

    #[test]
    fn padded_absorbs_blank_lines() {
        let k = kinds(
            Language::Python,
            "# --- MADL ---\n# {}\n\n# --- END MADL ---\n\n\ndef f():",
        );
        assert_eq!(recognize(&k, 0), Some((BlockFormat::PaddedDelimited, 6)));
    }

    #[test]
    fn open_json_stops_at_code() {
        let k = kinds(Language::Python, "# --- MADL ---\n# {}\ndef f():\n# --- END MADL ---");
        assert_eq!(recognize(&k, 0), Some((BlockFormat::OpenJson, 2)));
    }

    #[test]
    fn metadata_variants() {
        let closed = kinds(
            Language::Python,
            "# ====== MADL_METADATA ======\n# {}\n# ===========================\n# note\ndef f():",
        );
        assert_eq!(recognize(&closed, 0), Some((BlockFormat::Metadata, 3)));

        let open = kinds(Language::Python, "# ====== MADL_METADATA ======\n# {}\n\ndef f():");
        assert_eq!(recognize(&open, 0), Some((BlockFormat::OpenMetadata, 2)));
    }

    #[test]
    fn stray_end_and_plain_comments() {
        let k = kinds(Language::Rust, "// --- END MADL ---\n// plain\nfn f() {}");
        assert_eq!(recognize(&k, 0), Some((BlockFormat::StrayEnd, 1)));
        assert_eq!(recognize(&k, 1), None);
        assert_eq!(recognize(&k, 2), None);
    }

    #[test]
    fn format_table() {
        assert_eq!(BlockFormat::Metadata.start_sentinel(), METADATA_SENTINEL);
        assert_eq!(BlockFormat::OpenJson.end_condition(), EndCondition::CommentRun);
        assert!(!BlockFormat::Delimited.is_legacy());
        assert!(BlockFormat::StrayEnd.is_legacy());
    }
}
