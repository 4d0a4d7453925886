use crate::format::{recognize, BlockFormat, LineKind};
use madl_segmenter::Language;
use serde::{Deserialize, Serialize};

/// A block removed by the strip phase (indices into the original buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedBlock {
    pub format: BlockFormat,
    pub start: usize,
    pub len: usize,
}

/// Line buffer with every recognized block removed
#[derive(Debug, Clone)]
pub struct StrippedBuffer<'a> {
    /// Remaining lines, terminators included
    pub lines: Vec<&'a str>,
    /// Removed blocks in ascending `start` order
    pub removed: Vec<RemovedBlock>,
}

impl StrippedBuffer<'_> {
    /// Index in the stripped buffer of a line that survived stripping
    pub fn shifted(&self, original: usize) -> usize {
        let above: usize = self
            .removed
            .iter()
            .take_while(|block| block.start < original)
            .map(|block| block.len.min(original - block.start))
            .sum();
        original - above
    }

    pub fn removed_lines(&self) -> usize {
        self.removed.iter().map(|block| block.len).sum()
    }
}

/// Split text into lines, keeping each line's terminator
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Remove every recognized annotation block in one pass over the buffer
pub fn strip_blocks(text: &str, language: Language) -> StrippedBuffer<'_> {
    let lines = split_lines(text);
    let kinds: Vec<LineKind> = lines
        .iter()
        .map(|line| LineKind::classify(language, line))
        .collect();

    let mut kept = Vec::with_capacity(lines.len());
    let mut removed = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if let Some((format, end)) = recognize(&kinds, i) {
            log::debug!("stripping {format:?} block at line {} ({} lines)", i + 1, end - i);
            removed.push(RemovedBlock {
                format,
                start: i,
                len: end - i,
            });
            i = end;
            continue;
        }
        kept.push(lines[i]);
        i += 1;
    }

    StrippedBuffer {
        lines: kept,
        removed,
    }
}
