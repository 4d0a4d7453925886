use crate::strip::StrippedBuffer;
use madl_segmenter::{match_unit_start, Language};
use std::collections::{HashMap, HashSet};

/// Definition lines in the stripped buffer, grouped by unit name
pub(crate) struct DefinitionIndex {
    by_name: HashMap<String, Vec<usize>>,
    claimed: HashSet<usize>,
}

impl DefinitionIndex {
    pub(crate) fn build(buffer: &StrippedBuffer<'_>, language: Language) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, line) in buffer.lines.iter().enumerate() {
            let content = line.trim_end_matches(['\r', '\n']);
            if let Some(start) = match_unit_start(language, content) {
                by_name.entry(start.name).or_default().push(idx);
            }
        }
        Self {
            by_name,
            claimed: HashSet::new(),
        }
    }

    /// Claim the unclaimed definition of `name` nearest to `hint` (ties go upward)
    pub(crate) fn claim(&mut self, name: &str, hint: usize) -> Option<usize> {
        let line = self
            .by_name
            .get(name)?
            .iter()
            .copied()
            .filter(|idx| !self.claimed.contains(idx))
            .min_by_key(|idx| (idx.abs_diff(hint), *idx))?;
        self.claimed.insert(line);
        Some(line)
    }
}
