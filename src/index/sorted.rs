use super::{read_corpus_lines, MembershipIndex};
use anyhow::Result;
use std::path::Path;

/// Sorted unique lines with binary-search lookup.
///
/// Lines are ordered lexicographically by byte value; duplicates collapse.
pub struct SortedIndex {
    lines: Vec<Box<[u8]>>,
}

impl SortedIndex {
    pub fn build(path: &Path) -> Result<Self> {
        let mut lines: Vec<Box<[u8]>> = read_corpus_lines(path)?
            .into_iter()
            .map(Vec::into_boxed_slice)
            .collect();
        lines.sort();
        lines.dedup();
        Ok(Self { lines })
    }
}

impl MembershipIndex for SortedIndex {
    fn contains(&self, query: &[u8]) -> bool {
        self.lines
            .binary_search_by(|line| line.as_ref().cmp(query))
            .is_ok()
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn name(&self) -> &'static str {
        "sorted"
    }
}
