use super::{read_corpus_lines, MembershipIndex};
use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

/// Hash-set membership index. Duplicate corpus lines collapse on ingest.
pub struct HashIndex {
    lines: HashSet<Vec<u8>>,
}

impl HashIndex {
    pub fn build(path: &Path) -> Result<Self> {
        let mut lines = HashSet::new();
        for line in read_corpus_lines(path)? {
            lines.insert(line);
        }
        Ok(Self { lines })
    }
}

impl MembershipIndex for HashIndex {
    fn contains(&self, query: &[u8]) -> bool {
        self.lines.contains(query)
    }

    fn len(&self) -> usize {
        self.lines.len()
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}
