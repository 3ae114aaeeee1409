use super::{read_corpus_lines, MembershipIndex};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    /// Marks the terminal byte of an inserted line. Substrings of corpus
    /// lines do not match unless they are complete lines themselves.
    terminal: bool,
}

/// Ordered byte-tree membership index with O(|query|) lookup.
pub struct TrieIndex {
    root: TrieNode,
    len: usize,
}

impl TrieIndex {
    pub fn build(path: &Path) -> Result<Self> {
        let mut index = Self {
            root: TrieNode::default(),
            len: 0,
        };
        for line in read_corpus_lines(path)? {
            index.insert(&line);
        }
        Ok(index)
    }

    fn insert(&mut self, line: &[u8]) {
        let mut node = &mut self.root;
        for byte in line {
            node = node.children.entry(*byte).or_default();
        }
        if !node.terminal {
            node.terminal = true;
            self.len += 1;
        }
    }
}

impl MembershipIndex for TrieIndex {
    fn contains(&self, query: &[u8]) -> bool {
        let mut node = &self.root;
        for byte in query {
            match node.children.get(byte) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.terminal
    }

    fn len(&self) -> usize {
        self.len
    }

    fn name(&self) -> &'static str {
        "trie"
    }
}
