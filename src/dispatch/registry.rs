use crate::index::{self, reread, MembershipIndex};
use anyhow::Result;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;

/// Reread-mode search: open the file fresh and answer one query.
pub type RereadFn = fn(&Path, &[u8]) -> Result<bool>;

/// Preloaded-mode builder: ingest the corpus once into an index.
pub type BuildFn = fn(&Path) -> Result<Arc<dyn MembershipIndex>>;

/// One selectable search algorithm: how to scan in reread mode, and which
/// index to build when the corpus is preloaded.
#[derive(Clone, Copy)]
pub struct Algorithm {
    pub reread: RereadFn,
    pub build: BuildFn,
}

/// Maps algorithm display names to executable search code.
///
/// The supervisor resolves a single `Algorithm` handle at startup; names are
/// never re-resolved on the query path.
pub struct AlgorithmRegistry {
    algorithms: DashMap<String, Algorithm>,
}

fn build_hash(path: &Path) -> Result<Arc<dyn MembershipIndex>> {
    Ok(Arc::new(index::HashIndex::build(path)?))
}

fn build_trie(path: &Path) -> Result<Arc<dyn MembershipIndex>> {
    Ok(Arc::new(index::TrieIndex::build(path)?))
}

fn build_sorted(path: &Path) -> Result<Arc<dyn MembershipIndex>> {
    Ok(Arc::new(index::SortedIndex::build(path)?))
}

fn build_mmap_scan(path: &Path) -> Result<Arc<dyn MembershipIndex>> {
    Ok(Arc::new(index::MmapScanIndex::build(path)?))
}

impl AlgorithmRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            algorithms: DashMap::new(),
        })
    }

    /// Registry preloaded with every built-in algorithm under its display
    /// name. Scan-style algorithms build the mmap-scan index when the corpus
    /// is preloaded; set- and tree-style algorithms build their natural
    /// index.
    pub fn with_builtin() -> Arc<Self> {
        let registry = Self::new();

        registry.register(
            "Linear Scan",
            Algorithm {
                reread: reread::linear_scan,
                build: build_mmap_scan,
            },
        );
        registry.register(
            "Hash Set",
            Algorithm {
                reread: reread::hash_probe,
                build: build_hash,
            },
        );
        registry.register(
            "Memory Mapped",
            Algorithm {
                reread: reread::memory_mapped,
                build: build_mmap_scan,
            },
        );
        registry.register(
            "Binary Search",
            Algorithm {
                reread: reread::binary_probe,
                build: build_sorted,
            },
        );
        registry.register(
            "Shell Grep",
            Algorithm {
                reread: reread::shell_grep,
                build: build_mmap_scan,
            },
        );
        registry.register(
            "Trie Search",
            Algorithm {
                reread: reread::trie_probe,
                build: build_trie,
            },
        );
        registry.register(
            "KMP Search",
            Algorithm {
                reread: reread::kmp_search,
                build: build_mmap_scan,
            },
        );
        registry.register(
            "Boyer-Moore",
            Algorithm {
                reread: reread::boyer_moore,
                build: build_mmap_scan,
            },
        );
        registry.register(
            "Rabin-Karp",
            Algorithm {
                reread: reread::rabin_karp,
                build: build_mmap_scan,
            },
        );

        registry
    }

    pub fn register(&self, name: &str, algorithm: Algorithm) {
        self.algorithms.insert(name.to_string(), algorithm);
        tracing::debug!("Registered search algorithm: {}", name);
    }

    pub fn resolve(&self, name: &str) -> Option<Algorithm> {
        self.algorithms.get(name).map(|entry| *entry.value())
    }

    pub fn has_algorithm(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }

    pub fn list_algorithms(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .algorithms
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn algorithm_count(&self) -> usize {
        self.algorithms.len()
    }
}
