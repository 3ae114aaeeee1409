use super::{line_spans, MembershipIndex};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Read-only memory map of the corpus plus a cached table of line records.
///
/// Lookup is a linear scan over the records with early exit on the first
/// equal comparison. Duplicate lines are preserved in the record table but
/// are irrelevant to membership. The map is shared read-only across workers;
/// the OS page cache handles concurrent access.
pub struct MmapScanIndex {
    /// Absent for an empty corpus file, which cannot be mapped portably.
    mmap: Option<Mmap>,
    records: Vec<(usize, usize)>,
}

impl MmapScanIndex {
    pub fn build(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?
            .len();

        if len == 0 {
            return Ok(Self {
                mmap: None,
                records: Vec::new(),
            });
        }

        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("memory-mapping {}", path.display()))?;
        let records = line_spans(&mmap);

        Ok(Self {
            mmap: Some(mmap),
            records,
        })
    }
}

impl MembershipIndex for MmapScanIndex {
    fn contains(&self, query: &[u8]) -> bool {
        let Some(mmap) = &self.mmap else {
            return false;
        };

        self.records
            .iter()
            .any(|&(offset, len)| &mmap[offset..offset + len] == query)
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn name(&self) -> &'static str {
        "mmap-scan"
    }
}
