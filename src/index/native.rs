use super::{read_corpus_lines, MembershipIndex};
use anyhow::Result;
use std::path::Path;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Open-addressing hash set with linear probing.
///
/// Contract-identical to `HashIndex`; it exists as a separately selectable
/// variant so benchmark comparisons against the standard hash set carry over.
/// The table is sized to a power of two at build time with at most 50% load
/// and is never resized afterwards.
pub struct NativeSetIndex {
    slots: Vec<Option<Box<[u8]>>>,
    mask: usize,
    len: usize,
}

impl NativeSetIndex {
    pub fn build(path: &Path) -> Result<Self> {
        let lines = read_corpus_lines(path)?;
        let capacity = (lines.len().max(4) * 2).next_power_of_two();

        let mut index = Self {
            slots: (0..capacity).map(|_| None).collect(),
            mask: capacity - 1,
            len: 0,
        };
        for line in lines {
            index.insert(line);
        }
        Ok(index)
    }

    fn insert(&mut self, line: Vec<u8>) {
        let mut slot = (fnv1a(&line) as usize) & self.mask;
        loop {
            match &self.slots[slot] {
                Some(existing) if existing.as_ref() == line.as_slice() => return,
                Some(_) => slot = (slot + 1) & self.mask,
                None => {
                    self.slots[slot] = Some(line.into_boxed_slice());
                    self.len += 1;
                    return;
                }
            }
        }
    }
}

impl MembershipIndex for NativeSetIndex {
    fn contains(&self, query: &[u8]) -> bool {
        let mut slot = (fnv1a(query) as usize) & self.mask;
        loop {
            match &self.slots[slot] {
                Some(existing) if existing.as_ref() == query => return true,
                Some(_) => slot = (slot + 1) & self.mask,
                None => return false,
            }
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn name(&self) -> &'static str {
        "native-set"
    }
}
