//! Reread-Mode Search Algorithms
//!
//! Every function here opens the corpus fresh and answers one membership
//! query against the live file contents. No state is cached between calls;
//! each query observes the current filesystem state. The algorithms differ
//! only in how they scan, which is what the offline benchmark report
//! compares.

use super::{line_spans, trie::TrieIndex, MembershipIndex};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};

/// Line-by-line equality scan with early exit.
pub fn linear_scan(path: &Path, query: &[u8]) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .with_context(|| format!("reading {}", path.display()))?;
        if read == 0 {
            return Ok(false);
        }

        let mut candidate = line.as_slice();
        if let Some(stripped) = candidate.strip_suffix(b"\n") {
            candidate = stripped;
            if let Some(stripped) = candidate.strip_suffix(b"\r") {
                candidate = stripped;
            }
        }

        if candidate == query {
            return Ok(true);
        }
    }
}

/// Builds a throwaway hash set of the file's lines and probes it once.
pub fn hash_probe(path: &Path, query: &[u8]) -> Result<bool> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let lines: HashSet<&[u8]> = line_spans(&bytes)
        .into_iter()
        .map(|(offset, len)| &bytes[offset..offset + len])
        .collect();
    Ok(lines.contains(query))
}

/// Memory-maps the file and scans its line records.
pub fn memory_mapped(path: &Path, query: &[u8]) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        // An empty file has no lines, so nothing can match.
        return Ok(false);
    }

    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("memory-mapping {}", path.display()))?;
    Ok(line_spans(&mmap)
        .into_iter()
        .any(|(offset, len)| &mmap[offset..offset + len] == query))
}

/// Sorts the file's lines and binary-searches the result.
pub fn binary_probe(path: &Path, query: &[u8]) -> Result<bool> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut lines: Vec<&[u8]> = line_spans(&bytes)
        .into_iter()
        .map(|(offset, len)| &bytes[offset..offset + len])
        .collect();
    lines.sort_unstable();
    Ok(lines.binary_search_by(|line| (*line).cmp(query)).is_ok())
}

/// Delegates to `grep -Fxq`, the fixed-string whole-line mode.
pub fn shell_grep(path: &Path, query: &[u8]) -> Result<bool> {
    if !path.exists() {
        anyhow::bail!("corpus {} not found", path.display());
    }

    // argv is NUL-terminated, so a query with interior NULs cannot be passed
    // to grep. A query with a newline would be split by grep into several
    // patterns. Neither can equal a corpus line, so both answer false.
    if query.contains(&0) || query.contains(&b'\n') {
        return Ok(false);
    }

    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let status = Command::new("grep")
        .arg("-Fxq")
        .arg("-e")
        .arg(OsStr::from_bytes(query))
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("spawning grep")?;

    Ok(status.success())
}

/// Builds a throwaway trie from the file's lines and probes it once.
pub fn trie_probe(path: &Path, query: &[u8]) -> Result<bool> {
    let trie = TrieIndex::build(path)?;
    Ok(trie.contains(query))
}

/// Knuth-Morris-Pratt over lines of matching length.
pub fn kmp_search(path: &Path, query: &[u8]) -> Result<bool> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    for (offset, len) in line_spans(&bytes) {
        let line = &bytes[offset..offset + len];
        if line.len() != query.len() {
            continue;
        }
        if query.is_empty() || kmp_match(line, query) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn kmp_match(text: &[u8], pattern: &[u8]) -> bool {
    let mut prefix_table = vec![0usize; pattern.len()];
    let mut j = 0;
    for i in 1..pattern.len() {
        while j > 0 && pattern[i] != pattern[j] {
            j = prefix_table[j - 1];
        }
        if pattern[i] == pattern[j] {
            j += 1;
        }
        prefix_table[i] = j;
    }

    let mut j = 0;
    for &byte in text {
        while j > 0 && byte != pattern[j] {
            j = prefix_table[j - 1];
        }
        if byte == pattern[j] {
            j += 1;
        }
        if j == pattern.len() {
            return true;
        }
    }
    false
}

/// Boyer-Moore (bad-character rule) over lines of matching length.
pub fn boyer_moore(path: &Path, query: &[u8]) -> Result<bool> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    for (offset, len) in line_spans(&bytes) {
        let line = &bytes[offset..offset + len];
        if line.len() != query.len() {
            continue;
        }
        if query.is_empty() || bm_match(line, query) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bm_match(text: &[u8], pattern: &[u8]) -> bool {
    let m = pattern.len();
    let mut skip = [m; 256];
    for (i, &byte) in pattern.iter().enumerate().take(m - 1) {
        skip[byte as usize] = m - i - 1;
    }

    let mut i = m - 1;
    while i < text.len() {
        let mut j = m;
        let mut k = i + 1;
        while j > 0 && text[k - 1] == pattern[j - 1] {
            j -= 1;
            k -= 1;
        }
        if j == 0 {
            return true;
        }
        i += skip[text[i] as usize];
    }
    false
}

/// Rabin-Karp over lines of matching length: compare hashes first, bytes on a
/// hash hit.
pub fn rabin_karp(path: &Path, query: &[u8]) -> Result<bool> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let query_hash = fingerprint(query);

    for (offset, len) in line_spans(&bytes) {
        let line = &bytes[offset..offset + len];
        if line.len() != query.len() {
            continue;
        }
        if fingerprint(line) == query_hash && line == query {
            return Ok(true);
        }
    }
    Ok(false)
}

fn fingerprint(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_mul(257).wrapping_add(u64::from(b)))
}
