//! In-memory record of content hashes seen during one search.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

/// Set of observed hashes, each remembering the first file that produced it.
///
/// Entries are only ever added.
#[derive(Debug, Default)]
pub struct HashLedger {
    seen: HashMap<String, PathBuf>,
}

impl HashLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` as produced by `path`.
    ///
    /// Returns the earlier file when the hash was already present, leaving
    /// the ledger unchanged.
    pub fn observe(&mut self, hash: &str, path: &Path) -> Option<PathBuf> {
        match self.seen.entry(hash.to_string()) {
            Entry::Occupied(first) => Some(first.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(path.to_path_buf());
                None
            }
        }
    }

    #[must_use]
    pub fn first_seen(&self, hash: &str) -> Option<&Path> {
        self.seen.get(hash).map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
