//! Deduplication
//!
//! Within one ingestion run, an entry is identified by
//! `"{message_id}:{request_id}"` when both ids are present. The first
//! successfully mapped occurrence wins; later lines with the same identity are
//! dropped, even if their content differs. Records lacking either id are never
//! deduplicated.
//!
//! [`DedupSet`] is an explicit accumulator owned by the orchestrator for the
//! duration of one run. It is never shared across runs.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `key` has already been admitted. Untracked records are never seen.
    pub fn is_duplicate(&self, key: Option<&str>) -> bool {
        key.is_some_and(|k| self.seen.contains(k))
    }

    /// Record a successfully mapped identity.
    pub fn mark_processed(&mut self, key: Option<String>) {
        if let Some(key) = key {
            self.seen.insert(key);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
