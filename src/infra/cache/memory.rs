//! In-memory result cache.

use std::collections::HashMap;

use crate::core::{Fingerprint, ResultCache, ScheduleResult};

/// Unbounded cache for a single process.
#[derive(Debug, Default)]
pub struct InMemoryResultCache {
    entries: HashMap<Fingerprint, ScheduleResult>,
}

impl InMemoryResultCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultCache for InMemoryResultCache {
    fn get(&self, fingerprint: &Fingerprint) -> Option<ScheduleResult> {
        self.entries.get(fingerprint).cloned()
    }

    fn put(&mut self, fingerprint: Fingerprint, result: ScheduleResult) {
        self.entries.insert(fingerprint, result);
    }

    fn remove(&mut self, fingerprint: &Fingerprint) -> Option<ScheduleResult> {
        self.entries.remove(fingerprint)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
