//! Read-result memoization.
//!
//! Results are keyed by the SHA-256 digest of the fully rendered SQL text,
//! so two statements that differ only in a literal are distinct entries.
//! Entries live until [`ResultCache::flush`].

use dashmap::DashMap;
use keel_core::Rowset;
use sha2::{Digest, Sha256};

/// Concurrent cache of rowsets keyed by statement digest.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<String, Rowset>,
}

/// Hex SHA-256 digest of `sql`.
#[must_use]
pub fn statement_key(sql: &str) -> String {
    let digest = Sha256::digest(sql.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl ResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the rowset stored for `sql`.
    #[must_use]
    pub fn get(&self, sql: &str) -> Option<Rowset> {
        self.entries
            .get(&statement_key(sql))
            .map(|entry| entry.value().clone())
    }

    /// Stores the rowset for `sql`.
    pub fn insert(&self, sql: &str, rows: Rowset) {
        self.entries.insert(statement_key(sql), rows);
    }

    /// Number of cached statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn flush(&self) {
        self.entries.clear();
    }
}
