//! State shared by every accessor of one unit of work.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::ResultCache;

/// Shared memoization cache and selected database name.
///
/// Accessors created from clones of the same `Arc<Session>` observe the same
/// cached snapshot, whatever their call depth.
#[derive(Debug, Default)]
pub struct Session {
    cache: ResultCache,
    database: RwLock<Option<String>>,
}

impl Session {
    /// Creates a new shared session.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The memoization cache.
    #[must_use]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The currently selected database, if any.
    #[must_use]
    pub fn selected_database(&self) -> Option<String> {
        self.database.read().clone()
    }

    /// Records the selected database.
    pub fn set_selected_database(&self, name: impl Into<String>) {
        *self.database.write() = Some(name.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_database_is_shared() {
        let session = Session::new();
        let other = Arc::clone(&session);

        session.set_selected_database("analytics");
        assert_eq!(other.selected_database().as_deref(), Some("analytics"));
    }
}
