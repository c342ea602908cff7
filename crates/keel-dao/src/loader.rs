//! Named SQL resources.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Maps a logical path such as `reports/monthly` to SQL text.
pub trait SqlLoader: Send + Sync {
    /// Returns the SQL stored under `path`, or `None` when there is none.
    fn load(&self, path: &str) -> Result<Option<String>>;
}

/// Loads `<root>/<path>.sql` from disk.
#[derive(Debug, Clone)]
pub struct FsSqlLoader {
    root: PathBuf,
}

impl FsSqlLoader {
    /// Creates a loader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The resource directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        self.root.join(format!("{relative}.sql"))
    }
}

impl SqlLoader for FsSqlLoader {
    fn load(&self, path: &str) -> Result<Option<String>> {
        let file = self.resolve(path);
        match std::fs::read_to_string(&file) {
            Ok(sql) => {
                debug!(path = %file.display(), "loaded sql resource");
                Ok(Some(sql))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %file.display(), "sql resource not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
