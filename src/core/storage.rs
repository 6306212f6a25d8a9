use std::path::{Path, PathBuf};

use crate::error::{DocwatchError, Result};

/// Persisted "current" copy of each monitored page.
///
/// One file per page at `<docs_dir>/<slug>.md`; slugs may contain path
/// separators for nested documentation trees, in which case the intermediate
/// directories are created. Overwriting a snapshot makes the previous
/// revision unrecoverable outside already-rendered diff artifacts.
pub struct SnapshotStore {
    docs_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(docs_dir: P) -> Self {
        Self {
            docs_dir: docs_dir.into(),
        }
    }

    fn page_path(&self, slug: &str) -> PathBuf {
        self.docs_dir.join(format!("{}.md", slug))
    }

    /// Load the stored content for a page, or None when the page has never
    /// been seen before.
    pub fn load(&self, slug: &str) -> Result<Option<String>> {
        let path = self.page_path(slug);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path).map_err(|e| persistence(&path, e))?;
        Ok(Some(content))
    }

    /// Persist a page's content as the new current snapshot.
    pub fn save(&self, slug: &str, content: &str) -> Result<()> {
        let path = self.page_path(slug);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| persistence(parent, e))?;
        }
        std::fs::write(&path, content).map_err(|e| persistence(&path, e))?;
        Ok(())
    }
}

fn persistence(path: &Path, err: std::io::Error) -> DocwatchError {
    DocwatchError::Persistence {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    #[test]
    fn unknown_page_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load("overview").unwrap().is_none());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save("overview", "# Overview\n\nHello").unwrap();
        let loaded = store.load("overview").unwrap();
        assert_eq!(loaded.as_deref(), Some("# Overview\n\nHello"));
    }

    #[test]
    fn overwrite_replaces_previous_revision() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save("overview", "old").unwrap();
        store.save("overview", "new").unwrap();
        assert_eq!(store.load("overview").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn nested_slug_creates_nested_directories() {
        let dir = assert_fs::TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save("api/messages", "# Messages").unwrap();

        dir.child("api/messages.md")
            .assert(predicate::path::exists());
        assert_eq!(
            store.load("api/messages").unwrap().as_deref(),
            Some("# Messages")
        );
    }
}
