// ─── Managed Store Layout & Installed-Version Index ───

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// Filesystem layout of the managed installation tree.
///
/// ```text
/// <root>/
///   versions/<id>/        one directory per installed version
///   libraries/            shared library jars
///   assets/indexes/       asset index JSON files
///   assets/objects/       content-addressed asset blobs
///   installations.json    installation records
/// ```
#[derive(Debug, Clone)]
pub struct ManagedStore {
    root: PathBuf,
}

impl ManagedStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn records_path(&self) -> PathBuf {
        self.root.join("installations.json")
    }

    /// Create the base directories if they are missing.
    pub async fn ensure_layout(&self) -> EngineResult<()> {
        for dir in [
            self.versions_dir(),
            self.libraries_dir(),
            self.assets_dir().join("indexes"),
            self.assets_dir().join("objects"),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| EngineError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
        }
        Ok(())
    }
}

/// Read-only view over the version directories of a [`ManagedStore`].
#[derive(Debug, Clone)]
pub struct InstallationIndex {
    store: ManagedStore,
}

impl InstallationIndex {
    pub fn new(store: ManagedStore) -> Self {
        Self { store }
    }

    /// Sorted names of every installed version. A missing or unreadable
    /// versions directory reads as empty.
    pub async fn list_installed(&self) -> Vec<String> {
        let versions_dir = self.store.versions_dir();
        let mut entries = match tokio::fs::read_dir(&versions_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read {:?}: {}", versions_dir, e);
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        names
    }

    /// Search installed versions. An exact hit returns just that name;
    /// otherwise a case-insensitive substring scan in index order.
    pub async fn find(&self, query: &str) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }

        let query = query.trim();
        let installed = self.list_installed().await;
        if installed.iter().any(|name| name == query) {
            return vec![query.to_string()];
        }

        let needle = query.to_lowercase();
        installed
            .into_iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Directory-existence check for a single version. Never errors.
    pub fn is_installed(&self, version: &str) -> bool {
        if version.is_empty() {
            return false;
        }
        self.store.version_dir(version).is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn populated_index(temp: &TempDir) -> InstallationIndex {
        let store = ManagedStore::new(temp.path());
        for version in ["1.20.1", "1.20.1-fabric", "1.16.5"] {
            std::fs::create_dir_all(store.version_dir(version)).unwrap();
        }
        std::fs::write(store.versions_dir().join("stray.txt"), b"not a version").unwrap();
        InstallationIndex::new(store)
    }

    #[tokio::test]
    async fn list_is_sorted_and_skips_files() {
        let temp = TempDir::new().unwrap();
        let index = populated_index(&temp);

        let installed = index.list_installed().await;
        assert_eq!(installed, vec!["1.16.5", "1.20.1", "1.20.1-fabric"]);
    }

    #[tokio::test]
    async fn missing_versions_dir_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let index = InstallationIndex::new(ManagedStore::new(temp.path().join("nope")));

        assert!(index.list_installed().await.is_empty());
        assert!(index.find("1.20").await.is_empty());
    }

    #[tokio::test]
    async fn exact_match_short_circuits() {
        let temp = TempDir::new().unwrap();
        let index = populated_index(&temp);

        assert_eq!(index.find("1.20.1").await, vec!["1.20.1"]);
    }

    #[tokio::test]
    async fn substring_match_is_case_insensitive_in_index_order() {
        let temp = TempDir::new().unwrap();
        let index = populated_index(&temp);

        assert_eq!(index.find("20").await, vec!["1.20.1", "1.20.1-fabric"]);
        assert_eq!(index.find("FABRIC").await, vec!["1.20.1-fabric"]);
        assert!(index.find("9.9").await.is_empty());
    }

    #[tokio::test]
    async fn empty_query_returns_nothing_but_whitespace_matches_everything() {
        let temp = TempDir::new().unwrap();
        let index = populated_index(&temp);

        assert!(index.find("").await.is_empty());
        // A query that trims to nothing degenerates to the empty needle.
        assert_eq!(
            index.find("   ").await,
            vec!["1.16.5", "1.20.1", "1.20.1-fabric"]
        );
    }

    #[tokio::test]
    async fn is_installed_checks_the_directory() {
        let temp = TempDir::new().unwrap();
        let index = populated_index(&temp);

        assert!(index.is_installed("1.20.1"));
        assert!(!index.is_installed("9.9.9"));
        assert!(!index.is_installed(""));
    }

    #[tokio::test]
    async fn ensure_layout_creates_base_directories() {
        let temp = TempDir::new().unwrap();
        let store = ManagedStore::new(temp.path().join("vault"));

        store.ensure_layout().await.unwrap();

        assert!(store.versions_dir().is_dir());
        assert!(store.libraries_dir().is_dir());
        assert!(store.assets_dir().join("indexes").is_dir());
        assert!(store.assets_dir().join("objects").is_dir());
    }
}
