// ─── Foreign Version Import ───

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::locator::{resolve_version_tree, ForeignInstallationLocator};
use crate::storage::InstallationStore;
use crate::store::ManagedStore;

/// Owner recorded for imports when the caller does not name one.
const IMPORTED_OWNER: &str = "imported";

/// One per-version notification during an import batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    /// 1-based position within the batch.
    pub index: usize,
    pub total: usize,
    pub name: String,
    /// `false` covers both collisions (skips) and copy failures.
    pub copied: bool,
}

/// What one foreign root yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub source_root: PathBuf,
    /// Names actually copied, in enumeration order.
    pub imported: Vec<String>,
}

/// Copies version directories from foreign roots into the managed store.
///
/// Copies are not transactional: a crash mid-copy leaves a partial
/// destination directory that later runs treat as already present.
pub struct ImportEngine {
    store: ManagedStore,
    storage: Arc<dyn InstallationStore>,
    locator: ForeignInstallationLocator,
}

impl ImportEngine {
    pub fn new(
        store: ManagedStore,
        storage: Arc<dyn InstallationStore>,
        locator: ForeignInstallationLocator,
    ) -> Self {
        Self {
            store,
            storage,
            locator,
        }
    }

    /// Import every version folder under `source_root` that the managed
    /// store does not already hold. Collisions and per-version copy
    /// failures are reported through `on_item` and never abort the
    /// batch.
    pub async fn import_from(
        &self,
        source_root: &Path,
        owner: Option<&str>,
        on_item: impl Fn(&ImportItem) + Send + Sync,
    ) -> ImportOutcome {
        let mut imported = Vec::new();

        let Some(source_versions) = resolve_version_tree(source_root) else {
            return ImportOutcome {
                source_root: source_root.to_path_buf(),
                imported,
            };
        };

        let dest_root = self.store.versions_dir();
        if let Err(e) = tokio::fs::create_dir_all(&dest_root).await {
            warn!("Cannot create {:?}: {}", dest_root, e);
            return ImportOutcome {
                source_root: source_root.to_path_buf(),
                imported,
            };
        }

        let names = version_folder_names(&source_versions);
        let total = names.len();
        let owner = owner.unwrap_or(IMPORTED_OWNER);

        for (position, name) in names.into_iter().enumerate() {
            let index = position + 1;
            let source_dir = source_versions.join(&name);
            let dest_dir = dest_root.join(&name);

            if dest_dir.exists() {
                on_item(&ImportItem {
                    index,
                    total,
                    name,
                    copied: false,
                });
                continue;
            }

            match copy_tree(source_dir, dest_dir).await {
                Ok(()) => {
                    if let Err(e) = self.storage.add_installation(&name, owner).await {
                        warn!("Could not record import of {}: {}", name, e);
                    }
                    imported.push(name.clone());
                    on_item(&ImportItem {
                        index,
                        total,
                        name,
                        copied: true,
                    });
                }
                Err(e) => {
                    warn!("Import of {} failed: {}", name, e);
                    on_item(&ImportItem {
                        index,
                        total,
                        name,
                        copied: false,
                    });
                }
            }
        }

        if !imported.is_empty() {
            info!("Imported {} versions from {:?}", imported.len(), source_root);
        }

        ImportOutcome {
            source_root: source_root.to_path_buf(),
            imported,
        }
    }

    /// Locate foreign roots and import each in turn, keeping only the
    /// candidates that yielded something.
    pub async fn detect_and_import_all(&self) -> BTreeMap<PathBuf, Vec<String>> {
        let mut results = BTreeMap::new();
        for candidate in self.locator.locate() {
            let outcome = self.import_from(&candidate, None, |_| {}).await;
            if !outcome.imported.is_empty() {
                results.insert(outcome.source_root, outcome.imported);
            }
        }
        results
    }
}

fn version_folder_names(versions_dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(versions_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect()
}

async fn copy_tree(source: PathBuf, destination: PathBuf) -> EngineResult<()> {
    tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&destination)?;
        copy_dir_recursive(&source, &destination)
    })
    .await
    .map_err(|e| EngineError::Other(format!("Task join error: {e}")))??;

    Ok(())
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = destination.join(entry.file_name());
        if path.is_dir() {
            std::fs::create_dir_all(&dest_path)?;
            copy_dir_recursive(&path, &dest_path)?;
        } else {
            if dest_path.exists() {
                std::fs::remove_file(&dest_path)?;
            }
            std::fs::copy(&path, &dest_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::storage::InstallationRecord;

    struct RecordingStore {
        records: StdMutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                records: StdMutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                records: StdMutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl InstallationStore for RecordingStore {
        async fn add_installation(&self, version: &str, owner: &str) -> EngineResult<bool> {
            if self.fail {
                return Err(EngineError::Other("storage offline".to_string()));
            }
            self.records
                .lock()
                .unwrap()
                .push((version.to_string(), owner.to_string()));
            Ok(true)
        }

        async fn get_installations(&self) -> Vec<InstallationRecord> {
            Vec::new()
        }
    }

    struct Fixture {
        _managed: TempDir,
        _foreign: TempDir,
        engine: ImportEngine,
        storage: Arc<RecordingStore>,
        foreign_root: PathBuf,
        store: ManagedStore,
    }

    fn fixture(storage: Arc<RecordingStore>) -> Fixture {
        let managed = TempDir::new().unwrap();
        let foreign = TempDir::new().unwrap();

        let foreign_root = foreign.path().join("old-launcher");
        for version in ["1.19.4", "1.20.1"] {
            let dir = foreign_root.join(".minecraft/versions").join(version);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join(format!("{version}.json")), b"{}").unwrap();
        }

        let store = ManagedStore::new(managed.path().join("vault"));
        let engine = ImportEngine::new(
            store.clone(),
            Arc::clone(&storage) as Arc<dyn InstallationStore>,
            ForeignInstallationLocator::with_roots(None, None),
        );

        Fixture {
            _managed: managed,
            _foreign: foreign,
            engine,
            storage,
            foreign_root,
            store,
        }
    }

    fn collect_items() -> (
        Arc<StdMutex<Vec<ImportItem>>>,
        impl Fn(&ImportItem) + Send + Sync,
    ) {
        let items = Arc::new(StdMutex::new(Vec::new()));
        let sink_items = Arc::clone(&items);
        (items, move |item: &ImportItem| {
            sink_items.lock().unwrap().push(item.clone())
        })
    }

    #[tokio::test]
    async fn collisions_are_skipped_and_new_versions_copied() {
        let fx = fixture(Arc::new(RecordingStore::new()));
        std::fs::create_dir_all(fx.store.version_dir("1.19.4")).unwrap();

        let (items, on_item) = collect_items();
        let outcome = fx.engine.import_from(&fx.foreign_root, None, on_item).await;

        assert_eq!(outcome.imported, vec!["1.20.1"]);
        assert!(fx.store.version_dir("1.20.1").join("1.20.1.json").is_file());

        let items = items.lock().unwrap();
        assert_eq!(items.len(), 2);
        let skipped = items.iter().find(|item| item.name == "1.19.4").unwrap();
        let copied = items.iter().find(|item| item.name == "1.20.1").unwrap();
        assert!(!skipped.copied);
        assert!(copied.copied);
        for item in items.iter() {
            assert_eq!(item.total, 2);
            assert!(item.index >= 1 && item.index <= 2);
        }
    }

    #[tokio::test]
    async fn a_second_import_is_an_idempotent_no_op() {
        let fx = fixture(Arc::new(RecordingStore::new()));

        let first = fx.engine.import_from(&fx.foreign_root, None, |_| {}).await;
        assert_eq!(first.imported.len(), 2);

        let (items, on_item) = collect_items();
        let second = fx.engine.import_from(&fx.foreign_root, None, on_item).await;

        assert!(second.imported.is_empty());
        assert!(items.lock().unwrap().iter().all(|item| !item.copied));
    }

    #[tokio::test]
    async fn non_roots_import_nothing() {
        let fx = fixture(Arc::new(RecordingStore::new()));

        let (items, on_item) = collect_items();
        let outcome = fx
            .engine
            .import_from(&fx.foreign_root.join("absent"), None, on_item)
            .await;

        assert!(outcome.imported.is_empty());
        assert!(items.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn imports_register_with_the_caller_supplied_owner() {
        let fx = fixture(Arc::new(RecordingStore::new()));

        fx.engine
            .import_from(&fx.foreign_root, Some("steve"), |_| {})
            .await;

        let records = fx.storage.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|(_, owner)| owner == "steve"));
    }

    #[tokio::test]
    async fn missing_owner_defaults_to_imported() {
        let fx = fixture(Arc::new(RecordingStore::new()));

        fx.engine.import_from(&fx.foreign_root, None, |_| {}).await;

        let records = fx.storage.records.lock().unwrap();
        assert!(records.iter().all(|(_, owner)| owner == "imported"));
    }

    #[tokio::test]
    async fn storage_failures_do_not_abort_the_copy() {
        let fx = fixture(Arc::new(RecordingStore::failing()));

        let outcome = fx.engine.import_from(&fx.foreign_root, None, |_| {}).await;

        assert_eq!(outcome.imported.len(), 2);
        assert!(fx.store.version_dir("1.19.4").is_dir());
        assert!(fx.store.version_dir("1.20.1").is_dir());
    }

    #[tokio::test]
    async fn nested_files_survive_the_copy() {
        let fx = fixture(Arc::new(RecordingStore::new()));
        let natives = fx
            .foreign_root
            .join(".minecraft/versions/1.20.1/natives/linux");
        std::fs::create_dir_all(&natives).unwrap();
        std::fs::write(natives.join("liblwjgl.so"), b"elf").unwrap();

        fx.engine.import_from(&fx.foreign_root, None, |_| {}).await;

        assert!(fx
            .store
            .version_dir("1.20.1")
            .join("natives/linux/liblwjgl.so")
            .is_file());
    }

    #[tokio::test]
    async fn system_wide_import_covers_located_roots_once() {
        let managed = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        let tree = data.path().join(".tlauncher/versions/1.8.9");
        std::fs::create_dir_all(&tree).unwrap();
        std::fs::write(tree.join("1.8.9.json"), b"{}").unwrap();

        let store = ManagedStore::new(managed.path().join("vault"));
        let storage = Arc::new(RecordingStore::new());
        let engine = ImportEngine::new(
            store.clone(),
            Arc::clone(&storage) as Arc<dyn InstallationStore>,
            ForeignInstallationLocator::with_roots(None, Some(data.path().to_path_buf())),
        );

        let results = engine.detect_and_import_all().await;
        assert_eq!(results.len(), 1);
        assert_eq!(
            results.get(&data.path().join(".tlauncher")),
            Some(&vec!["1.8.9".to_string()])
        );
        assert!(store.version_dir("1.8.9").is_dir());

        let rerun = engine.detect_and_import_all().await;
        assert!(rerun.is_empty());
    }
}
