// ─── Engine Facade ───
//
// Wires the catalog, orchestrator, launcher, locator and importer
// behind one explicitly constructed surface. Long-running work can run
// inline through the async methods or on spawned workers that report
// through an event channel and honor cooperative cancellation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::catalog::VersionCatalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::http::build_http_client;
use crate::import::{ImportEngine, ImportItem};
use crate::install::{InstallOrchestrator, InstallState, LogColor};
use crate::launch::LaunchSession;
use crate::locator::ForeignInstallationLocator;
use crate::provider::{MojangProvider, VersionProvider};
use crate::storage::{InstallationRecord, InstallationStore, JsonInstallationStore};
use crate::store::{InstallationIndex, ManagedStore};

/// Notifications emitted by spawned workers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    InstallProgress(u64),
    InstallLog { message: String, color: LogColor },
    InstallFinished { version: String, ok: bool },
    LaunchLog { message: String, color: LogColor },
    LaunchFinished { version: String, ok: bool },
    Import(ImportItem),
    ImportLog(String),
    ImportFinished(BTreeMap<PathBuf, Vec<String>>),
}

/// Handle to a spawned worker. Exactly one terminal event arrives on
/// `events` before the channel closes, cancellation included.
pub struct TaskHandle<T> {
    pub events: mpsc::UnboundedReceiver<EngineEvent>,
    stop: Arc<AtomicBool>,
    join: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// Ask the worker to stand down. The flag is checked before
    /// blocking work begins; work already underway runs to completion.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl<T: Default> TaskHandle<T> {
    /// Wait for the worker and return its outcome.
    pub async fn wait(self) -> T {
        match self.join.await {
            Ok(value) => value,
            Err(e) => {
                warn!("Worker task failed: {}", e);
                T::default()
            }
        }
    }
}

/// Releases its single-flight flag on drop.
struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl FlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then(|| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Facade over the whole installation tree. One instance per managed
/// root; at most one install and one launch run at a time per instance.
pub struct Engine {
    config: EngineConfig,
    store: ManagedStore,
    index: InstallationIndex,
    locator: ForeignInstallationLocator,
    catalog: VersionCatalog,
    orchestrator: Arc<InstallOrchestrator>,
    launcher: Arc<LaunchSession>,
    importer: Arc<ImportEngine>,
    storage: Arc<dyn InstallationStore>,
    install_in_flight: Arc<AtomicBool>,
    launch_in_flight: Arc<AtomicBool>,
}

impl Engine {
    /// Wire an engine from explicit collaborators.
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn VersionProvider>,
        storage: Arc<dyn InstallationStore>,
    ) -> Self {
        Self::with_locator(
            config,
            provider,
            storage,
            ForeignInstallationLocator::from_system(),
        )
    }

    /// Like [`Engine::new`] with an explicit locator instead of the
    /// system directories.
    pub fn with_locator(
        config: EngineConfig,
        provider: Arc<dyn VersionProvider>,
        storage: Arc<dyn InstallationStore>,
        locator: ForeignInstallationLocator,
    ) -> Self {
        let store = ManagedStore::new(config.managed_root.clone());
        let catalog = VersionCatalog::new(
            Arc::clone(&provider),
            config.catalog_ttl,
            config.catalog_limit,
        );
        let orchestrator = Arc::new(InstallOrchestrator::new(
            Arc::clone(&provider),
            store.clone(),
            &config,
        ));
        let launcher = Arc::new(LaunchSession::new(provider, store.clone()));
        let importer = Arc::new(ImportEngine::new(
            store.clone(),
            Arc::clone(&storage),
            locator.clone(),
        ));

        Self {
            index: InstallationIndex::new(store.clone()),
            store,
            locator,
            catalog,
            orchestrator,
            launcher,
            importer,
            storage,
            config,
            install_in_flight: Arc::new(AtomicBool::new(false)),
            launch_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Engine with production collaborators: the Mojang backend and the
    /// JSON record store inside the managed root.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let client = build_http_client()?;
        let store = ManagedStore::new(config.managed_root.clone());
        store.ensure_layout().await?;

        let provider: Arc<dyn VersionProvider> = Arc::new(MojangProvider::new(client));
        let storage: Arc<dyn InstallationStore> =
            Arc::new(JsonInstallationStore::open(store.records_path()).await);
        Ok(Self::new(config, provider, storage))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &ManagedStore {
        &self.store
    }

    // ── Direct surface ──────────────────────────────────

    /// Installable release versions, served from cache when fresh.
    /// Never empty.
    pub async fn get_all_versions(&self) -> Vec<String> {
        self.catalog.get_all_versions().await
    }

    /// Install `version`, recording it for `owner` on success. Logs a
    /// rejection and returns `false` while another install runs.
    pub async fn install(
        &self,
        version: &str,
        owner: &str,
        on_progress: impl Fn(u64) + Send + Sync,
        on_log: impl Fn(&str, LogColor) + Send + Sync,
    ) -> bool {
        let Some(_guard) = FlightGuard::acquire(&self.install_in_flight) else {
            on_log(
                "[install] another installation is already running",
                LogColor::Error,
            );
            return false;
        };

        let ok = self
            .orchestrator
            .install(version, &on_progress, &on_log)
            .await;
        if ok {
            self.record_installation(version, owner).await;
        }
        ok
    }

    pub async fn install_state(&self) -> InstallState {
        self.orchestrator.state().await
    }

    /// Launch an installed version for `username`. Busy engines reject
    /// immediately.
    pub async fn launch(&self, version: &str, username: &str) -> bool {
        let Some(_guard) = FlightGuard::acquire(&self.launch_in_flight) else {
            warn!("Launch rejected: another launch is in progress");
            return false;
        };

        self.launcher.launch(version, username).await
    }

    pub async fn list_installed(&self) -> Vec<String> {
        self.index.list_installed().await
    }

    pub async fn find_installed(&self, query: &str) -> Vec<String> {
        self.index.find(query).await
    }

    pub fn is_installed(&self, version: &str) -> bool {
        self.index.is_installed(version)
    }

    /// Versions recorded for `owner`, matched case-insensitively.
    pub async fn find_installed_by_owner(&self, owner: &str) -> Vec<String> {
        if owner.is_empty() {
            return Vec::new();
        }

        let needle = owner.to_lowercase();
        self.storage
            .get_installations()
            .await
            .into_iter()
            .filter(|record| record.owner.to_lowercase() == needle)
            .map(|record| record.version)
            .collect()
    }

    pub async fn installations(&self) -> Vec<InstallationRecord> {
        self.storage.get_installations().await
    }

    pub fn locate_foreign_roots(&self) -> Vec<PathBuf> {
        self.locator.locate()
    }

    pub fn detect_versions_in_path(&self, path: &Path) -> Vec<String> {
        self.locator.detect_versions_in_path(path)
    }

    pub fn detect_all_in_system(&self) -> BTreeMap<PathBuf, Vec<String>> {
        self.locator.detect_all_in_system()
    }

    /// Import from one root; returns the names actually copied.
    pub async fn import_from_path(
        &self,
        path: &Path,
        owner: Option<&str>,
        on_item: impl Fn(&ImportItem) + Send + Sync,
    ) -> Vec<String> {
        self.importer.import_from(path, owner, on_item).await.imported
    }

    pub async fn detect_and_import_all(&self) -> BTreeMap<PathBuf, Vec<String>> {
        self.importer.detect_and_import_all().await
    }

    async fn record_installation(&self, version: &str, owner: &str) {
        if let Err(e) = self.storage.add_installation(version, owner).await {
            warn!(
                "Could not record installation {} for {}: {}",
                version, owner, e
            );
        }
    }

    // ── Workers ─────────────────────────────────────────

    /// Run an install on a worker task. Fails fast with
    /// [`EngineError::Busy`] while another install is in flight.
    pub fn spawn_install(
        &self,
        version: impl Into<String>,
        owner: impl Into<String>,
    ) -> EngineResult<TaskHandle<bool>> {
        let version = version.into();
        let owner = owner.into();
        let Some(guard) = FlightGuard::acquire(&self.install_in_flight) else {
            return Err(EngineError::Busy("an installation is already running"));
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let orchestrator = Arc::clone(&self.orchestrator);
        let storage = Arc::clone(&self.storage);

        let join = tokio::spawn(async move {
            let _guard = guard;

            if worker_stop.load(Ordering::SeqCst) {
                let _ = tx.send(EngineEvent::InstallFinished { version, ok: false });
                return false;
            }

            let progress_tx = tx.clone();
            let log_tx = tx.clone();
            let ok = orchestrator
                .install(
                    &version,
                    move |value| {
                        let _ = progress_tx.send(EngineEvent::InstallProgress(value));
                    },
                    move |message: &str, color| {
                        let _ = log_tx.send(EngineEvent::InstallLog {
                            message: message.to_string(),
                            color,
                        });
                    },
                )
                .await;

            if ok {
                if let Err(e) = storage.add_installation(&version, &owner).await {
                    warn!(
                        "Could not record installation {} for {}: {}",
                        version, owner, e
                    );
                }
            }

            let _ = tx.send(EngineEvent::InstallFinished { version, ok });
            ok
        });

        Ok(TaskHandle {
            events: rx,
            stop,
            join,
        })
    }

    /// Run a launch on a worker task. Fails fast with
    /// [`EngineError::Busy`] while another launch is in flight.
    pub fn spawn_launch(
        &self,
        version: impl Into<String>,
        username: impl Into<String>,
    ) -> EngineResult<TaskHandle<bool>> {
        let version = version.into();
        let username = username.into();
        let Some(guard) = FlightGuard::acquire(&self.launch_in_flight) else {
            return Err(EngineError::Busy("a launch is already in progress"));
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let launcher = Arc::clone(&self.launcher);

        let join = tokio::spawn(async move {
            let _guard = guard;

            if worker_stop.load(Ordering::SeqCst) {
                let _ = tx.send(EngineEvent::LaunchFinished { version, ok: false });
                return false;
            }

            let _ = tx.send(EngineEvent::LaunchLog {
                message: format!("Launching {version} as {username}..."),
                color: LogColor::Plain,
            });

            let ok = launcher.launch(&version, &username).await;
            let _ = tx.send(EngineEvent::LaunchFinished { version, ok });
            ok
        });

        Ok(TaskHandle {
            events: rx,
            stop,
            join,
        })
    }

    /// Import a batch of roots sequentially on a worker task.
    /// Cancellation is honored between roots.
    pub fn spawn_import(
        &self,
        roots: Vec<PathBuf>,
        owner: Option<String>,
    ) -> TaskHandle<BTreeMap<PathBuf, Vec<String>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let importer = Arc::clone(&self.importer);

        let join = tokio::spawn(async move {
            let mut results = BTreeMap::new();

            for root in roots {
                if worker_stop.load(Ordering::SeqCst) {
                    break;
                }

                let item_tx = tx.clone();
                let outcome = importer
                    .import_from(&root, owner.as_deref(), move |item| {
                        let _ = item_tx.send(EngineEvent::Import(item.clone()));
                    })
                    .await;

                if !outcome.imported.is_empty() {
                    let _ = tx.send(EngineEvent::ImportLog(format!(
                        "Imported {} versions from {}",
                        outcome.imported.len(),
                        outcome.source_root.display()
                    )));
                    results.insert(outcome.source_root, outcome.imported);
                }
            }

            let _ = tx.send(EngineEvent::ImportFinished(results.clone()));
            results
        });

        TaskHandle {
            events: rx,
            stop,
            join,
        }
    }
}
