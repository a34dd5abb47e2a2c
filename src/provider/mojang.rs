// ─── Mojang Installation Backend ───

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::LaunchIdentity;
use crate::downloader::{validate_sha1, DownloadEntry, Downloader};
use crate::error::{EngineError, EngineResult};
use crate::provider::manifest::VersionManifest;
use crate::provider::version_file::{AssetIndexInfo, VersionJson};
use crate::provider::{
    InstallEvent, InstallEventSink, LaunchPlan, VersionChannel, VersionProvider, VersionSummary,
};
use crate::store::ManagedStore;

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";

const ASSET_CONCURRENCY: usize = 8;
const DEFAULT_MAX_HEAP_MB: u32 = 2048;
const JAVA_PROGRAM: &str = "java";

/// Asset index wire format: logical names mapped to content-addressed
/// objects.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

/// Installs and launches vanilla versions from Mojang's CDN.
pub struct MojangProvider {
    client: Client,
    downloader: Downloader,
}

impl MojangProvider {
    pub fn new(client: Client) -> Self {
        Self {
            downloader: Downloader::new(client.clone()),
            client,
        }
    }

    async fn download_client_jar(
        &self,
        version: &str,
        version_json: &VersionJson,
        store: &ManagedStore,
        events: &InstallEventSink<'_>,
    ) -> EngineResult<()> {
        let Some(client_info) = version_json
            .downloads
            .as_ref()
            .and_then(|downloads| downloads.client.as_ref())
        else {
            return Ok(());
        };

        let jar_path = store.version_dir(version).join(format!("{version}.jar"));
        if jar_path.is_file() {
            match &client_info.sha1 {
                Some(expected) => {
                    if validate_sha1(&jar_path, expected).await {
                        return Ok(());
                    }
                }
                // No digest to check against, trust the existing file.
                None => return Ok(()),
            }
        }

        events(InstallEvent::Status(format!("Downloading client {version}")));
        events(InstallEvent::TaskSize(1));

        self.downloader
            .download_file(&DownloadEntry {
                url: client_info.url.clone(),
                dest: jar_path,
                sha1: client_info.sha1.clone(),
            })
            .await?;

        events(InstallEvent::Progress(1));
        Ok(())
    }

    async fn download_libraries(
        &self,
        version_json: &VersionJson,
        store: &ManagedStore,
        events: &InstallEventSink<'_>,
    ) -> EngineResult<()> {
        let libraries_dir = store.libraries_dir();
        let mut entries = Vec::new();

        for library in &version_json.libraries {
            if !library.is_allowed_for_current_os() {
                continue;
            }
            let Some(artifact) = library
                .downloads
                .as_ref()
                .and_then(|downloads| downloads.artifact.as_ref())
            else {
                continue;
            };
            let Some(relative) = &artifact.path else {
                continue;
            };

            let dest = libraries_dir.join(relative);
            if dest.is_file() {
                continue;
            }
            entries.push(DownloadEntry {
                url: artifact.url.clone(),
                dest,
                sha1: artifact.sha1.clone(),
            });
        }

        if entries.is_empty() {
            return Ok(());
        }

        events(InstallEvent::Status(format!(
            "Downloading {} libraries",
            entries.len()
        )));
        events(InstallEvent::TaskSize(entries.len() as u64));

        let failures = self
            .downloader
            .download_batch(entries, |done| events(InstallEvent::Progress(done)))
            .await;

        if let Some((entry, error)) = failures.into_iter().next() {
            warn!("Library download failed for {}: {}", entry.url, error);
            return Err(error);
        }
        Ok(())
    }

    async fn install_assets(
        &self,
        index_info: &AssetIndexInfo,
        store: &ManagedStore,
        events: &InstallEventSink<'_>,
    ) -> EngineResult<()> {
        events(InstallEvent::Status(format!(
            "Fetching asset index {}",
            index_info.id
        )));

        let response = self.client.get(&index_info.url).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::DownloadFailed {
                url: index_info.url.clone(),
                status: response.status().as_u16(),
            });
        }
        let raw = response.text().await?;
        let index: AssetIndex = serde_json::from_str(&raw)?;

        let indexes_dir = store.assets_dir().join("indexes");
        tokio::fs::create_dir_all(&indexes_dir)
            .await
            .map_err(|e| EngineError::Io {
                path: indexes_dir.clone(),
                source: e,
            })?;
        let index_path = indexes_dir.join(format!("{}.json", index_info.id));
        tokio::fs::write(&index_path, &raw)
            .await
            .map_err(|e| EngineError::Io {
                path: index_path.clone(),
                source: e,
            })?;

        let objects_dir = store.assets_dir().join("objects");
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for object in index.objects.values() {
            if object.hash.len() < 2 || !seen.insert(object.hash.clone()) {
                continue;
            }
            let prefix = &object.hash[..2];
            let dest = objects_dir.join(prefix).join(&object.hash);
            if dest.is_file() {
                continue;
            }
            pending.push((
                object.hash.clone(),
                DownloadEntry {
                    url: format!("{RESOURCES_URL}/{prefix}/{}", object.hash),
                    dest,
                    sha1: Some(object.hash.clone()),
                },
            ));
        }

        if pending.is_empty() {
            return Ok(());
        }

        events(InstallEvent::TaskSize(pending.len() as u64));

        let completed = AtomicU64::new(0);
        let failures: Vec<EngineError> = stream::iter(pending.into_iter().map(|(hash, entry)| {
            let completed = &completed;
            async move {
                let result = self.downloader.download_file(&entry).await;
                if result.is_ok() {
                    events(InstallEvent::Status(hash));
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    events(InstallEvent::Progress(done));
                }
                result
            }
        }))
        .buffer_unordered(ASSET_CONCURRENCY)
        .filter_map(|result| async move { result.err() })
        .collect()
        .await;

        if let Some(error) = failures.into_iter().next() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl VersionProvider for MojangProvider {
    async fn fetch_versions(&self) -> EngineResult<Vec<VersionSummary>> {
        let manifest = VersionManifest::fetch(&self.client).await?;
        Ok(manifest
            .versions
            .into_iter()
            .map(|entry| VersionSummary {
                channel: VersionChannel::parse(&entry.version_type),
                id: entry.id,
            })
            .collect())
    }

    async fn install(
        &self,
        version: &str,
        store: &ManagedStore,
        events: &InstallEventSink<'_>,
    ) -> EngineResult<()> {
        info!("Installing {} into {:?}", version, store.root());
        store.ensure_layout().await?;

        events(InstallEvent::Status(format!("Resolving {version}")));
        let manifest = VersionManifest::fetch(&self.client).await?;
        let entry = manifest
            .find_version(version)
            .ok_or_else(|| EngineError::VersionNotFound(version.to_string()))?;

        let (version_json, raw) = VersionJson::fetch(&self.client, &entry.url).await?;

        let version_dir = store.version_dir(version);
        tokio::fs::create_dir_all(&version_dir)
            .await
            .map_err(|e| EngineError::Io {
                path: version_dir.clone(),
                source: e,
            })?;
        let json_path = version_dir.join(format!("{version}.json"));
        tokio::fs::write(&json_path, &raw)
            .await
            .map_err(|e| EngineError::Io {
                path: json_path.clone(),
                source: e,
            })?;

        self.download_client_jar(version, &version_json, store, events)
            .await?;
        self.download_libraries(&version_json, store, events).await?;
        if let Some(index_info) = &version_json.asset_index {
            self.install_assets(index_info, store, events).await?;
        }

        info!("Installed {}", version);
        Ok(())
    }

    async fn launch_plan(
        &self,
        version: &str,
        store: &ManagedStore,
        identity: &LaunchIdentity,
    ) -> EngineResult<LaunchPlan> {
        let json_path = store.version_dir(version).join(format!("{version}.json"));
        let raw = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|e| EngineError::Io {
                path: json_path.clone(),
                source: e,
            })?;
        let version_json: VersionJson = serde_json::from_str(&raw)?;

        let mut args = vec![
            format!("-Xmx{DEFAULT_MAX_HEAP_MB}M"),
            "-cp".to_string(),
            build_classpath(version, &version_json, store),
            version_json.main_class.clone(),
        ];
        args.extend(resolve_game_args(&version_json, version, store, identity));

        Ok(LaunchPlan {
            program: JAVA_PROGRAM.to_string(),
            args,
            current_dir: store.root().to_path_buf(),
        })
    }
}

pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Join the on-disk jars of the allowed libraries plus the client jar.
fn build_classpath(version: &str, version_json: &VersionJson, store: &ManagedStore) -> String {
    let libraries_dir = store.libraries_dir();
    let mut parts = Vec::new();

    for library in &version_json.libraries {
        if !library.is_allowed_for_current_os() {
            continue;
        }
        let Some(artifact) = library
            .downloads
            .as_ref()
            .and_then(|downloads| downloads.artifact.as_ref())
        else {
            continue;
        };
        let Some(relative) = &artifact.path else {
            continue;
        };
        let path = libraries_dir.join(relative);
        if path.is_file() {
            parts.push(path.to_string_lossy().to_string());
        }
    }

    let jar_path = store.version_dir(version).join(format!("{version}.jar"));
    parts.push(jar_path.to_string_lossy().to_string());

    parts.join(classpath_separator())
}

fn resolve_game_args(
    version_json: &VersionJson,
    version: &str,
    store: &ManagedStore,
    identity: &LaunchIdentity,
) -> Vec<String> {
    let assets_index_name = version_json
        .asset_index
        .as_ref()
        .map(|info| info.id.clone())
        .or_else(|| version_json.assets.clone())
        .unwrap_or_else(|| "legacy".to_string());

    let replacements = [
        ("${auth_player_name}", identity.username.clone()),
        ("${version_name}", version.to_string()),
        (
            "${game_directory}",
            store.root().to_string_lossy().to_string(),
        ),
        (
            "${assets_root}",
            store.assets_dir().to_string_lossy().to_string(),
        ),
        ("${assets_index_name}", assets_index_name),
        ("${auth_uuid}", identity.uuid.clone()),
        ("${auth_access_token}", identity.access_token.clone()),
        ("${auth_xuid}", "0".to_string()),
        ("${clientid}", "0".to_string()),
        ("${user_properties}", "{}".to_string()),
        ("${user_type}", "legacy".to_string()),
        ("${version_type}", "release".to_string()),
    ];

    let mut resolved_args = Vec::new();
    for arg in version_json.game_args() {
        let mut resolved = arg;
        for (placeholder, value) in &replacements {
            if resolved.contains(placeholder) {
                resolved = resolved.replace(placeholder, value);
            }
        }

        // Skip unresolved placeholders to avoid passing malformed values.
        if resolved.contains("${") {
            drop_dangling_option(&mut resolved_args);
            continue;
        }
        resolved_args.push(resolved);
    }
    resolved_args
}

/// If the previous argument is a lone option switch, drop it so the
/// command line stays coherent after its value was skipped.
fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().map(|last| last.starts_with('-')).unwrap_or(false) {
        args.pop();
    }
}
