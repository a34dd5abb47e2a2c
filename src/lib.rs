// ─── craftvault ───
//
// Installation and migration engine for locally managed Minecraft
// version trees.
//
// Architecture:
//   catalog    — TTL-cached release catalog with stale/fallback degradation
//   install    — retry/backoff install orchestration and log classification
//   launch     — validated offline launches of installed versions
//   store      — managed-root layout and the installed-version index
//   storage    — installation-record persistence
//   locator    — discovery of foreign installation roots
//   import     — collision-skipping copies out of foreign roots
//   provider   — installation backend trait and the Mojang implementation
//   downloader — concurrent SHA-1-verified downloads
//   engine     — facade, spawned workers, single-flight guards

pub mod auth;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod engine;
pub mod error;
pub mod http;
pub mod import;
pub mod install;
pub mod launch;
pub mod locator;
pub mod provider;
pub mod storage;
pub mod store;

pub use crate::config::EngineConfig;
pub use crate::engine::{Engine, EngineEvent, TaskHandle};
pub use crate::error::{EngineError, EngineResult};
pub use crate::import::{ImportItem, ImportOutcome};
pub use crate::install::{InstallState, LogColor};
pub use crate::storage::{InstallationRecord, InstallationStore, JsonInstallationStore};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. The embedding application
/// decides when, and whether, to call this.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,craftvault=debug")),
        )
        .init();
}
