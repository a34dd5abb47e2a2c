// ─── Installation Backend ───
//
// The engine talks to version sources through `VersionProvider`.
// `MojangProvider` is the production implementation; tests substitute
// scripted ones.

pub mod manifest;
pub mod mojang;
pub mod version_file;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::auth::LaunchIdentity;
use crate::error::EngineResult;
use crate::store::ManagedStore;

pub use manifest::{VersionManifest, VersionManifestEntry, VERSION_MANIFEST_URL};
pub use mojang::MojangProvider;

/// Release channel of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChannel {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
    Unknown,
}

impl VersionChannel {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "release" => VersionChannel::Release,
            "snapshot" => VersionChannel::Snapshot,
            "old_beta" => VersionChannel::OldBeta,
            "old_alpha" => VersionChannel::OldAlpha,
            _ => VersionChannel::Unknown,
        }
    }

    pub fn is_release(self) -> bool {
        matches!(self, VersionChannel::Release)
    }
}

/// One version as advertised by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSummary {
    pub id: String,
    pub channel: VersionChannel,
}

/// Raw notifications emitted while an install attempt runs.
///
/// `Status` payloads are free text; a 40-character hex payload is an
/// asset digest and gets compacted by the orchestrator. `Progress`
/// counts completed files within the current phase and restarts at each
/// phase boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    Status(String),
    TaskSize(u64),
    Progress(u64),
}

/// Callback surface an install attempt reports through. The lifetime
/// keeps borrowed closures usable as sinks.
pub type InstallEventSink<'a> = dyn Fn(InstallEvent) + Send + Sync + 'a;

/// Everything needed to start the game process for a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

/// A source of installable versions.
#[async_trait]
pub trait VersionProvider: Send + Sync {
    /// Advertised versions, newest first.
    async fn fetch_versions(&self) -> EngineResult<Vec<VersionSummary>>;

    /// Materialize `version` inside the store. Must be safe to re-run
    /// after a failed attempt; completed files are kept.
    async fn install(
        &self,
        version: &str,
        store: &ManagedStore,
        events: &InstallEventSink<'_>,
    ) -> EngineResult<()>;

    /// Command line for launching an installed version.
    async fn launch_plan(
        &self,
        version: &str,
        store: &ManagedStore,
        identity: &LaunchIdentity,
    ) -> EngineResult<LaunchPlan>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_parsing_covers_the_manifest_vocabulary() {
        assert_eq!(VersionChannel::parse("release"), VersionChannel::Release);
        assert_eq!(VersionChannel::parse("snapshot"), VersionChannel::Snapshot);
        assert_eq!(VersionChannel::parse("old_beta"), VersionChannel::OldBeta);
        assert_eq!(VersionChannel::parse("old_alpha"), VersionChannel::OldAlpha);
        assert_eq!(VersionChannel::parse("april_fools"), VersionChannel::Unknown);
    }

    #[test]
    fn only_release_is_a_release() {
        assert!(VersionChannel::Release.is_release());
        assert!(!VersionChannel::Snapshot.is_release());
        assert!(!VersionChannel::Unknown.is_release());
    }
}
