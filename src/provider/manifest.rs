// ─── Version Manifest ───

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::EngineResult;

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Catalog refreshes run on a short leash so a slow CDN degrades to the
/// cache or fallback quickly.
pub const MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(rename = "releaseTime")]
    pub release_time: String,
    pub sha1: Option<String>,
}

impl VersionManifest {
    pub async fn fetch(client: &Client) -> EngineResult<Self> {
        let manifest = client
            .get(VERSION_MANIFEST_URL)
            .timeout(MANIFEST_TIMEOUT)
            .send()
            .await?
            .json::<VersionManifest>()
            .await?;
        Ok(manifest)
    }

    pub fn find_version(&self, id: &str) -> Option<&VersionManifestEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}
