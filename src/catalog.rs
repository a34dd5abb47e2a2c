// ─── Version Catalog ───

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::provider::VersionProvider;

/// Versions offered when no fetch has ever succeeded and no cache exists.
const FALLBACK_VERSIONS: [&str; 3] = ["1.21.1", "1.20.1", "1.16.5"];

struct CacheEntry {
    versions: Vec<String>,
    fetched_at: Instant,
}

/// TTL-cached list of installable release versions.
///
/// `get_all_versions` always yields a non-empty list: fresh cache, fresh
/// fetch, stale cache, or the static fallback, in that order. The lock
/// spans the refresh so concurrent callers trigger one fetch.
pub struct VersionCatalog {
    provider: Arc<dyn VersionProvider>,
    ttl: Duration,
    limit: usize,
    cache: Mutex<Option<CacheEntry>>,
}

impl VersionCatalog {
    pub fn new(provider: Arc<dyn VersionProvider>, ttl: Duration, limit: usize) -> Self {
        Self {
            provider,
            ttl,
            limit,
            cache: Mutex::new(None),
        }
    }

    pub async fn get_all_versions(&self) -> Vec<String> {
        let mut cache = self.cache.lock().await;

        if let Some(entry) = cache.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!(
                    "Catalog served from cache ({} versions)",
                    entry.versions.len()
                );
                return entry.versions.clone();
            }
        }

        match self.provider.fetch_versions().await {
            Ok(summaries) => {
                let versions: Vec<String> = summaries
                    .into_iter()
                    .filter(|summary| summary.channel.is_release())
                    .take(self.limit)
                    .map(|summary| summary.id)
                    .collect();

                if versions.is_empty() {
                    warn!("Version fetch returned no releases");
                    return degraded(cache.as_ref());
                }

                *cache = Some(CacheEntry {
                    versions: versions.clone(),
                    fetched_at: Instant::now(),
                });
                versions
            }
            Err(e) => {
                warn!("Version fetch failed: {}", e);
                degraded(cache.as_ref())
            }
        }
    }
}

fn degraded(cache: Option<&CacheEntry>) -> Vec<String> {
    match cache {
        Some(entry) if !entry.versions.is_empty() => entry.versions.clone(),
        _ => FALLBACK_VERSIONS.iter().map(|v| v.to_string()).collect(),
    }
}
