// ─── Concurrent Verified Downloads ───

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::fs;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

const DEFAULT_CONCURRENCY: usize = 8;

/// One file to fetch, with an optional SHA-1 to verify against.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
}

/// Downloads files concurrently, verifying digests where provided.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    concurrency: usize,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch one entry to its destination, creating parent directories
    /// and verifying the digest before anything is written.
    pub async fn download_file(&self, entry: &DownloadEntry) -> EngineResult<()> {
        if let Some(parent) = entry.dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let response = self.client.get(&entry.url).send().await?;
        if !response.status().is_success() {
            return Err(EngineError::DownloadFailed {
                url: entry.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await?;

        if let Some(expected) = &entry.sha1 {
            let actual = hex::encode(Sha1::digest(&bytes));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(EngineError::Sha1Mismatch {
                    path: entry.dest.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        fs::write(&entry.dest, &bytes)
            .await
            .map_err(|e| EngineError::Io {
                path: entry.dest.clone(),
                source: e,
            })?;

        debug!("Downloaded {} -> {:?}", entry.url, entry.dest);
        Ok(())
    }

    /// Fetch a batch with bounded concurrency, reporting the running
    /// count of completed files through `on_file_done`. Returns the
    /// failures; an empty result means the whole batch landed.
    pub async fn download_batch(
        &self,
        entries: Vec<DownloadEntry>,
        on_file_done: impl Fn(u64) + Send + Sync,
    ) -> Vec<(DownloadEntry, EngineError)> {
        let completed = AtomicU64::new(0);
        let results = stream::iter(entries.into_iter().map(|entry| {
            let completed = &completed;
            let on_file_done = &on_file_done;
            async move {
                let result = self.download_file(&entry).await;
                if result.is_ok() {
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    on_file_done(done);
                }
                (entry, result)
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect::<Vec<_>>()
        .await;

        results
            .into_iter()
            .filter_map(|(entry, result)| result.err().map(|e| (entry, e)))
            .collect()
    }
}

/// Check an on-disk file against an expected SHA-1.
pub async fn validate_sha1(path: &Path, expected: &str) -> bool {
    match fs::read(path).await {
        Ok(bytes) => {
            let actual = hex::encode(Sha1::digest(&bytes));
            actual.eq_ignore_ascii_case(expected)
        }
        Err(_) => false,
    }
}
