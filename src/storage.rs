// ─── Installation Records ───

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{EngineError, EngineResult};

/// One installed-version entry: which version, who it was installed for,
/// and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    pub version: String,
    pub owner: String,
    pub installed_at: DateTime<Utc>,
}

/// External record keeper consulted after installs and imports.
///
/// `add_installation` resolves to `Ok(false)` for empty inputs and
/// `Ok(true)` both when the pair was appended and when it already
/// existed, so repeated registration is harmless.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn add_installation(&self, version: &str, owner: &str) -> EngineResult<bool>;
    async fn get_installations(&self) -> Vec<InstallationRecord>;
}

/// JSON-file backed [`InstallationStore`].
pub struct JsonInstallationStore {
    path: PathBuf,
    records: Mutex<Vec<InstallationRecord>>,
}

impl JsonInstallationStore {
    /// Open the store at `path`, loading any existing records. A missing
    /// or corrupt file reads as empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Corrupt records file {:?}: {}", path, e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            path,
            records: Mutex::new(records),
        }
    }

    async fn save(&self, records: &[InstallationRecord]) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let raw = serde_json::to_string_pretty(records)?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| EngineError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(())
    }

    /// Remove an exact `(version, owner)` pair. Returns whether anything
    /// was removed.
    pub async fn remove_installation(&self, version: &str, owner: &str) -> EngineResult<bool> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| !(record.version == version && record.owner == owner));
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }
}

#[async_trait]
impl InstallationStore for JsonInstallationStore {
    async fn add_installation(&self, version: &str, owner: &str) -> EngineResult<bool> {
        if version.is_empty() || owner.is_empty() {
            return Ok(false);
        }

        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|record| record.version == version && record.owner == owner)
        {
            return Ok(true);
        }

        records.push(InstallationRecord {
            version: version.to_string(),
            owner: owner.to_string(),
            installed_at: Utc::now(),
        });
        self.save(&records).await?;
        Ok(true)
    }

    async fn get_installations(&self) -> Vec<InstallationRecord> {
        self.records.lock().await.clone()
    }
}
