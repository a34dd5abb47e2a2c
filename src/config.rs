// ─── Engine Configuration ───

use std::path::PathBuf;
use std::time::Duration;

/// Tunable knobs for one engine instance. Values are fixed at
/// construction; nothing here is persisted.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root of the managed installation tree.
    pub managed_root: PathBuf,
    /// Attempts per install request, first try included.
    pub max_install_attempts: u32,
    /// Base wait for the exponential backoff between attempts.
    pub backoff_base: Duration,
    /// How long a fetched catalog stays fresh.
    pub catalog_ttl: Duration,
    /// Maximum number of release versions the catalog returns.
    pub catalog_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            managed_root: default_managed_root(),
            max_install_attempts: 5,
            backoff_base: Duration::from_secs(2),
            catalog_ttl: Duration::from_secs(3600),
            catalog_limit: 15,
        }
    }
}

impl EngineConfig {
    /// Config rooted at `managed_root` with the standard knobs.
    pub fn with_root(managed_root: impl Into<PathBuf>) -> Self {
        Self {
            managed_root: managed_root.into(),
            ..Self::default()
        }
    }
}

fn default_managed_root() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("craftvault")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_knobs() {
        let config = EngineConfig::default();
        assert_eq!(config.max_install_attempts, 5);
        assert_eq!(config.backoff_base, Duration::from_secs(2));
        assert_eq!(config.catalog_ttl, Duration::from_secs(3600));
        assert_eq!(config.catalog_limit, 15);
    }

    #[test]
    fn with_root_overrides_only_the_root() {
        let config = EngineConfig::with_root("/tmp/vault");
        assert_eq!(config.managed_root, PathBuf::from("/tmp/vault"));
        assert_eq!(config.max_install_attempts, 5);
    }
}
