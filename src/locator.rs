// ─── Foreign Installation Discovery ───

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Subdirectories probed under the app-data root.
const PROBE_SUBDIRS: [&str; 3] = [".minecraft", ".tlauncher", "tlauncher"];

/// Store directory names that may nest a version tree one level down.
const NESTED_STORE_DIRS: [&str; 2] = [".minecraft", "minecraft"];

/// Name fragment identifying third-party launcher folders under app data.
const LAUNCHER_KEYWORD: &str = "tlauncher";

/// Find the `versions` tree for a candidate root: directly inside it, or
/// nested one level under a conventional store directory.
pub fn resolve_version_tree(candidate: &Path) -> Option<PathBuf> {
    let direct = candidate.join("versions");
    if direct.is_dir() {
        return Some(direct);
    }

    NESTED_STORE_DIRS
        .iter()
        .map(|nested| candidate.join(nested).join("versions"))
        .find(|dir| dir.is_dir())
}

/// Scans conventional locations for installation roots left behind by
/// other launchers. Purely read-only; every operation degrades to an
/// empty result.
#[derive(Debug, Clone)]
pub struct ForeignInstallationLocator {
    home_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl ForeignInstallationLocator {
    pub fn from_system() -> Self {
        Self {
            home_dir: dirs::home_dir(),
            data_dir: dirs::data_dir(),
        }
    }

    /// Locator with explicit roots instead of the system directories.
    pub fn with_roots(home_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        Self { home_dir, data_dir }
    }

    /// Candidate foreign roots in discovery order, deduplicated. Fixed
    /// probes qualify only if they hold a version tree; keyword-matched
    /// app-data children only need to be directories.
    pub fn locate(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        let mut probes = Vec::new();
        if let Some(data_dir) = &self.data_dir {
            for sub in PROBE_SUBDIRS {
                probes.push(data_dir.join(sub));
            }
        }
        if let Some(home_dir) = &self.home_dir {
            probes.push(home_dir.join(".minecraft"));
        }

        for probe in probes {
            if resolve_version_tree(&probe).is_some() {
                push_unique(&mut candidates, probe);
            }
        }

        if let Some(data_dir) = &self.data_dir {
            if let Ok(entries) = std::fs::read_dir(data_dir) {
                for entry in entries.flatten() {
                    let name = entry.file_name().to_string_lossy().to_lowercase();
                    let path = entry.path();
                    if name.contains(LAUNCHER_KEYWORD) && path.is_dir() {
                        push_unique(&mut candidates, path);
                    }
                }
            }
        }

        debug!("Located {} candidate foreign roots", candidates.len());
        candidates
    }

    /// Version folder names under `path`, sorted, without copying
    /// anything.
    pub fn detect_versions_in_path(&self, path: &Path) -> Vec<String> {
        let Some(versions_dir) = resolve_version_tree(path) else {
            return Vec::new();
        };

        let entries = match std::fs::read_dir(&versions_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Candidate to detected versions for every located root, omitting
    /// candidates with nothing under them.
    pub fn detect_all_in_system(&self) -> BTreeMap<PathBuf, Vec<String>> {
        let mut results = BTreeMap::new();
        for candidate in self.locate() {
            let found = self.detect_versions_in_path(&candidate);
            if !found.is_empty() {
                results.insert(candidate, found);
            }
        }
        results
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn mkdirs(path: &Path) {
        std::fs::create_dir_all(path).unwrap();
    }

    #[test]
    fn probes_qualify_only_with_a_version_tree() {
        let home = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();
        mkdirs(&home.path().join(".minecraft/versions/1.20.1"));
        mkdirs(&data.path().join(".minecraft"));

        let locator = ForeignInstallationLocator::with_roots(
            Some(home.path().to_path_buf()),
            Some(data.path().to_path_buf()),
        );

        let candidates = locator.locate();
        assert_eq!(candidates, vec![home.path().join(".minecraft")]);
    }

    #[test]
    fn keyword_children_are_included_without_a_version_tree() {
        let data = TempDir::new().unwrap();
        mkdirs(&data.path().join("TLauncherX"));
        mkdirs(&data.path().join("SomeOtherApp"));

        let locator =
            ForeignInstallationLocator::with_roots(None, Some(data.path().to_path_buf()));

        let candidates = locator.locate();
        assert_eq!(candidates, vec![data.path().join("TLauncherX")]);
    }

    #[test]
    fn probe_and_keyword_hits_deduplicate() {
        let data = TempDir::new().unwrap();
        mkdirs(&data.path().join("tlauncher/versions/1.16.5"));

        let locator =
            ForeignInstallationLocator::with_roots(None, Some(data.path().to_path_buf()));

        let candidates = locator.locate();
        assert_eq!(candidates, vec![data.path().join("tlauncher")]);
    }

    #[test]
    fn missing_roots_locate_nothing() {
        let locator = ForeignInstallationLocator::with_roots(None, None);
        assert!(locator.locate().is_empty());
    }

    #[test]
    fn version_trees_resolve_directly_or_nested() {
        let direct = TempDir::new().unwrap();
        mkdirs(&direct.path().join("versions"));
        assert_eq!(
            resolve_version_tree(direct.path()),
            Some(direct.path().join("versions"))
        );

        let nested = TempDir::new().unwrap();
        mkdirs(&nested.path().join("minecraft/versions"));
        assert_eq!(
            resolve_version_tree(nested.path()),
            Some(nested.path().join("minecraft/versions"))
        );

        let hidden = TempDir::new().unwrap();
        mkdirs(&hidden.path().join(".minecraft/versions"));
        assert_eq!(
            resolve_version_tree(hidden.path()),
            Some(hidden.path().join(".minecraft/versions"))
        );

        let bare = TempDir::new().unwrap();
        assert_eq!(resolve_version_tree(bare.path()), None);
    }

    #[test]
    fn detection_lists_sorted_versions_and_skips_files() {
        let root = TempDir::new().unwrap();
        mkdirs(&root.path().join("versions/1.20.1"));
        mkdirs(&root.path().join("versions/1.16.5"));
        std::fs::write(root.path().join("versions/readme.txt"), b"x").unwrap();

        let locator = ForeignInstallationLocator::with_roots(None, None);
        assert_eq!(
            locator.detect_versions_in_path(root.path()),
            vec!["1.16.5", "1.20.1"]
        );
        assert!(locator
            .detect_versions_in_path(&root.path().join("absent"))
            .is_empty());
    }

    #[test]
    fn system_detection_omits_empty_candidates() {
        let data = TempDir::new().unwrap();
        mkdirs(&data.path().join(".tlauncher/versions/1.8.9"));
        mkdirs(&data.path().join("tlauncher-extras"));

        let locator =
            ForeignInstallationLocator::with_roots(None, Some(data.path().to_path_buf()));

        let results = locator.detect_all_in_system();
        assert_eq!(results.len(), 1);
        assert_eq!(
            results.get(&data.path().join(".tlauncher")),
            Some(&vec!["1.8.9".to_string()])
        );
    }
}
