/// Generated artifact tracking and post-run removal
use std::path::PathBuf;

/// Tracks the binaries and temp files a build stage produced, and
/// removes them after the run unless retention was requested. Removal
/// is idempotent; a missing artifact is not an error.
#[derive(Debug, Default)]
pub struct ArtifactManager {
    artifacts: Vec<PathBuf>,
}

impl ArtifactManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, path: PathBuf) {
        if !self.artifacts.contains(&path) {
            self.artifacts.push(path);
        }
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Remove tracked artifacts. With `keep` nothing is removed; under
    /// dry-run nothing is touched, only reported.
    pub fn cleanup(&mut self, keep: bool, dry_run: bool) {
        if keep {
            log::debug!("--keep set, retaining {} artifact(s)", self.artifacts.len());
            self.artifacts.clear();
            return;
        }
        for path in self.artifacts.drain(..) {
            if dry_run {
                println!("[DRY-RUN] would delete: {}", path.display());
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("removed artifact: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("could not remove {}: {}", path.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("runbox-artifact-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_cleanup_removes_tracked_artifact() {
        let dir = scratch_dir();
        let artifact = dir.join("main");
        std::fs::write(&artifact, b"binary").unwrap();

        let mut manager = ArtifactManager::new();
        manager.track(artifact.clone());
        manager.cleanup(false, false);

        assert!(!artifact.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_keep_retains_artifact() {
        let dir = scratch_dir();
        let artifact = dir.join("main");
        std::fs::write(&artifact, b"binary").unwrap();

        let mut manager = ArtifactManager::new();
        manager.track(artifact.clone());
        manager.cleanup(true, false);

        assert!(artifact.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_artifact_is_not_an_error() {
        let mut manager = ArtifactManager::new();
        manager.track(PathBuf::from("/nonexistent/runbox-artifact"));
        manager.cleanup(false, false);
        assert!(manager.tracked().is_empty());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = scratch_dir();
        let artifact = dir.join("main");
        std::fs::write(&artifact, b"binary").unwrap();

        let mut manager = ArtifactManager::new();
        manager.track(artifact.clone());
        manager.cleanup(false, true);

        assert!(artifact.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_track_deduplicates() {
        let mut manager = ArtifactManager::new();
        manager.track(PathBuf::from("main"));
        manager.track(PathBuf::from("main"));
        assert_eq!(manager.tracked().len(), 1);
    }
}
