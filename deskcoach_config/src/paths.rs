//! Storage-root resolution and the fixed layout of persistent files (§6).
use std::path::{Path, PathBuf};

/// Default storage directory name, resolved relative to the OS data-home
/// unless overridden by `STORAGE_ROOT`.
const DEFAULT_DIR_NAME: &str = "deskcoach";

/// Resolves the configurable storage root and the fixed set of file paths
/// that live under it.
#[derive(Debug, Clone)]
pub struct StorageRoot(PathBuf);

impl StorageRoot {
    /// Resolve from the `STORAGE_ROOT` environment variable, falling back to
    /// `$XDG_DATA_HOME/deskcoach` (or `~/.local/share/deskcoach`).
    pub fn from_env() -> Self {
        match std::env::var_os("STORAGE_ROOT") {
            Some(p) if !p.is_empty() => Self(PathBuf::from(p)),
            _ => Self(default_data_dir()),
        }
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self(root.into())
    }

    pub fn root(&self) -> &Path {
        &self.0
    }

    /// Create the storage root directory if it does not already exist.
    pub fn ensure_exists(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.0)
    }

    pub fn calibration_json(&self) -> PathBuf {
        self.0.join("calibration.json")
    }

    pub fn config_json(&self) -> PathBuf {
        self.0.join("config.json")
    }

    pub fn events_jsonl(&self) -> PathBuf {
        self.0.join("events.jsonl")
    }

    pub fn status_json(&self) -> PathBuf {
        self.0.join("status.json")
    }

    pub fn calibration_status_json(&self) -> PathBuf {
        self.0.join("calibration_status.json")
    }

    pub fn daemon_pid(&self) -> PathBuf {
        self.0.join("daemon.pid")
    }

    pub fn daemon_meta_json(&self) -> PathBuf {
        self.0.join("daemon.meta.json")
    }

    pub fn calibration_lock(&self) -> PathBuf {
        self.0.join("calibration.lock")
    }

    pub fn daemon_log(&self) -> PathBuf {
        self.0.join("daemon.log")
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join(DEFAULT_DIR_NAME);
        }
    }
    if let Some(home) = std::env::var_os("HOME") {
        if !home.is_empty() {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join(DEFAULT_DIR_NAME);
        }
    }
    PathBuf::from(DEFAULT_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        // SAFETY: test-local env mutation, not shared across threads in this crate's test binary.
        unsafe {
            std::env::set_var("STORAGE_ROOT", "/tmp/deskcoach-test-root");
        }
        let root = StorageRoot::from_env();
        assert_eq!(root.root(), Path::new("/tmp/deskcoach-test-root"));
        unsafe {
            std::env::remove_var("STORAGE_ROOT");
        }
    }

    #[test]
    fn file_layout_matches_spec() {
        let root = StorageRoot::new("/srv/deskcoach");
        assert_eq!(root.calibration_json(), Path::new("/srv/deskcoach/calibration.json"));
        assert_eq!(root.config_json(), Path::new("/srv/deskcoach/config.json"));
        assert_eq!(root.events_jsonl(), Path::new("/srv/deskcoach/events.jsonl"));
        assert_eq!(root.status_json(), Path::new("/srv/deskcoach/status.json"));
        assert_eq!(
            root.calibration_status_json(),
            Path::new("/srv/deskcoach/calibration_status.json")
        );
        assert_eq!(root.daemon_pid(), Path::new("/srv/deskcoach/daemon.pid"));
        assert_eq!(
            root.daemon_meta_json(),
            Path::new("/srv/deskcoach/daemon.meta.json")
        );
        assert_eq!(
            root.calibration_lock(),
            Path::new("/srv/deskcoach/calibration.lock")
        );
        assert_eq!(root.daemon_log(), Path::new("/srv/deskcoach/daemon.log"));
    }
}
