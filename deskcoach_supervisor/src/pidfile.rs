//! Pidfile schema and atomic read/write (§4.I): `{pid, started_at, cmdline}`.
use std::path::Path;

use serde::{Deserialize, Serialize};

use deskcoach_config::write_atomic;

use crate::error::SupervisorError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidRecord {
    pub pid: u32,
    pub started_at: f64,
    pub cmdline: String,
}

impl PidRecord {
    pub fn write(&self, path: &Path) -> Result<(), SupervisorError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &bytes).map_err(SupervisorError::PidFile)
    }

    pub fn read(path: &Path) -> Result<Option<Self>, SupervisorError> {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| SupervisorError::Corrupt(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SupervisorError::PidFile(e)),
        }
    }

    pub fn remove(path: &Path) -> Result<(), SupervisorError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SupervisorError::PidFile(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.pid");
        let record = PidRecord { pid: 4242, started_at: 100.0, cmdline: "deskcoach".into() };
        record.write(&path).unwrap();
        let read_back = PidRecord::read(&path).unwrap().unwrap();
        assert_eq!(read_back.pid, 4242);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PidRecord::read(&dir.path().join("daemon.pid")).unwrap().is_none());
    }

    #[test]
    fn remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        PidRecord::remove(&dir.path().join("daemon.pid")).unwrap();
    }
}
