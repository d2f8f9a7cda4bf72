//! Companion metadata file (`daemon.meta.json`) recording the arguments the
//! daemon was last started with, so `restart` can reuse them (§4.I).
use std::path::Path;

use serde::{Deserialize, Serialize};

use deskcoach_config::write_atomic;

use crate::error::SupervisorError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonMeta {
    pub args: Vec<String>,
}

impl DaemonMeta {
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
}
