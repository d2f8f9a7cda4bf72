use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to spawn daemon process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("pidfile read/write failed: {0}")]
    PidFile(#[source] std::io::Error),
    #[error("pidfile contents corrupt: {0}")]
    Corrupt(String),
    #[error("process did not exit within the graceful shutdown window")]
    GracefulTimeout,
    #[error("calibration is already running (pid {0})")]
    CalibrationAlreadyRunning(u32),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
