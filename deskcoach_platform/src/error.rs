use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("camera open failed: {0}")]
    CameraOpen(String),
    #[error("camera read failed: {0}")]
    CameraRead(String),
    #[error("notification delivery failed: {0}")]
    Notify(String),
    #[error("dnd query failed: {0}")]
    Dnd(String),
}
