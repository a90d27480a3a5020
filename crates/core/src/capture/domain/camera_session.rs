use thiserror::Error;

use crate::shared::error_kind::ErrorKind;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("No usable camera is available: {0}")]
    DeviceUnavailable(String),
    #[error("A photo capture is already in progress.")]
    CaptureInProgress,
    #[error("The camera has not been configured.")]
    NotConfigured,
    #[error("The camera returned no photo data.")]
    PhotoDataMissing,
    #[error("The camera session has shut down.")]
    SessionClosed,
    #[error("The captured photo could not be decoded: {0}")]
    Decode(String),
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::Decode(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::DeviceError,
        }
    }
}

/// A still-photo camera whose session commands are serialized on one queue.
///
/// `start` and `stop` are fire-and-forget and idempotent: they do nothing
/// before configuration or when the session is already in the requested
/// state. `configure` and `capture_one_photo` block the caller until the
/// session answers, so callers run them off the interactive thread.
pub trait CameraSession: Send + Sync {
    /// Prepares the session. Once it has succeeded, later calls return
    /// `Ok` without doing any work.
    fn configure(&self) -> Result<(), CameraError>;

    fn start(&self);

    fn stop(&self);

    /// Takes one photo. Fails with [`CameraError::CaptureInProgress`] while
    /// another capture is pending.
    fn capture_one_photo(&self) -> Result<Frame, CameraError>;

    fn is_running(&self) -> bool;
}
