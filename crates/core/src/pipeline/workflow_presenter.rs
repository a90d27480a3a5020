use std::fmt;

use crate::pipeline::capture_workflow::CaptureWorkflow;
use crate::shared::error_kind::ErrorKind;

pub const CAMERA_SETUP_FAILED: &str = "Camera setup failed";
pub const CAPTURE_FAILED: &str = "Capture failed";
pub const DETECTION_FAILED: &str = "Subject detection failed";
pub const SAVE_FAILED: &str = "Save failed";

/// User-facing failure report: a fixed title per stage, the error's
/// category and its message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl Alert {
    pub fn new(title: &str, kind: ErrorKind, error: &dyn fmt::Display) -> Self {
        Self {
            title: title.to_string(),
            kind,
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Receives what the user should see while a capture workflow runs.
///
/// Decouples the workflow from its front end (terminal prompt, GUI, tests).
/// All calls arrive on the thread that drives the workflow.
pub trait WorkflowPresenter: Send {
    /// Called after every handled message with the workflow's new state.
    fn present(&mut self, workflow: &CaptureWorkflow);

    fn alert(&mut self, alert: &Alert);

    /// The workflow view should close. Default: no-op.
    fn closed(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::camera_session::CameraError;

    #[test]
    fn test_alert_uses_error_display() {
        let error = CameraError::CaptureInProgress;
        let alert = Alert::new(CAPTURE_FAILED, error.kind(), &error);
        assert_eq!(alert.title, "Capture failed");
        assert_eq!(alert.kind, ErrorKind::DeviceError);
        assert_eq!(alert.message, "A photo capture is already in progress.");
        assert_eq!(
            alert.to_string(),
            "Capture failed: A photo capture is already in progress."
        );
    }
}
