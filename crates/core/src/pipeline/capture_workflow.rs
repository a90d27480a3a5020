/// Interactive capture lifecycle as a pure state machine.
///
/// `update` consumes one message and returns the effects the driver must
/// carry out. Every asynchronous effect is tagged with the capture token that
/// was current when it was issued; a completion whose token is no longer
/// current is dropped without touching state. Retake, exit and a new shutter
/// press each mint a fresh token before anything else happens.
///
/// Saving is two steps: the file write runs off-thread, then the record
/// insert reports back. Only a recorded cutout dismisses the view; a failed
/// insert discards the written file and returns to review.
use crate::capture::domain::camera_permission::PermissionStatus;
use crate::capture::domain::camera_session::CameraError;
use crate::pipeline::capture_token::{CaptureToken, CaptureTokenSource};
use crate::pipeline::extract_subject_use_case::{CutoutPair, ExtractionError};
use crate::pipeline::workflow_presenter::{
    Alert, CAMERA_SETUP_FAILED, CAPTURE_FAILED, DETECTION_FAILED, SAVE_FAILED,
};
use crate::shared::frame::Frame;
use crate::storage::domain::cutout_file_store::StoreError;
use crate::storage::domain::cutout_record::{unique_file_name, CutoutRecord};

#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowState {
    AwaitingPermission,
    /// Sticky for the rest of the session.
    PermissionDenied,
    Previewing,
    Capturing {
        token: CaptureToken,
    },
    Extracting {
        token: CaptureToken,
    },
    Reviewing {
        token: CaptureToken,
        cutouts: CutoutPair,
    },
    Saving {
        token: CaptureToken,
        cutouts: CutoutPair,
        file_name: String,
    },
    Dismissed,
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::AwaitingPermission => "awaiting permission",
            WorkflowState::PermissionDenied => "permission denied",
            WorkflowState::Previewing => "previewing",
            WorkflowState::Capturing { .. } => "capturing",
            WorkflowState::Extracting { .. } => "extracting",
            WorkflowState::Reviewing { .. } => "reviewing",
            WorkflowState::Saving { .. } => "saving",
            WorkflowState::Dismissed => "dismissed",
        }
    }

    /// Cutouts on screen, if any.
    pub fn cutouts(&self) -> Option<&CutoutPair> {
        match self {
            WorkflowState::Reviewing { cutouts, .. } | WorkflowState::Saving { cutouts, .. } => {
                Some(cutouts)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum WorkflowMessage {
    /// The capture view became visible; carries the current authorization.
    Appeared(PermissionStatus),
    PermissionResolved {
        granted: bool,
    },
    CameraConfigured(Result<(), CameraError>),
    ShutterPressed,
    PhotoCaptured {
        token: CaptureToken,
        result: Result<Frame, CameraError>,
    },
    ExtractionFinished {
        token: CaptureToken,
        result: Result<CutoutPair, ExtractionError>,
    },
    RetakePressed,
    SavePressed,
    SaveFinished {
        token: CaptureToken,
        result: Result<(), StoreError>,
    },
    RecordInserted {
        token: CaptureToken,
        result: Result<(), StoreError>,
    },
    ExitRequested,
}

#[derive(Debug, PartialEq)]
pub enum Effect {
    RequestPermission,
    ConfigureCamera,
    StartCamera,
    StopCamera,
    CapturePhoto {
        token: CaptureToken,
    },
    Extract {
        token: CaptureToken,
        frame: Frame,
    },
    Persist {
        token: CaptureToken,
        cutout: Frame,
        file_name: String,
    },
    InsertRecord {
        token: CaptureToken,
        record: CutoutRecord,
    },
    /// Removes a written file whose record could not be inserted.
    DiscardFile {
        file_name: String,
    },
    ShowAlert(Alert),
    Close,
}

#[derive(Debug)]
pub struct CaptureWorkflow {
    state: WorkflowState,
    camera_ready: bool,
    current: Option<CaptureToken>,
    tokens: CaptureTokenSource,
}

impl Default for CaptureWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureWorkflow {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::AwaitingPermission,
            camera_ready: false,
            current: None,
            tokens: CaptureTokenSource::new(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// True once the camera is configured; the shutter is disabled until then.
    pub fn camera_ready(&self) -> bool {
        self.camera_ready
    }

    pub fn current_token(&self) -> Option<CaptureToken> {
        self.current
    }

    pub fn update(&mut self, message: WorkflowMessage) -> Vec<Effect> {
        if self.state == WorkflowState::Dismissed {
            log::debug!("Ignoring {message:?} after dismissal");
            return Vec::new();
        }

        match message {
            WorkflowMessage::Appeared(status) => self.on_appeared(status),
            WorkflowMessage::PermissionResolved { granted } => self.on_permission(granted),
            WorkflowMessage::CameraConfigured(result) => self.on_configured(result),
            WorkflowMessage::ShutterPressed => self.on_shutter(),
            WorkflowMessage::PhotoCaptured { token, result } => self.on_photo(token, result),
            WorkflowMessage::ExtractionFinished { token, result } => {
                self.on_extraction(token, result)
            }
            WorkflowMessage::RetakePressed => self.on_retake(),
            WorkflowMessage::SavePressed => self.on_save(),
            WorkflowMessage::SaveFinished { token, result } => self.on_saved(token, result),
            WorkflowMessage::RecordInserted { token, result } => self.on_recorded(token, result),
            WorkflowMessage::ExitRequested => self.on_exit(),
        }
    }

    // ── Permission and camera setup ──────────────────────────────────────

    fn on_appeared(&mut self, status: PermissionStatus) -> Vec<Effect> {
        if self.state != WorkflowState::AwaitingPermission {
            return Vec::new();
        }
        match status {
            PermissionStatus::Authorized => self.on_permission(true),
            PermissionStatus::Denied => self.on_permission(false),
            PermissionStatus::NotDetermined => vec![Effect::RequestPermission],
        }
    }

    fn on_permission(&mut self, granted: bool) -> Vec<Effect> {
        if self.state != WorkflowState::AwaitingPermission {
            return Vec::new();
        }
        if granted {
            self.state = WorkflowState::Previewing;
            vec![Effect::ConfigureCamera]
        } else {
            self.state = WorkflowState::PermissionDenied;
            Vec::new()
        }
    }

    fn on_configured(&mut self, result: Result<(), CameraError>) -> Vec<Effect> {
        match result {
            Ok(()) => {
                self.camera_ready = true;
                if self.state == WorkflowState::Previewing {
                    vec![Effect::StartCamera]
                } else {
                    Vec::new()
                }
            }
            Err(e) => {
                self.camera_ready = false;
                vec![Effect::ShowAlert(Alert::new(CAMERA_SETUP_FAILED, e.kind(), &e))]
            }
        }
    }

    // ── Capture and extraction ───────────────────────────────────────────

    fn on_shutter(&mut self) -> Vec<Effect> {
        if self.state != WorkflowState::Previewing || !self.camera_ready {
            return Vec::new();
        }
        let token = self.mint();
        self.state = WorkflowState::Capturing { token };
        vec![Effect::CapturePhoto { token }]
    }

    fn on_photo(&mut self, token: CaptureToken, result: Result<Frame, CameraError>) -> Vec<Effect> {
        if !self.is_current(token) || !matches!(self.state, WorkflowState::Capturing { .. }) {
            log::debug!("Dropping stale photo for {token}");
            return Vec::new();
        }
        match result {
            Ok(frame) => {
                self.state = WorkflowState::Extracting { token };
                vec![Effect::StopCamera, Effect::Extract { token, frame }]
            }
            Err(e) => {
                self.state = WorkflowState::Previewing;
                vec![Effect::ShowAlert(Alert::new(CAPTURE_FAILED, e.kind(), &e))]
            }
        }
    }

    fn on_extraction(
        &mut self,
        token: CaptureToken,
        result: Result<CutoutPair, ExtractionError>,
    ) -> Vec<Effect> {
        if !self.is_current(token) || !matches!(self.state, WorkflowState::Extracting { .. }) {
            log::debug!("Dropping stale extraction result for {token}");
            return Vec::new();
        }
        match result {
            Ok(cutouts) => {
                self.state = WorkflowState::Reviewing { token, cutouts };
                Vec::new()
            }
            Err(e) => {
                self.state = WorkflowState::Previewing;
                let mut effects = self.resume_camera();
                effects.push(Effect::ShowAlert(Alert::new(DETECTION_FAILED, e.kind(), &e)));
                effects
            }
        }
    }

    // ── Review ───────────────────────────────────────────────────────────

    fn on_retake(&mut self) -> Vec<Effect> {
        if !matches!(
            self.state,
            WorkflowState::Extracting { .. } | WorkflowState::Reviewing { .. }
        ) {
            return Vec::new();
        }
        self.mint();
        self.state = WorkflowState::Previewing;
        self.resume_camera()
    }

    fn on_save(&mut self) -> Vec<Effect> {
        let WorkflowState::Reviewing { token, cutouts } = &self.state else {
            return Vec::new();
        };
        let (token, cutouts) = (*token, cutouts.clone());
        let file_name = unique_file_name();
        let effect = Effect::Persist {
            token,
            cutout: cutouts.cropped.image.clone(),
            file_name: file_name.clone(),
        };
        self.state = WorkflowState::Saving {
            token,
            cutouts,
            file_name,
        };
        vec![effect]
    }

    fn on_saved(&mut self, token: CaptureToken, result: Result<(), StoreError>) -> Vec<Effect> {
        let Some(file_name) = self.saving_file_name(token) else {
            log::debug!("Dropping stale save result for {token}");
            return Vec::new();
        };
        match result {
            Ok(()) => vec![Effect::InsertRecord {
                token,
                record: CutoutRecord::new(file_name),
            }],
            Err(e) => self.back_to_review(token, e),
        }
    }

    fn on_recorded(&mut self, token: CaptureToken, result: Result<(), StoreError>) -> Vec<Effect> {
        let Some(file_name) = self.saving_file_name(token) else {
            log::debug!("Dropping stale record result for {token}");
            return Vec::new();
        };
        match result {
            Ok(()) => {
                log::info!("Cutout {file_name} saved");
                self.state = WorkflowState::Dismissed;
                vec![Effect::Close]
            }
            Err(e) => {
                let mut effects = vec![Effect::DiscardFile { file_name }];
                effects.extend(self.back_to_review(token, e));
                effects
            }
        }
    }

    /// File name of the save in flight for `token`, if that save is current.
    fn saving_file_name(&self, token: CaptureToken) -> Option<String> {
        match &self.state {
            WorkflowState::Saving {
                token: saving,
                file_name,
                ..
            } if *saving == token && self.is_current(token) => Some(file_name.clone()),
            _ => None,
        }
    }

    fn back_to_review(&mut self, token: CaptureToken, error: StoreError) -> Vec<Effect> {
        if let WorkflowState::Saving { cutouts, .. } = &self.state {
            let cutouts = cutouts.clone();
            self.state = WorkflowState::Reviewing { token, cutouts };
        }
        vec![Effect::ShowAlert(Alert::new(SAVE_FAILED, error.kind(), &error))]
    }

    fn on_exit(&mut self) -> Vec<Effect> {
        self.mint();
        self.state = WorkflowState::Dismissed;
        vec![Effect::StopCamera, Effect::Close]
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn mint(&mut self) -> CaptureToken {
        let token = self.tokens.mint();
        self.current = Some(token);
        token
    }

    fn is_current(&self, token: CaptureToken) -> bool {
        self.current == Some(token)
    }

    fn resume_camera(&self) -> Vec<Effect> {
        if self.camera_ready {
            vec![Effect::StartCamera]
        } else {
            Vec::new()
        }
    }
}
