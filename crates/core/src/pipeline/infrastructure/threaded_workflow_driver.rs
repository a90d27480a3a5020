use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::capture::domain::camera_permission::CameraPermission;
use crate::capture::domain::camera_session::CameraSession;
use crate::pipeline::capture_workflow::{CaptureWorkflow, Effect, WorkflowMessage};
use crate::pipeline::extract_subject_use_case::SubjectExtractor;
use crate::pipeline::workflow_presenter::WorkflowPresenter;
use crate::shared::orientation;
use crate::storage::domain::cutout_file_store::CutoutFileStore;
use crate::storage::domain::record_store::RecordStore;

/// Everything a capture workflow talks to besides its presenter.
pub struct WorkflowServices {
    pub camera: Arc<dyn CameraSession>,
    pub permission: Arc<dyn CameraPermission>,
    pub extractor: Arc<SubjectExtractor>,
    pub files: Arc<dyn CutoutFileStore>,
    pub records: Box<dyn RecordStore>,
}

/// Runs a [`CaptureWorkflow`] with background work on worker threads.
///
/// Layout: `front end / workers → inbox → control thread [update → effects]`
///
/// The control thread is whichever thread calls `dispatch`, `pump` or
/// `run_until_closed`. Only it touches the workflow, the record store and
/// the presenter. Blocking work (permission request, camera configuration,
/// capture, extraction, file writes) runs on spawned threads that post a
/// completion message back into the inbox. Record inserts run inline and
/// post their outcome the same way.
pub struct ThreadedWorkflowDriver {
    workflow: CaptureWorkflow,
    services: WorkflowServices,
    presenter: Box<dyn WorkflowPresenter>,
    inbox_tx: Sender<WorkflowMessage>,
    inbox_rx: Receiver<WorkflowMessage>,
    closed: bool,
}

impl ThreadedWorkflowDriver {
    pub fn new(services: WorkflowServices, presenter: Box<dyn WorkflowPresenter>) -> Self {
        let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
        Self {
            workflow: CaptureWorkflow::new(),
            services,
            presenter,
            inbox_tx,
            inbox_rx,
            closed: false,
        }
    }

    /// Handle for front ends to post user actions.
    pub fn sender(&self) -> Sender<WorkflowMessage> {
        self.inbox_tx.clone()
    }

    pub fn workflow(&self) -> &CaptureWorkflow {
        &self.workflow
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Presents the workflow: reports the current camera authorization.
    pub fn start(&mut self) {
        let status = self.services.permission.status();
        self.dispatch(WorkflowMessage::Appeared(status));
    }

    /// Handles one message on the calling thread.
    pub fn dispatch(&mut self, message: WorkflowMessage) {
        if self.closed {
            return;
        }
        let effects = self.workflow.update(message);
        self.presenter.present(&self.workflow);
        for effect in effects {
            self.apply(effect);
        }
    }

    /// Handles every message already waiting. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while !self.closed {
            let Ok(message) = self.inbox_rx.try_recv() else {
                break;
            };
            self.dispatch(message);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for one message and handles it.
    /// Returns `false` when nothing arrived.
    pub fn pump_timeout(&mut self, timeout: Duration) -> bool {
        if self.closed {
            return false;
        }
        match self.inbox_rx.recv_timeout(timeout) {
            Ok(message) => {
                self.dispatch(message);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Blocks handling messages until the workflow closes.
    pub fn run_until_closed(&mut self) {
        while !self.closed {
            // The driver holds a sender itself, so the inbox never disconnects.
            match self.inbox_rx.recv() {
                Ok(message) => self.dispatch(message),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::RequestPermission => {
                let permission = self.services.permission.clone();
                self.spawn(move || WorkflowMessage::PermissionResolved {
                    granted: permission.request(),
                });
            }
            Effect::ConfigureCamera => {
                let camera = self.services.camera.clone();
                self.spawn(move || WorkflowMessage::CameraConfigured(camera.configure()));
            }
            Effect::StartCamera => self.services.camera.start(),
            Effect::StopCamera => self.services.camera.stop(),
            Effect::CapturePhoto { token } => {
                let camera = self.services.camera.clone();
                self.spawn(move || WorkflowMessage::PhotoCaptured {
                    token,
                    result: camera.capture_one_photo().map(orientation::normalize),
                });
            }
            Effect::Extract { token, frame } => {
                let extractor = self.services.extractor.clone();
                self.spawn(move || WorkflowMessage::ExtractionFinished {
                    token,
                    result: extractor.extract_largest_subject(&frame),
                });
            }
            Effect::Persist {
                token,
                cutout,
                file_name,
            } => {
                let files = self.services.files.clone();
                self.spawn(move || WorkflowMessage::SaveFinished {
                    token,
                    result: files.save(&cutout, &file_name).map(|path| {
                        log::debug!("Wrote {}", path.display());
                    }),
                });
            }
            Effect::InsertRecord { token, record } => {
                let file_name = record.file_name.clone();
                let result = self.services.records.insert(record);
                if let Err(e) = &result {
                    log::error!("Cutout {file_name} was written but not recorded: {e}");
                }
                // The receiver lives in `self`, so this cannot fail.
                let _ = self
                    .inbox_tx
                    .send(WorkflowMessage::RecordInserted { token, result });
            }
            Effect::DiscardFile { file_name } => {
                if let Err(e) = self.services.files.delete(&file_name) {
                    log::warn!("Could not remove unrecorded cutout {file_name}: {e}");
                }
            }
            Effect::ShowAlert(alert) => self.presenter.alert(&alert),
            Effect::Close => {
                self.closed = true;
                self.presenter.closed();
            }
        }
    }

    fn spawn<F>(&self, work: F)
    where
        F: FnOnce() -> WorkflowMessage + Send + 'static,
    {
        let inbox = self.inbox_tx.clone();
        std::thread::spawn(move || {
            // The driver may be gone by the time the work finishes.
            let _ = inbox.send(work());
        });
    }
}
