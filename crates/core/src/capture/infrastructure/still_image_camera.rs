/// Camera adapter that "photographs" image files.
///
/// The source is either a single image (every capture re-reads it) or a
/// directory (captures cycle through its images in sorted order). A dedicated
/// session thread owns all session state; every public call becomes a command
/// on its queue, so start/stop/capture never race each other. Decoding runs
/// on a short-lived worker whose result is routed back through the same queue.
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::camera_session::{CameraError, CameraSession};
use crate::capture::infrastructure::image_file_reader::ImageFileReader;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

type PhotoDecoder = Arc<dyn Fn(&Path) -> Result<Frame, CameraError> + Send + Sync>;

enum SessionCommand {
    Configure(Sender<Result<(), CameraError>>),
    Start,
    Stop,
    Capture(Sender<Result<Frame, CameraError>>),
    PhotoProcessed(Result<Frame, CameraError>),
    Shutdown,
}

pub struct StillImageCamera {
    commands: Sender<SessionCommand>,
    running: Arc<AtomicBool>,
    session_thread: Mutex<Option<JoinHandle<()>>>,
}

impl StillImageCamera {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        let decoder: PhotoDecoder = Arc::new(|path: &Path| {
            ImageFileReader::read(path).map_err(|e| CameraError::Decode(e.to_string()))
        });
        Self::with_decoder(source.into(), decoder)
    }

    fn with_decoder(source: PathBuf, decoder: PhotoDecoder) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let running = Arc::new(AtomicBool::new(false));
        let session = Session {
            source,
            photos: None,
            next_photo: 0,
            running: running.clone(),
            pending_capture: None,
            commands: tx.clone(),
            decoder,
        };
        let handle = thread::spawn(move || session.run(rx));

        Self {
            commands: tx,
            running,
            session_thread: Mutex::new(Some(handle)),
        }
    }

    fn send(&self, command: SessionCommand) -> Result<(), CameraError> {
        self.commands
            .send(command)
            .map_err(|_| CameraError::SessionClosed)
    }
}

impl CameraSession for StillImageCamera {
    fn configure(&self) -> Result<(), CameraError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(SessionCommand::Configure(reply_tx))?;
        reply_rx.recv().map_err(|_| CameraError::SessionClosed)?
    }

    fn start(&self) {
        let _ = self.send(SessionCommand::Start);
    }

    fn stop(&self) {
        let _ = self.send(SessionCommand::Stop);
    }

    fn capture_one_photo(&self) -> Result<Frame, CameraError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send(SessionCommand::Capture(reply_tx))?;
        reply_rx.recv().map_err(|_| CameraError::SessionClosed)?
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for StillImageCamera {
    fn drop(&mut self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
        if let Ok(mut slot) = self.session_thread.lock() {
            if let Some(handle) = slot.take() {
                let _ = handle.join();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session thread
// ---------------------------------------------------------------------------

struct Session {
    source: PathBuf,
    /// Photos found by a successful configure; `None` until then.
    photos: Option<Vec<PathBuf>>,
    next_photo: usize,
    running: Arc<AtomicBool>,
    pending_capture: Option<Sender<Result<Frame, CameraError>>>,
    commands: Sender<SessionCommand>,
    decoder: PhotoDecoder,
}

impl Session {
    fn run(mut self, rx: Receiver<SessionCommand>) {
        for command in rx.iter() {
            match command {
                SessionCommand::Configure(reply) => {
                    let _ = reply.send(self.configure());
                }
                SessionCommand::Start => self.set_running(true),
                SessionCommand::Stop => self.set_running(false),
                SessionCommand::Capture(reply) => self.capture(reply),
                SessionCommand::PhotoProcessed(result) => {
                    if let Some(reply) = self.pending_capture.take() {
                        let _ = reply.send(result);
                    }
                }
                SessionCommand::Shutdown => break,
            }
        }
        self.running.store(false, Ordering::Release);
        log::debug!("Camera session for {} closed", self.source.display());
    }

    fn configure(&mut self) -> Result<(), CameraError> {
        if self.photos.is_some() {
            return Ok(());
        }
        let photos = list_photos(&self.source)?;
        log::info!(
            "Camera configured: {} photo(s) from {}",
            photos.len(),
            self.source.display()
        );
        self.photos = Some(photos);
        Ok(())
    }

    fn set_running(&mut self, running: bool) {
        if self.photos.is_none() || self.running.load(Ordering::Acquire) == running {
            return;
        }
        self.running.store(running, Ordering::Release);
        log::debug!("Camera {}", if running { "started" } else { "stopped" });
    }

    fn capture(&mut self, reply: Sender<Result<Frame, CameraError>>) {
        if self.pending_capture.is_some() {
            let _ = reply.send(Err(CameraError::CaptureInProgress));
            return;
        }
        let Some(photos) = self.photos.as_ref() else {
            let _ = reply.send(Err(CameraError::NotConfigured));
            return;
        };
        if !self.running.load(Ordering::Acquire) {
            let _ = reply.send(Err(CameraError::DeviceUnavailable(
                "the camera is not running".into(),
            )));
            return;
        }
        let Some(path) = photos.get(self.next_photo % photos.len().max(1)).cloned() else {
            let _ = reply.send(Err(CameraError::PhotoDataMissing));
            return;
        };
        self.next_photo += 1;
        self.pending_capture = Some(reply);

        let decoder = self.decoder.clone();
        let commands = self.commands.clone();
        thread::spawn(move || {
            // A crashed decoder must still answer, or the capture stays pending forever.
            let result = panic::catch_unwind(AssertUnwindSafe(|| decoder(&path)))
                .unwrap_or_else(|_| {
                    log::error!("Decoder panicked on {}", path.display());
                    Err(CameraError::Decode(format!(
                        "decoder crashed on {}",
                        path.display()
                    )))
                });
            let _ = commands.send(SessionCommand::PhotoProcessed(result));
        });
    }
}

fn list_photos(source: &Path) -> Result<Vec<PathBuf>, CameraError> {
    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.is_dir() {
        return Err(CameraError::DeviceUnavailable(format!(
            "{} does not exist",
            source.display()
        )));
    }

    let entries = std::fs::read_dir(source)
        .map_err(|e| CameraError::DeviceUnavailable(format!("{}: {e}", source.display())))?;
    let mut photos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_image(path))
        .collect();
    photos.sort();

    if photos.is_empty() {
        return Err(CameraError::DeviceUnavailable(format!(
            "no images in {}",
            source.display()
        )));
    }
    Ok(photos)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_png(path: &Path, value: u8) {
        image::RgbImage::from_raw(1, 1, vec![value; 3])
            .unwrap()
            .save(path)
            .unwrap();
    }

    fn ready_camera(source: &Path) -> StillImageCamera {
        let camera = StillImageCamera::new(source);
        camera.configure().unwrap();
        camera.start();
        camera
    }

    #[test]
    fn test_missing_source_is_unavailable() {
        let camera = StillImageCamera::new("/nonexistent/photos");
        assert!(matches!(
            camera.configure(),
            Err(CameraError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        let camera = StillImageCamera::new(dir.path());
        assert!(matches!(
            camera.configure(),
            Err(CameraError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_configure_is_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 1);
        let camera = StillImageCamera::new(&path);
        camera.configure().unwrap();
        std::fs::remove_file(&path).unwrap();
        // Second call does not rescan the source.
        assert!(camera.configure().is_ok());
    }

    #[test]
    fn test_start_before_configure_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 1);
        let camera = StillImageCamera::new(dir.path());
        camera.start();
        camera.configure().unwrap(); // round trip: start was processed first
        assert!(!camera.is_running());
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 1);
        let camera = ready_camera(dir.path());
        camera.start();
        camera.configure().unwrap();
        assert!(camera.is_running());

        camera.stop();
        camera.stop();
        camera.configure().unwrap();
        assert!(!camera.is_running());
    }

    #[test]
    fn test_capture_without_configure_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 1);
        let camera = StillImageCamera::new(dir.path());
        assert!(matches!(
            camera.capture_one_photo(),
            Err(CameraError::NotConfigured)
        ));
    }

    #[test]
    fn test_capture_while_stopped_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 1);
        let camera = StillImageCamera::new(dir.path());
        camera.configure().unwrap();
        assert!(matches!(
            camera.capture_one_photo(),
            Err(CameraError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn test_directory_captures_cycle_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), 20);
        write_png(&dir.path().join("a.png"), 10);
        let camera = ready_camera(dir.path());

        let values: Vec<u8> = (0..3)
            .map(|_| camera.capture_one_photo().unwrap().data()[0])
            .collect();
        assert_eq!(values, vec![10, 20, 10]);
    }

    #[test]
    fn test_undecodable_photo_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not a jpeg").unwrap();
        let camera = ready_camera(dir.path());
        assert!(matches!(
            camera.capture_one_photo(),
            Err(CameraError::Decode(_))
        ));
    }

    #[test]
    fn test_decoder_panic_fails_capture_and_frees_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 1);

        let crashed = Arc::new(AtomicBool::new(false));
        let decoder: PhotoDecoder = {
            let crashed = crashed.clone();
            Arc::new(move |_: &Path| {
                if !crashed.swap(true, Ordering::SeqCst) {
                    panic!("corrupt photo");
                }
                Ok(Frame::rgb(vec![0; 3], 1, 1))
            })
        };
        let camera = StillImageCamera::with_decoder(path, decoder);
        camera.configure().unwrap();
        camera.start();

        assert!(matches!(
            camera.capture_one_photo(),
            Err(CameraError::Decode(_))
        ));
        assert!(camera.capture_one_photo().is_ok());
    }

    #[test]
    fn test_second_capture_while_pending_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 1);

        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let decoder: PhotoDecoder = Arc::new(move |_: &Path| {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
            Ok(Frame::rgb(vec![0; 3], 1, 1))
        });
        let camera = Arc::new(StillImageCamera::with_decoder(path, decoder));
        camera.configure().unwrap();
        camera.start();

        let first = {
            let camera = camera.clone();
            thread::spawn(move || camera.capture_one_photo())
        };
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert!(matches!(
            camera.capture_one_photo(),
            Err(CameraError::CaptureInProgress)
        ));

        release_tx.send(()).unwrap();
        assert!(first.join().unwrap().is_ok());
    }
}
