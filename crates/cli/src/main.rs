mod settings;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::Sender;

use cutout_core::capture::domain::camera_session::CameraError;
use cutout_core::capture::infrastructure::image_file_reader::ImageFileReader;
use cutout_core::capture::infrastructure::path_permission::PathPermission;
use cutout_core::capture::infrastructure::still_image_camera::StillImageCamera;
use cutout_core::pipeline::capture_workflow::{CaptureWorkflow, WorkflowMessage, WorkflowState};
use cutout_core::pipeline::extract_subject_use_case::{ExtractionError, SubjectExtractor};
use cutout_core::pipeline::infrastructure::threaded_workflow_driver::{
    ThreadedWorkflowDriver, WorkflowServices,
};
use cutout_core::pipeline::manage_gallery_use_case::CutoutGallery;
use cutout_core::pipeline::workflow_presenter::{Alert, WorkflowPresenter};
use cutout_core::segmentation::domain::subject_segmenter::{SegmentationError, SubjectSegmenter};
use cutout_core::segmentation::infrastructure::inference_device::InferenceDevice;
use cutout_core::segmentation::infrastructure::label_image_segmenter::LabelImageSegmenter;
use cutout_core::segmentation::infrastructure::onnx_matte_segmenter::OnnxMatteSegmenter;
use cutout_core::shared::constants::RECORD_INDEX_FILE_NAME;
use cutout_core::shared::error_kind::ErrorKind;
use cutout_core::shared::model_resolver::{self, SEGMENTATION_MODEL};
use cutout_core::storage::domain::cutout_file_store::{CutoutFileStore, StoreError};
use cutout_core::storage::domain::cutout_record::{unique_file_name, CutoutRecord};
use cutout_core::storage::domain::record_store::RecordStore;
use cutout_core::storage::infrastructure::json_record_store::JsonRecordStore;
use cutout_core::storage::infrastructure::png_file_store::PngFileStore;

use settings::Settings;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Cut the main subject out of photos as transparent PNGs.
#[derive(Parser)]
#[command(name = "cutout")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the largest subject of an image.
    Extract {
        /// Input image file.
        input: PathBuf,

        #[command(flatten)]
        segmenter: SegmenterArgs,

        /// Write PNGs here instead of adding the cutout to the library.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also write the full-canvas cutout (requires --output-dir).
        #[arg(long, requires = "output_dir")]
        full: bool,
    },
    /// Run the interactive capture workflow against a photo source.
    Capture {
        /// Image file, or directory of images cycled through on each shot.
        #[arg(long)]
        source: PathBuf,

        #[command(flatten)]
        segmenter: SegmenterArgs,
    },
    /// List saved cutouts, newest first.
    List,
    /// Delete a saved cutout by id or file name.
    Delete {
        /// Record id or file name.
        target: String,
    },
    /// Print the library directory.
    Path,
    /// Show or change persistent settings.
    Config {
        #[arg(long)]
        library_dir: Option<PathBuf>,

        #[arg(long)]
        model: Option<PathBuf>,

        /// Default foreground threshold (0.0-1.0).
        #[arg(long)]
        threshold: Option<f32>,

        /// Default minimum instance area in mask pixels.
        #[arg(long)]
        min_area: Option<u32>,

        /// Always run the matting model on CPU (true/false).
        #[arg(long)]
        cpu_only: Option<bool>,
    },
}

#[derive(Args)]
struct SegmenterArgs {
    /// Use a precomputed label image (8/16-bit grayscale, 0 = background)
    /// instead of the matting model.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Matting model file (ONNX).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Foreground threshold on the matte (0.0-1.0).
    #[arg(long)]
    threshold: Option<f32>,

    /// Connected components smaller than this are ignored.
    #[arg(long)]
    min_area: Option<u32>,

    /// Run the matting model on CPU even when an accelerator is available.
    #[arg(long)]
    cpu: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        match error_kind(e.as_ref()) {
            Some(kind) => eprintln!("Error ({kind}): {e}"),
            None => eprintln!("Error: {e}"),
        }
        process::exit(1);
    }
}

/// Category of a failure raised by the core library, if it came from there.
fn error_kind(error: &(dyn std::error::Error + 'static)) -> Option<ErrorKind> {
    if let Some(e) = error.downcast_ref::<ExtractionError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<SegmentationError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<CameraError>() {
        Some(e.kind())
    } else if let Some(e) = error.downcast_ref::<StoreError>() {
        Some(e.kind())
    } else if error.is::<image::ImageError>() {
        Some(ErrorKind::InvalidInput)
    } else {
        None
    }
}

fn run() -> CliResult {
    let cli = Cli::parse();
    let settings = Settings::load();

    match cli.command {
        Command::Extract {
            input,
            segmenter,
            output_dir,
            full,
        } => run_extract(&settings, &input, &segmenter, output_dir.as_deref(), full),
        Command::Capture { source, segmenter } => run_capture(&settings, &source, &segmenter),
        Command::List => run_list(&settings),
        Command::Delete { target } => run_delete(&settings, &target),
        Command::Path => {
            println!("{}", settings.library_dir()?.display());
            Ok(())
        }
        Command::Config {
            library_dir,
            model,
            threshold,
            min_area,
            cpu_only,
        } => run_config(settings, library_dir, model, threshold, min_area, cpu_only),
    }
}

fn run_extract(
    settings: &Settings,
    input: &Path,
    args: &SegmenterArgs,
    output_dir: Option<&Path>,
    full: bool,
) -> CliResult {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }
    let frame = ImageFileReader::read(input)?;
    let extractor = SubjectExtractor::new(build_segmenter(settings, args)?);

    match output_dir {
        Some(dir) => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("image");
            let files = PngFileStore::new(dir);
            if full {
                let pair = extractor.extract_largest_subject(&frame)?;
                let path = files.save(&pair.cropped.image, &format!("{stem}_cutout.png"))?;
                println!("{}", path.display());
                let path = files.save(&pair.full.image, &format!("{stem}_full.png"))?;
                println!("{}", path.display());
            } else {
                let cutout = extractor.extract_largest_subject_cutout(&frame)?;
                let path = files.save(&cutout.image, &format!("{stem}_cutout.png"))?;
                println!("{}", path.display());
            }
        }
        None => {
            let cutout = extractor.extract_largest_subject_cutout(&frame)?;
            let (files, mut records) = open_library(settings)?;
            let file_name = unique_file_name();
            let path = files.save(&cutout.image, &file_name)?;
            records.insert(CutoutRecord::new(file_name))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn run_capture(settings: &Settings, source: &Path, args: &SegmenterArgs) -> CliResult {
    let extractor = Arc::new(SubjectExtractor::new(build_segmenter(settings, args)?));
    let (files, records) = open_library(settings)?;

    let services = WorkflowServices {
        camera: Arc::new(StillImageCamera::new(source)),
        permission: Arc::new(PathPermission::new(source)),
        extractor,
        files: Arc::new(files),
        records: Box::new(records),
    };
    let mut driver = ThreadedWorkflowDriver::new(services, Box::new(TerminalPresenter::default()));
    spawn_input(driver.sender());
    driver.start();
    driver.run_until_closed();
    Ok(())
}

fn run_list(settings: &Settings) -> CliResult {
    let gallery = open_gallery(settings)?;
    let entries = gallery.entries();
    if entries.is_empty() {
        eprintln!("No saved cutouts.");
    }
    for entry in entries {
        println!(
            "{}  {}  {}",
            entry.record.id,
            entry.record.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.path.display()
        );
    }
    Ok(())
}

fn run_delete(settings: &Settings, target: &str) -> CliResult {
    let mut gallery = open_gallery(settings)?;
    let entry = gallery
        .find(target)
        .ok_or_else(|| format!("No saved cutout matches '{target}'"))?;
    gallery.delete(entry.record.id)?;
    println!("Deleted {}", entry.record.file_name);
    Ok(())
}

fn run_config(
    mut settings: Settings,
    library_dir: Option<PathBuf>,
    model: Option<PathBuf>,
    threshold: Option<f32>,
    min_area: Option<u32>,
    cpu_only: Option<bool>,
) -> CliResult {
    let changed = library_dir.is_some()
        || model.is_some()
        || threshold.is_some()
        || min_area.is_some()
        || cpu_only.is_some();
    if let Some(t) = threshold {
        validate_threshold(t)?;
        settings.foreground_threshold = t;
    }
    if let Some(dir) = library_dir {
        settings.library_dir = Some(dir);
    }
    if let Some(path) = model {
        settings.model_path = Some(path);
    }
    if let Some(area) = min_area {
        settings.min_instance_area = area;
    }
    if let Some(cpu_only) = cpu_only {
        settings.cpu_only = cpu_only;
    }
    if changed {
        settings.save()?;
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn build_segmenter(settings: &Settings, args: &SegmenterArgs) -> CliResult<Box<dyn SubjectSegmenter>> {
    if let Some(mask) = &args.mask {
        return Ok(Box::new(LabelImageSegmenter::from_file(mask)?));
    }

    let threshold = args.threshold.unwrap_or(settings.foreground_threshold);
    validate_threshold(threshold)?;
    let min_area = args.min_area.unwrap_or(settings.min_instance_area);

    log::info!("Resolving model: {}", SEGMENTATION_MODEL.name);
    let explicit = args.model.as_deref().or(settings.model_path.as_deref());
    let model_path = model_resolver::resolve(
        SEGMENTATION_MODEL,
        explicit,
        None,
        Some(Box::new(download_progress)),
    )?;
    let device = InferenceDevice::from_cpu_only(args.cpu || settings.cpu_only);
    Ok(Box::new(OnnxMatteSegmenter::new(
        &model_path,
        device,
        threshold,
        min_area,
    )?))
}

fn validate_threshold(threshold: f32) -> CliResult {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(format!("Threshold must be between 0.0 and 1.0, got {threshold}").into());
    }
    Ok(())
}

fn open_library(settings: &Settings) -> CliResult<(PngFileStore, JsonRecordStore)> {
    let dir = settings.library_dir()?;
    let records = JsonRecordStore::open(dir.join(RECORD_INDEX_FILE_NAME))?;
    Ok((PngFileStore::new(dir), records))
}

fn open_gallery(settings: &Settings) -> CliResult<CutoutGallery> {
    let (files, records) = open_library(settings)?;
    Ok(CutoutGallery::new(Box::new(files), Box::new(records)))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading segmentation model... {pct}%");
    } else {
        eprint!("\rDownloading segmentation model... {downloaded} bytes");
    }
}

// ---------------------------------------------------------------------------
// Terminal front end
// ---------------------------------------------------------------------------

/// Reads one command per line and posts it to the workflow.
/// End of input exits the workflow.
fn spawn_input(sender: Sender<WorkflowMessage>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let Some(message) = parse_command(&line) else {
                eprintln!("Unknown command '{}'", line.trim());
                continue;
            };
            let exit = matches!(message, WorkflowMessage::ExitRequested);
            if sender.send(message).is_err() || exit {
                return;
            }
        }
        let _ = sender.send(WorkflowMessage::ExitRequested);
    });
}

fn parse_command(line: &str) -> Option<WorkflowMessage> {
    match line.trim() {
        "" | "p" => Some(WorkflowMessage::ShutterPressed),
        "r" => Some(WorkflowMessage::RetakePressed),
        "s" => Some(WorkflowMessage::SavePressed),
        "q" => Some(WorkflowMessage::ExitRequested),
        _ => None,
    }
}

/// Prints a prompt whenever the workflow's state or camera readiness changes.
#[derive(Default)]
struct TerminalPresenter {
    last: Option<(&'static str, bool)>,
}

impl WorkflowPresenter for TerminalPresenter {
    fn present(&mut self, workflow: &CaptureWorkflow) {
        let key = (workflow.state().name(), workflow.camera_ready());
        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);
        if let Some(prompt) = prompt(workflow) {
            println!("{prompt}");
        }
    }

    fn alert(&mut self, alert: &Alert) {
        eprintln!("{alert} [{}]", alert.kind);
    }

    fn closed(&mut self) {
        println!("Bye.");
    }
}

fn prompt(workflow: &CaptureWorkflow) -> Option<String> {
    let text = match workflow.state() {
        WorkflowState::AwaitingPermission => "Waiting for camera access...".to_string(),
        WorkflowState::PermissionDenied => {
            "Camera access denied. Check that the photo source is readable. [q] quit".to_string()
        }
        WorkflowState::Previewing if workflow.camera_ready() => {
            "Ready. [enter] take photo, [q] quit".to_string()
        }
        WorkflowState::Previewing => "Setting up camera... [q] quit".to_string(),
        WorkflowState::Capturing { .. } => "Capturing...".to_string(),
        WorkflowState::Extracting { .. } => "Looking for the subject... [r] retake".to_string(),
        WorkflowState::Reviewing { cutouts, .. } => {
            let extent = cutouts.cropped.extent;
            format!(
                "Subject found: {}x{} at ({}, {}). [s] save, [r] retake, [q] quit",
                extent.width, extent.height, extent.x, extent.y
            )
        }
        WorkflowState::Saving { file_name, .. } => format!("Saving {file_name}..."),
        WorkflowState::Dismissed => return None,
    };
    Some(text)
}
