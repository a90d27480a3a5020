/// Salient-object matting model used by the ONNX segmenter (320x320, single-channel output).
pub const SEGMENTATION_MODEL_NAME: &str = "u2netp.onnx";
pub const SEGMENTATION_MODEL_URL: &str =
    "https://github.com/danielgatis/rembg/releases/download/v0.0.0/u2netp.onnx";

/// Application directory under the platform config/data/cache roots.
pub const APP_DIR_NAME: &str = "Subject Cutout";

/// Subdirectory of the data root holding cutout PNGs and the record index.
pub const CUTOUT_DIR_NAME: &str = "subject_cutouts";

pub const RECORD_INDEX_FILE_NAME: &str = "records.json";

pub const CUTOUT_EXTENSION: &str = "png";

/// Matte probability above which a pixel counts as foreground.
pub const DEFAULT_FOREGROUND_THRESHOLD: f32 = 0.5;

/// Connected components smaller than this (in mask pixels) are treated as noise.
pub const DEFAULT_MIN_INSTANCE_AREA: u32 = 64;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
