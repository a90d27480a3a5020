use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cutout_core::shared::constants::{
    APP_DIR_NAME, DEFAULT_FOREGROUND_THRESHOLD, DEFAULT_MIN_INSTANCE_AREA,
};
use cutout_core::storage::domain::cutout_file_store::StoreError;
use cutout_core::storage::infrastructure::png_file_store::PngFileStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Where cutout PNGs and the record index live.
    pub library_dir: Option<PathBuf>,
    /// Explicit matting model; resolved (and downloaded) when unset.
    pub model_path: Option<PathBuf>,
    pub foreground_threshold: f32,
    pub min_instance_area: u32,
    /// Skip the platform accelerator when running the matting model.
    pub cpu_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            library_dir: None,
            model_path: None,
            foreground_threshold: DEFAULT_FOREGROUND_THRESHOLD,
            min_instance_area: DEFAULT_MIN_INSTANCE_AREA,
            cpu_only: false,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no configuration directory available")
        })?;
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }

    /// Configured library directory, or the platform default.
    pub fn library_dir(&self) -> Result<PathBuf, StoreError> {
        match &self.library_dir {
            Some(dir) => Ok(dir.clone()),
            None => PngFileStore::default_dir(),
        }
    }
}
