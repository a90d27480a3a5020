use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::PathBuf;

use crate::shared::constants::{APP_DIR_NAME, CUTOUT_DIR_NAME};
use crate::shared::frame::Frame;
use crate::storage::domain::cutout_file_store::{validate_file_name, CutoutFileStore, StoreError};

/// Writes cutouts as PNG files into one directory using the `image` crate.
///
/// Files are written to a hidden temporary sibling and renamed into place,
/// so a crash never leaves a half-written cutout under its final name.
pub struct PngFileStore {
    dir: PathBuf,
}

impl PngFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Library directory when none is configured:
    /// `<data dir>/Subject Cutout/subject_cutouts`.
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        let data = dirs::data_dir().ok_or(StoreError::NoDataDirectory)?;
        Ok(data.join(APP_DIR_NAME).join(CUTOUT_DIR_NAME))
    }
}

impl CutoutFileStore for PngFileStore {
    fn save(&self, image: &Frame, file_name: &str) -> Result<PathBuf, StoreError> {
        validate_file_name(file_name)?;
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io("create", &self.dir, e))?;

        let path = self.dir.join(file_name);
        let tmp = self.dir.join(format!(".{file_name}.tmp"));
        let encode_error = |message: String| StoreError::Encode {
            path: path.clone(),
            message,
        };

        let data = image.data().to_vec();
        let (w, h) = (image.width(), image.height());
        let written = match image.channels() {
            4 => image::RgbaImage::from_raw(w, h, data)
                .ok_or_else(|| encode_error("pixel buffer does not match dimensions".into()))?
                .save_with_format(&tmp, image::ImageFormat::Png),
            3 => image::RgbImage::from_raw(w, h, data)
                .ok_or_else(|| encode_error("pixel buffer does not match dimensions".into()))?
                .save_with_format(&tmp, image::ImageFormat::Png),
            n => return Err(encode_error(format!("unsupported channel count {n}"))),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(encode_error(e.to_string()));
        }

        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io("move", &path, e)
        })?;
        log::info!("Saved cutout {}", path.display());
        Ok(path)
    }

    fn delete(&self, file_name: &str) -> Result<(), StoreError> {
        validate_file_name(file_name)?;
        let path = self.dir.join(file_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted cutout {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("delete", path, e)),
        }
    }

    fn resolve_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_frame() -> Frame {
        Frame::rgba(vec![10, 20, 30, 0, 40, 50, 60, 255], 2, 1)
    }

    #[test]
    fn test_default_dir_is_under_app_directory() {
        if let Ok(dir) = PngFileStore::default_dir() {
            assert!(dir.ends_with(PathBuf::from(APP_DIR_NAME).join(CUTOUT_DIR_NAME)));
        }
    }

    #[test]
    fn test_save_creates_directory_and_keeps_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngFileStore::new(dir.path().join("nested").join("cutouts"));

        let path = store.save(&rgba_frame(), "A.png").unwrap();

        assert_eq!(path, store.resolve_path("A.png"));
        let img = image::open(&path).unwrap();
        assert!(img.color().has_alpha());
        let rgba = img.to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0, [10, 20, 30, 0]);
        assert_eq!(rgba.get_pixel(1, 0).0, [40, 50, 60, 255]);
    }

    #[test]
    fn test_save_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngFileStore::new(dir.path());
        store.save(&rgba_frame(), "A.png").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.png".to_string()]);
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngFileStore::new(dir.path());
        store.save(&Frame::rgba(vec![0; 4], 1, 1), "A.png").unwrap();
        store.save(&rgba_frame(), "A.png").unwrap();
        assert_eq!(image::open(store.resolve_path("A.png")).unwrap().width(), 2);
    }

    #[test]
    fn test_save_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngFileStore::new(dir.path());
        assert!(matches!(
            store.save(&rgba_frame(), "../A.png"),
            Err(StoreError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let store = PngFileStore::new(blocker.join("cutouts"));
        let err = store.save(&rgba_frame(), "A.png").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngFileStore::new(dir.path());
        let path = store.save(&rgba_frame(), "A.png").unwrap();
        store.delete("A.png").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = PngFileStore::new(dir.path());
        assert!(store.delete("missing.png").is_ok());
        assert!(store.delete("missing.png").is_ok());
    }
}
