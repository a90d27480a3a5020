use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::{APP_DIR_NAME, SEGMENTATION_MODEL_NAME, SEGMENTATION_MODEL_URL};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file not found: {0}")]
    Missing(PathBuf),
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Where a model lives on the network and what it is called on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub url: &'static str,
}

pub const SEGMENTATION_MODEL: ModelSpec = ModelSpec {
    name: SEGMENTATION_MODEL_NAME,
    url: SEGMENTATION_MODEL_URL,
};

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve a model file, checking local locations before downloading.
///
/// Resolution order:
/// 1. Explicit path (must exist)
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from the model's URL into the cache
pub fn resolve(
    spec: ModelSpec,
    explicit: Option<&Path>,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit {
        return if path.exists() {
            Ok(path.to_path_buf())
        } else {
            Err(ModelResolveError::Missing(path.to_path_buf()))
        };
    }
    resolve_in(&model_cache_dir()?, spec, bundled_dir, progress)
}

fn resolve_in(
    cache_dir: &Path,
    spec: ModelSpec,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(spec.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(bundled) = bundled_dir.map(|dir| dir.join(spec.name)) {
        if bundled.exists() {
            return Ok(bundled);
        }
    }

    log::info!("Downloading {} from {}", spec.name, spec.url);
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(spec.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Subject Cutout/models/`
/// - Linux: `$XDG_CACHE_HOME/Subject Cutout/models/` or `~/.cache/Subject Cutout/models/`
/// - Windows: `%LOCALAPPDATA%/Subject Cutout/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let root = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let root = dirs::cache_dir();

    root.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UNREACHABLE: ModelSpec = ModelSpec {
        name: "test_model.onnx",
        url: "http://invalid.nonexistent.example.com/model.onnx",
    };

    #[test]
    fn test_explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.onnx");
        fs::write(&path, b"model").unwrap();

        let resolved = resolve(UNREACHABLE, Some(&path), None, None).unwrap();
        assert_eq!(resolved, path);
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.onnx");
        let err = resolve(UNREACHABLE, Some(&path), None, None).unwrap_err();
        assert!(matches!(err, ModelResolveError::Missing(p) if p == path));
    }

    #[test]
    fn test_cached_file_is_found_before_bundled() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join(UNREACHABLE.name), b"cached").unwrap();
        fs::write(bundled.join(UNREACHABLE.name), b"bundled").unwrap();

        let resolved = resolve_in(&cache, UNREACHABLE, Some(&bundled), None).unwrap();
        assert_eq!(resolved, cache.join(UNREACHABLE.name));
    }

    #[test]
    fn test_bundled_file_is_used_when_cache_is_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join(UNREACHABLE.name), b"bundled").unwrap();

        let resolved = resolve_in(&cache, UNREACHABLE, Some(&bundled), None).unwrap();
        assert_eq!(resolved, bundled.join(UNREACHABLE.name));
    }

    #[test]
    fn test_model_cache_dir_is_namespaced() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }

    #[test]
    fn test_failed_download_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download(UNREACHABLE.url, &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
