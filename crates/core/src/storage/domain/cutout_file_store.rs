use std::path::PathBuf;

use thiserror::Error;

use crate::shared::error_kind::ErrorKind;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No data directory is available for saved cutouts.")]
    NoDataDirectory,
    #[error("'{0}' is not a valid cutout file name.")]
    InvalidFileName(String),
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("Record index {path} could not be serialized: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StorageError
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Persists cutout images as files named by the caller.
pub trait CutoutFileStore: Send + Sync {
    /// Writes `image` losslessly with its alpha channel. Returns the written path.
    fn save(&self, image: &Frame, file_name: &str) -> Result<PathBuf, StoreError>;

    /// Removes the file. Succeeds when it is already absent.
    fn delete(&self, file_name: &str) -> Result<(), StoreError>;

    fn resolve_path(&self, file_name: &str) -> PathBuf;
}

/// Rejects names that would escape the store directory.
pub(crate) fn validate_file_name(file_name: &str) -> Result<(), StoreError> {
    let bad = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\']);
    if bad {
        return Err(StoreError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ABC.png", true)]
    #[case("", false)]
    #[case("..", false)]
    #[case("../x.png", false)]
    #[case("dir/x.png", false)]
    #[case("dir\\x.png", false)]
    fn test_validate_file_name(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(validate_file_name(name).is_ok(), ok);
    }

    #[test]
    fn test_every_store_error_is_storage_kind() {
        assert_eq!(StoreError::NoDataDirectory.kind(), ErrorKind::StorageError);
        assert_eq!(
            StoreError::InvalidFileName("x".into()).kind(),
            ErrorKind::StorageError
        );
    }
}
