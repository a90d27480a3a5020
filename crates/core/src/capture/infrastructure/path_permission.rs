use std::path::PathBuf;
use std::sync::Mutex;

use crate::capture::domain::camera_permission::{CameraPermission, PermissionStatus};

/// Grants camera access when the photo source can be read.
///
/// Mirrors a platform prompt: the status stays `NotDetermined` until the
/// first `request`, which decides once and sticks.
pub struct PathPermission {
    source: PathBuf,
    decided: Mutex<Option<bool>>,
}

impl PathPermission {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            decided: Mutex::new(None),
        }
    }
}

impl CameraPermission for PathPermission {
    fn status(&self) -> PermissionStatus {
        match self.decided.lock().ok().and_then(|d| *d) {
            None => PermissionStatus::NotDetermined,
            Some(true) => PermissionStatus::Authorized,
            Some(false) => PermissionStatus::Denied,
        }
    }

    fn request(&self) -> bool {
        let Ok(mut decided) = self.decided.lock() else {
            return false;
        };
        if let Some(granted) = *decided {
            return granted;
        }
        let granted = std::fs::metadata(&self.source).is_ok();
        log::info!(
            "Camera access {} for {}",
            if granted { "granted" } else { "denied" },
            self.source.display()
        );
        *decided = Some(granted);
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undetermined_until_requested() {
        let dir = tempfile::tempdir().unwrap();
        let permission = PathPermission::new(dir.path());
        assert_eq!(permission.status(), PermissionStatus::NotDetermined);
        assert!(permission.request());
        assert_eq!(permission.status(), PermissionStatus::Authorized);
    }

    #[test]
    fn test_unreadable_source_is_denied() {
        let permission = PathPermission::new("/nonexistent/photos");
        assert!(!permission.request());
        assert_eq!(permission.status(), PermissionStatus::Denied);
    }

    #[test]
    fn test_decision_sticks() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("later");
        let permission = PathPermission::new(&missing);
        assert!(!permission.request());
        std::fs::create_dir(&missing).unwrap();
        assert!(!permission.request());
        assert_eq!(permission.status(), PermissionStatus::Denied);
    }
}
