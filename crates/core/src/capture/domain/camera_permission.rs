/// Authorization state for camera access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    NotDetermined,
    Authorized,
    Denied,
}

/// Source of camera authorization.
pub trait CameraPermission: Send + Sync {
    fn status(&self) -> PermissionStatus;

    /// Asks for access. Blocks until the user (or platform) answers.
    fn request(&self) -> bool;
}
