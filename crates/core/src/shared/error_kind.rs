use std::fmt;

/// Coarse failure categories surfaced to the user.
///
/// Every typed error in the crate maps onto exactly one kind. None of them
/// is fatal; each ends the current attempt and leaves the user free to retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The frame could not be decoded into processable pixels.
    InvalidInput,
    /// Segmentation produced nothing usable.
    NoSubjectFound,
    /// A masked render, or its conversion to an output image, failed.
    RenderFailure,
    /// The camera is missing, busy or not configured.
    DeviceError,
    /// File write, delete or path resolution failed.
    StorageError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::NoSubjectFound => "no subject found",
            ErrorKind::RenderFailure => "render failure",
            ErrorKind::DeviceError => "device error",
            ErrorKind::StorageError => "storage error",
        };
        f.write_str(label)
    }
}
