#![forbid(unsafe_code)]

use dl_storage::StoreError;

#[derive(Debug)]
pub enum ServiceError {
    Store(StoreError),
    Io(std::io::Error),
    /// The resolved artifact location escapes the configured storage root.
    /// Internal path construction makes this unreachable today; the check is
    /// a hard boundary invariant at the serving edge.
    OutsideStorageRoot,
    /// The metadata row exists but the file is gone from disk.
    MissingOnDisk,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "store: {err}"),
            Self::Io(err) => write!(f, "io: {err}"),
            Self::OutsideStorageRoot => {
                write!(f, "artifact location is outside the storage root")
            }
            Self::MissingOnDisk => write!(f, "artifact file is missing on disk"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
