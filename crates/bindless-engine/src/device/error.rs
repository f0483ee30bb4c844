use thiserror::Error;

/// Failures reported by a `DeviceBackend`.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device out of memory")]
    OutOfMemory,

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),

    /// A write or residency request reached an image without storage.
    #[error("backend image has no storage")]
    MissingStorage,
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
