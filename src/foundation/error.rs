/// Convenience result type used across vgport.
pub type VgResult<T> = Result<T, VgError>;

/// Error classes reported by an accelerator [`Device`](crate::Device).
///
/// These are the only failures the fill dispatcher recognizes as "retry in software".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device rejected an argument (size, stride, transform, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The device could not allocate memory for the operation.
    #[error("out of device memory")]
    OutOfDeviceMemory,

    /// The device did not complete the operation in time.
    #[error("device timeout")]
    Timeout,

    /// The device does not implement the requested feature.
    #[error("unsupported by device: {0}")]
    Unsupported(String),
}

impl DeviceError {
    /// Build a [`DeviceError::InvalidArgument`] value.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Build a [`DeviceError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// Top-level error taxonomy used by engine APIs.
///
/// Errors are always returned, never raised, and propagate a single level: each component
/// reports to its immediate caller, which decides between fallback and abort.
#[derive(thiserror::Error, Debug)]
pub enum VgError {
    /// Zero-size primitive or coincident line endpoints. Callers skip the draw silently.
    #[error("degenerate geometry")]
    DegenerateGeometry,

    /// Scratch or cache allocation failed; nothing was drawn.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Pixel depth or container format the prepare pipeline does not decode.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The accelerator rejected the operation; retry through the software device.
    #[error("accelerator unsupported: {0}")]
    AcceleratorUnsupported(#[source] DeviceError),

    /// The active mask cannot be expressed as a path; use per-pixel masked compositing.
    #[error("mask unsupported")]
    MaskUnsupported,

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VgError {
    /// Build a [`VgError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`VgError::OutOfMemory`] value.
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }

    /// Build a [`VgError::UnsupportedFormat`] value.
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Return `true` when the two-tier policy may redo the call on the software device.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::AcceleratorUnsupported(_) | Self::MaskUnsupported)
    }
}

impl From<DeviceError> for VgError {
    fn from(err: DeviceError) -> Self {
        Self::AcceleratorUnsupported(err)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
