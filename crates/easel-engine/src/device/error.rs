use std::fmt;

use super::ShaderStage;

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

/// Errors reported by a [`Device`](super::Device) implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Shader source failed to parse or validate.
    Compile { stage: ShaderStage, message: String },
    /// Vertex and fragment stages could not be linked into a program.
    Link(String),
    /// A handle was used after release (or never belonged to this device).
    UnknownHandle { kind: &'static str, id: u32 },
    /// A program-scoped call was made with no program in use.
    NoProgramBound,
    /// Uniform value does not fit the queried location.
    UniformMismatch(String),
    /// An attribute of the current program has no buffer bound, or too little data.
    MissingAttribute(u32),
    /// A textured program was drawn without a texture bound.
    MissingTexture(u32),
    /// `draw` outside `begin_frame`/`end_frame`.
    NoFrame,
    /// Unrecoverable surface failure.
    Surface(String),
}

impl DeviceError {
    pub(crate) fn unknown(kind: &'static str, id: u32) -> Self {
        DeviceError::UnknownHandle { kind, id }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Compile { stage, message } => {
                write!(f, "{stage:?} shader failed to compile: {message}")
            }
            DeviceError::Link(msg) => write!(f, "program link failed: {msg}"),
            DeviceError::UnknownHandle { kind, id } => {
                write!(f, "{kind} handle #{id} is not alive on this device")
            }
            DeviceError::NoProgramBound => write!(f, "no program in use"),
            DeviceError::UniformMismatch(msg) => write!(f, "uniform mismatch: {msg}"),
            DeviceError::MissingAttribute(loc) => {
                write!(f, "attribute at location {loc} has no usable buffer")
            }
            DeviceError::NoFrame => write!(f, "draw issued outside a frame"),
            DeviceError::MissingTexture(binding) => {
                write!(f, "no texture bound at binding {binding}")
            }
            DeviceError::Surface(msg) => write!(f, "surface error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}
