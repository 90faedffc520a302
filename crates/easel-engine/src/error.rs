use std::fmt;

use crate::device::{DeviceError, ShaderStage};

/// Errors surfaced by the scene layer to its callers.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No render target is bound and none could be discovered.
    NoRenderTargetAvailable,
    /// A program failed to compile, link, or expose its required locations.
    ///
    /// Not retried; rendering must not continue with that program.
    ShaderCompileOrLinkFailure {
        stage: Option<ShaderStage>,
        message: String,
    },
    /// An element or GPU resource was used after it was released.
    StaleResourceReference { what: String },
    /// Any other device failure (surface lost for good, out of memory).
    Device(DeviceError),
}

impl RenderError {
    pub(crate) fn stale(what: impl Into<String>) -> Self {
        RenderError::StaleResourceReference { what: what.into() }
    }

    /// Whether the error only concerns a single released resource.
    #[inline]
    pub fn is_stale(&self) -> bool {
        matches!(self, RenderError::StaleResourceReference { .. })
    }
}

impl From<DeviceError> for RenderError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Compile { stage, message } => {
                RenderError::ShaderCompileOrLinkFailure { stage: Some(stage), message }
            }
            DeviceError::Link(message) => {
                RenderError::ShaderCompileOrLinkFailure { stage: None, message }
            }
            DeviceError::UnknownHandle { kind, id } => {
                RenderError::stale(format!("{kind} #{id}"))
            }
            other => RenderError::Device(other),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NoRenderTargetAvailable => {
                write!(f, "no render target bound and none available to bind")
            }
            RenderError::ShaderCompileOrLinkFailure { stage: Some(stage), message } => {
                write!(f, "{stage:?} shader failed: {message}")
            }
            RenderError::ShaderCompileOrLinkFailure { stage: None, message } => {
                write!(f, "program link failed: {message}")
            }
            RenderError::StaleResourceReference { what } => {
                write!(f, "stale reference to released {what}")
            }
            RenderError::Device(err) => write!(f, "device error: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Device(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_map_onto_taxonomy() {
        let e: RenderError = DeviceError::Link("x".into()).into();
        assert!(matches!(e, RenderError::ShaderCompileOrLinkFailure { stage: None, .. }));

        let e: RenderError = DeviceError::unknown("buffer", 7).into();
        assert!(e.is_stale());
        assert_eq!(e.to_string(), "stale reference to released buffer #7");

        let e: RenderError = DeviceError::Surface("lost".into()).into();
        assert!(matches!(e, RenderError::Device(DeviceError::Surface(_))));
    }
}
