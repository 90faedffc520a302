use std::fmt;

use super::Pixels;

/// Identifies one load request. Never reused within a renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadId(pub(crate) u64);

/// A request to fetch and decode the image at `uri`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub id: LoadId,
    pub uri: String,
}

/// A finished (successful or failed) load.
#[derive(Debug)]
pub struct LoadCompletion {
    pub id: LoadId,
    pub result: Result<Pixels, LoadError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The URI scheme is not handled by this loader.
    UnsupportedUri(String),
    Io(String),
    Decode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnsupportedUri(uri) => write!(f, "unsupported image uri `{uri}`"),
            LoadError::Io(msg) => write!(f, "image read failed: {msg}"),
            LoadError::Decode(msg) => write!(f, "image decode failed: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Asynchronous image source polled by the render loop.
pub trait ImageLoader {
    /// Begins loading; the completion is reported by a later [`poll`](Self::poll).
    fn start(&mut self, request: LoadRequest);

    /// Abandons a load. Its completion, if any, is never reported.
    fn cancel(&mut self, id: LoadId);

    /// Drains loads that finished since the previous poll.
    fn poll(&mut self) -> Vec<LoadCompletion>;
}
