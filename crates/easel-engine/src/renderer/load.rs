use crate::imaging::{LoadError, LoadId};
use crate::scene::ElementId;

/// Returned by [`Renderer::set_background_image`](super::Renderer::set_background_image)
/// for a non-null image; query it with [`Renderer::load_state`](super::Renderer::load_state).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub(crate) element: ElementId,
    pub(crate) load: LoadId,
}

impl LoadTicket {
    #[inline]
    pub fn element(&self) -> ElementId {
        self.element
    }

    #[inline]
    pub fn id(&self) -> LoadId {
        self.load
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Draws use the transparent placeholder.
    Pending,
    /// The image has been uploaded into the element's texture.
    Ready,
    /// The placeholder stays bound.
    Failed(LoadError),
    /// Superseded by another image, cleared, or the element was removed.
    Cancelled,
}

impl LoadState {
    #[inline]
    pub fn is_finished(&self) -> bool {
        !matches!(self, LoadState::Pending)
    }
}

#[derive(Debug)]
pub(crate) struct LoadRecord {
    pub element: ElementId,
    pub state: LoadState,
}
