//! Render target binding.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::device::{Device, SurfaceConfig};

/// Something a [`Surface`] can be bound to: reports its current layout size.
pub trait RenderTarget {
    /// Current size in physical pixels.
    fn layout_size(&self) -> (u32, u32);
}

/// Cloneable target whose size the caller controls.
///
/// For offscreen rendering and tests: every clone observes `set_size`.
#[derive(Debug, Clone)]
pub struct SharedTarget {
    size: Rc<Cell<(u32, u32)>>,
}

impl SharedTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: Rc::new(Cell::new((width, height))) }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }
}

impl RenderTarget for SharedTarget {
    fn layout_size(&self) -> (u32, u32) {
        self.size.get()
    }
}

/// A bound render target plus its last known output size.
pub struct Surface {
    target: Box<dyn RenderTarget>,
    width: u32,
    height: u32,
    config: SurfaceConfig,
}

impl Surface {
    /// Applies `config` to the device and sizes the viewport to the target.
    pub(crate) fn bind<D: Device>(
        target: Box<dyn RenderTarget>,
        config: SurfaceConfig,
        device: &mut D,
    ) -> Self {
        device.configure(&config);
        let mut surface = Self { target, width: 0, height: 0, config };
        surface.resize(device);
        surface
    }

    /// Re-reads the target size and updates the device viewport.
    ///
    /// Returns whether the size changed.
    pub(crate) fn resize<D: Device>(&mut self, device: &mut D) -> bool {
        let (width, height) = self.target.layout_size();
        device.set_viewport(width, height);
        let changed = (width, height) != (self.width, self.height);
        if changed {
            log::debug!("surface resized to {width}x{height}");
        }
        self.width = width;
        self.height = height;
        changed
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
