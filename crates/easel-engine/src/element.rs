use crate::device::{BufferHandle, Device, TextureHandle};
use crate::imaging::LoadId;
use crate::program::{FillMode, Program};
use crate::style::Style;

/// A styled rectangle and the device resources it draws with.
///
/// Created and owned by the [`Renderer`](crate::renderer::Renderer); callers
/// address it through an [`ElementId`](crate::scene::ElementId).
#[derive(Debug)]
pub struct Element {
    name: String,
    style: Style,
    position_buffer: BufferHandle,
    /// Allocated the first time the element becomes textured.
    texcoord_buffer: Option<BufferHandle>,
    texture: Option<TextureHandle>,
    program: Program,
    /// Output size at creation time.
    resolution: (u32, u32),
    /// The in-flight image load whose completion may still write `texture`.
    load: Option<LoadId>,
}

impl Element {
    pub(crate) fn new(
        name: String,
        style: Style,
        position_buffer: BufferHandle,
        program: Program,
        resolution: (u32, u32),
    ) -> Self {
        Self {
            name,
            style,
            position_buffer,
            texcoord_buffer: None,
            texture: None,
            program,
            resolution,
            load: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn style(&self) -> &Style {
        &self.style
    }

    #[inline]
    pub(crate) fn style_mut(&mut self) -> &mut Style {
        &mut self.style
    }

    #[inline]
    pub fn fill_mode(&self) -> FillMode {
        self.program.fill_mode()
    }

    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[inline]
    pub fn position_buffer(&self) -> BufferHandle {
        self.position_buffer
    }

    #[inline]
    pub fn texcoord_buffer(&self) -> Option<BufferHandle> {
        self.texcoord_buffer
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Output size of the surface when the element was created.
    #[inline]
    pub fn creation_resolution(&self) -> (u32, u32) {
        self.resolution
    }

    #[inline]
    pub fn pending_load(&self) -> Option<LoadId> {
        self.load
    }

    pub(crate) fn set_texture_resources(&mut self, texcoords: BufferHandle, texture: TextureHandle) {
        self.texcoord_buffer = Some(texcoords);
        self.texture = Some(texture);
    }

    pub(crate) fn set_load(&mut self, load: Option<LoadId>) -> Option<LoadId> {
        std::mem::replace(&mut self.load, load)
    }

    /// Installs `program`, returning the one it replaces.
    pub(crate) fn replace_program(&mut self, program: Program) -> Program {
        std::mem::replace(&mut self.program, program)
    }

    /// Releases every device resource the element owns.
    pub(crate) fn release<D: Device>(self, device: &mut D) {
        device.release_buffer(self.position_buffer);
        if let Some(buffer) = self.texcoord_buffer {
            device.release_buffer(buffer);
        }
        if let Some(texture) = self.texture {
            device.release_texture(texture);
        }
        self.program.release(device);
    }
}
