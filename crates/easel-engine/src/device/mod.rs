//! Device adapter: the capability set the scene layer draws through.
//!
//! The [`Device`] trait mirrors a classic immediate-mode GPU API (buffers,
//! shader compile/link, uniforms, textures, triangle-list draws). Two
//! adapters implement it:
//! - [`WgpuDevice`]: real rendering through wgpu on a window surface
//! - [`HeadlessDevice`]: records draws in memory; used by tests and offscreen tools
//!
//! `Gpu` keeps ownership of the wgpu Instance/Adapter/Device/Queue/Surface.

mod error;
mod gpu;
mod handle;
mod headless;
mod init;
mod swapchain;
mod uniform;
mod wgpu_device;

pub use error::{DeviceError, SurfaceErrorAction};
pub use gpu::{Gpu, GpuFrame};
pub use handle::{BufferHandle, ProgramHandle, ShaderHandle, TextureHandle};
pub use headless::{DrawCall, HeadlessDevice};
pub use init::{GpuInit, SurfaceConfig};
pub use uniform::{UniformLocation, UniformValue};
pub use wgpu_device::WgpuDevice;

pub(crate) use handle::HandleAlloc;
pub(crate) use uniform::{read_uniform, write_uniform};

use crate::imaging::Pixels;

/// Shader pipeline stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Texture addressing outside `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureWrap {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    Nearest,
    #[default]
    Linear,
}

/// Wrap/filter parameters fixed at texture creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextureParams {
    pub wrap: TextureWrap,
    pub filter: TextureFilter,
}

/// Result of finishing a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// The surface was unavailable this frame; draws were dropped.
    Skipped,
}

/// Capability interface consumed by the renderer.
///
/// Program state follows the "current program" model: `use_program` selects
/// a program and the uniform/attribute/texture calls that follow apply to it,
/// until `draw` submits a triangle list with that state.
pub trait Device {
    /// Applies the surface capability flags. Called once per surface bind,
    /// before any program is linked.
    fn configure(&mut self, config: &SurfaceConfig);
    fn set_viewport(&mut self, width: u32, height: u32);

    fn create_buffer(&mut self, label: &str) -> BufferHandle;
    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), DeviceError>;
    fn release_buffer(&mut self, buffer: BufferHandle);

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderHandle, DeviceError>;
    fn release_shader(&mut self, shader: ShaderHandle);
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, DeviceError>;
    fn release_program(&mut self, program: ProgramHandle);
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError>;
    fn set_uniform(
        &mut self,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), DeviceError>;
    fn bind_attribute(&mut self, location: u32, buffer: BufferHandle) -> Result<(), DeviceError>;
    fn bind_texture(
        &mut self,
        location: UniformLocation,
        texture: TextureHandle,
    ) -> Result<(), DeviceError>;

    fn create_texture(&mut self, params: TextureParams) -> TextureHandle;
    /// Replaces the texture's contents (and size) in place; the handle stays valid.
    fn upload_texture(&mut self, texture: TextureHandle, pixels: &Pixels)
        -> Result<(), DeviceError>;
    fn release_texture(&mut self, texture: TextureHandle);

    fn begin_frame(&mut self) -> Result<(), DeviceError>;
    /// Submits a triangle list of `vertex_count` vertices with the current program state.
    fn draw(&mut self, vertex_count: u32) -> Result<(), DeviceError>;
    fn end_frame(&mut self) -> Result<FrameOutcome, DeviceError>;
}
