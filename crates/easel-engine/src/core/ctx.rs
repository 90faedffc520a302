use winit::window::Window;

use crate::device::WgpuDevice;
use crate::renderer::Renderer;
use crate::time::FrameTime;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// Style changes made here show up in the frame drawn right after the
/// callback returns.
pub struct FrameCtx<'a> {
    pub renderer: &'a mut Renderer<WgpuDevice>,
    pub window: &'a Window,
    pub time: FrameTime,
}
