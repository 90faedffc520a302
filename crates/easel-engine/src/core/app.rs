use winit::event::WindowEvent;

use crate::device::WgpuDevice;
use crate::renderer::Renderer;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once, after the renderer exists and the window is offered as a
    /// target. Build the initial scene here.
    fn setup(&mut self, renderer: &mut Renderer<WgpuDevice>) -> anyhow::Result<()>;

    /// Called for window events.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per frame, before the scene is drawn.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let _ = ctx;
        AppControl::Continue
    }
}
