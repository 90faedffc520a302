//! Easel engine crate.
//!
//! A retained-mode 2D scene of styled rectangles drawn through an
//! immediate-mode GPU device. The [`renderer::Renderer`] owns the scene and
//! redraws it every frame; [`window::Runtime`] drives it from a `winit` window.

pub mod core;
pub mod coords;
pub mod device;
pub mod element;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod paint;
pub mod program;
pub mod renderer;
pub mod scene;
pub mod style;
pub mod surface;
pub mod time;
pub mod transform;
pub mod window;

pub use error::RenderError;
pub use renderer::{FrameStats, LoadState, LoadTicket, LoopState, Renderer};
pub use scene::ElementId;
pub use style::{Style, StyleOverrides};
