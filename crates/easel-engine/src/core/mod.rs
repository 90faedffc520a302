//! Core engine-facing contracts.
//!
//! This module defines the interface between the window runtime and
//! application code: the [`App`] callbacks and the per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
