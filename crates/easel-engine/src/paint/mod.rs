//! Color model for element fills.
//!
//! Geometry types remain in `coords`.

pub mod color;

pub use color::{pack_rgb, Color};
