//! Coordinate types shared by the transform pipeline and its tests.
//!
//! Canonical CPU space:
//! - Pixels of the bound render target
//! - Origin top-left
//! - +X right, +Y down

mod vec2;

pub use vec2::Vec2;
