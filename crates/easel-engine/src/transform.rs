//! Local quad geometry and a CPU mirror of the vertex transform.
//!
//! The vertex stage maps a local corner to clip space by scaling, rotating
//! about the local origin, translating, normalizing by the resolution and
//! flipping Y. [`Transform`] performs the same arithmetic on the CPU.

use crate::coords::Vec2;

/// Two triangles per element.
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Texture coordinates matching [`quad_positions`] vertex for vertex.
pub const QUAD_TEXCOORDS: [f32; 12] = [
    0.0, 0.0, //
    1.0, 0.0, //
    0.0, 1.0, //
    0.0, 1.0, //
    1.0, 0.0, //
    1.0, 1.0,
];

/// Two triangles covering `[0, width] x [0, height]` in local space.
pub fn quad_positions(width: f32, height: f32) -> [f32; 12] {
    let (x1, y1, x2, y2) = (0.0, 0.0, width, height);
    [
        x1, y1, //
        x2, y1, //
        x1, y2, //
        x1, y2, //
        x2, y1, //
        x2, y2,
    ]
}

/// `(sin, cos)` of `degrees`, the form the rotation uniform takes.
#[inline]
pub fn rotation_vector(degrees: f32) -> [f32; 2] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [sin, cos]
}

/// Uniform inputs of the vertex transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub resolution: Vec2,
    pub translation: Vec2,
    /// `(sin, cos)`
    pub rotation: Vec2,
    pub scale: Vec2,
}

impl Transform {
    pub fn new(resolution: Vec2, translation: Vec2, rotation_degrees: f32, scale: Vec2) -> Self {
        Self {
            resolution,
            translation,
            rotation: rotation_vector(rotation_degrees).into(),
            scale,
        }
    }

    /// Local corner to target pixels (top-left origin).
    pub fn to_target(&self, corner: Vec2) -> Vec2 {
        let scaled = corner.mul_elem(self.scale);
        let (sin, cos) = (self.rotation.x, self.rotation.y);
        let rotated = Vec2::new(
            scaled.x * cos + scaled.y * sin,
            scaled.y * cos - scaled.x * sin,
        );
        rotated + self.translation
    }

    /// Local corner to clip space, as the vertex stage computes it.
    pub fn to_clip(&self, corner: Vec2) -> Vec2 {
        let position = self.to_target(corner);
        let zero_to_one = Vec2::new(
            position.x / self.resolution.x,
            position.y / self.resolution.y,
        );
        let clip = zero_to_one * 2.0 - Vec2::new(1.0, 1.0);
        Vec2::new(clip.x, -clip.y)
    }

    /// Inverse of the projection half of [`to_clip`](Self::to_clip).
    pub fn clip_to_target(clip: Vec2, resolution: Vec2) -> Vec2 {
        Vec2::new(
            (clip.x + 1.0) * 0.5 * resolution.x,
            (1.0 - clip.y) * 0.5 * resolution.y,
        )
    }
}
