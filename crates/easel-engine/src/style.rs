//! Element style: cached properties read by the render loop every frame.
//!
//! Geometry and color setters only update the cache; the next frame picks
//! the new values up. The background image is the one property with side
//! effects (program rebuild, texture allocation, async load), so it has no
//! setter here and goes through
//! [`Renderer::set_background_image`](crate::renderer::Renderer::set_background_image).

use crate::program::FillMode;

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    background_color: u32,
    background_image: Option<String>,
    rotation: f32,
    scale: [f32; 2],
}

impl Default for Style {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 1.0,
            height: 1.0,
            background_color: 0x000000,
            background_image: None,
            rotation: 0.0,
            scale: [1.0, 1.0],
        }
    }
}

impl Style {
    #[inline]
    pub fn left(&self) -> f32 {
        self.left
    }

    #[inline]
    pub fn set_left(&mut self, left: f32) {
        self.left = left;
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.top
    }

    #[inline]
    pub fn set_top(&mut self, top: f32) {
        self.top = top;
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn set_width(&mut self, width: f32) {
        self.width = width;
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    /// Packed `0xRRGGBB`; always drawn fully opaque.
    #[inline]
    pub fn background_color(&self) -> u32 {
        self.background_color
    }

    #[inline]
    pub fn set_background_color(&mut self, rgb: u32) {
        self.background_color = rgb;
    }

    #[inline]
    pub fn background_image(&self) -> Option<&str> {
        self.background_image.as_deref()
    }

    pub(crate) fn set_background_image_uri(&mut self, uri: Option<String>) {
        self.background_image = uri;
    }

    /// Degrees; rotates about the element's top-left corner.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    #[inline]
    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    #[inline]
    pub fn scale(&self) -> [f32; 2] {
        self.scale
    }

    #[inline]
    pub fn set_scale(&mut self, scale: [f32; 2]) {
        self.scale = scale;
    }

    /// Derived from [`background_image`](Self::background_image).
    #[inline]
    pub fn fill_mode(&self) -> FillMode {
        FillMode::of(self.background_image())
    }

    /// Writes every override except the background image through the setters.
    pub(crate) fn apply(&mut self, overrides: &StyleOverrides) {
        if let Some(v) = overrides.left {
            self.set_left(v);
        }
        if let Some(v) = overrides.top {
            self.set_top(v);
        }
        if let Some(v) = overrides.width {
            self.set_width(v);
        }
        if let Some(v) = overrides.height {
            self.set_height(v);
        }
        if let Some(v) = overrides.background_color {
            self.set_background_color(v);
        }
        if let Some(v) = overrides.rotation {
            self.set_rotation(v);
        }
        if let Some(v) = overrides.scale {
            self.set_scale(v);
        }
    }
}

/// Initial style for [`Renderer::create_element`](crate::renderer::Renderer::create_element).
///
/// Unset fields keep the [`Style`] defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOverrides {
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub background_color: Option<u32>,
    pub background_image: Option<String>,
    pub rotation: Option<f32>,
    pub scale: Option<[f32; 2]>,
}

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(mut self, left: f32) -> Self {
        self.left = Some(left);
        self
    }

    pub fn top(mut self, top: f32) -> Self {
        self.top = Some(top);
        self
    }

    /// Sets `left` and `top` together.
    pub fn position(self, left: f32, top: f32) -> Self {
        self.left(left).top(top)
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    /// Sets `width` and `height` together.
    pub fn size(self, width: f32, height: f32) -> Self {
        self.width(width).height(height)
    }

    pub fn background_color(mut self, rgb: u32) -> Self {
        self.background_color = Some(rgb);
        self
    }

    pub fn background_image(mut self, uri: impl Into<String>) -> Self {
        self.background_image = Some(uri.into());
        self
    }

    pub fn rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn scale(mut self, scale: [f32; 2]) -> Self {
        self.scale = Some(scale);
        self
    }
}
