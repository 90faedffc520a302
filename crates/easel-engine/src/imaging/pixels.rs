use super::LoadError;

/// Tightly packed RGBA8 pixels, row-major, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixels {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Pixels {
    /// Wraps raw RGBA8 data. `rgba.len()` must equal `width * height * 4`.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, LoadError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(LoadError::Decode(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }

    /// 1×1 fully transparent texel bound while an image is still loading.
    pub fn transparent_placeholder() -> Self {
        Self { width: 1, height: 1, rgba: vec![0, 0, 0, 0] }
    }

    /// Decodes any format enabled on the `image` crate into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| LoadError::Decode(e.to_string()))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Whether every texel has zero alpha.
    pub fn is_fully_transparent(&self) -> bool {
        self.rgba.chunks_exact(4).all(|px| px[3] == 0)
    }
}

impl std::fmt::Debug for Pixels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pixels({}x{})", self.width, self.height)
    }
}
