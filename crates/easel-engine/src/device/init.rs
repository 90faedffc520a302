/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    ///
    /// Off by default: style colors and decoded images are treated as already
    /// encoded values and written to the surface unchanged.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and paces the render loop to the display refresh.
    pub present_mode: wgpu::PresentMode,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Capability flags requested when a surface is bound.
///
/// The default is the fixed set every surface is bound with: no alpha
/// channel, antialiasing, depth testing, premultiplied alpha, no stencil.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub alpha: bool,
    pub antialias: bool,
    pub depth: bool,
    pub premultiplied_alpha: bool,
    pub stencil: bool,
}

impl SurfaceConfig {
    /// MSAA sample count implied by `antialias`.
    #[inline]
    pub fn sample_count(&self) -> u32 {
        if self.antialias { 4 } else { 1 }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            alpha: false,
            antialias: true,
            depth: true,
            premultiplied_alpha: true,
            stencil: false,
        }
    }
}
