//! Program cache: fill mode -> compiled, linked program with resolved locations.
//!
//! Every element owns its own [`Program`]. Programs are never patched: a fill
//! mode change builds a complete replacement (handle + locations together)
//! and only then releases the old one.

pub(crate) mod reflect;
pub mod sources;

use crate::device::{Device, ProgramHandle, ShaderHandle, ShaderStage, UniformLocation};
use crate::error::RenderError;

/// How an element's rectangle is filled.
///
/// Derived from the element's background image: set means textured.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FillMode {
    SolidColor,
    Textured,
}

impl FillMode {
    #[inline]
    pub fn of(background_image: Option<&str>) -> Self {
        match background_image {
            Some(_) => FillMode::Textured,
            None => FillMode::SolidColor,
        }
    }
}

/// Uniform locations resolved from a linked program.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UniformLocations {
    pub resolution: UniformLocation,
    pub translation: UniformLocation,
    pub rotation: UniformLocation,
    pub scale: UniformLocation,
    /// Solid fills only.
    pub background_color: Option<UniformLocation>,
    /// Textured fills only.
    pub texture: Option<UniformLocation>,
}

/// Attribute locations resolved from a linked program.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeLocations {
    pub position: u32,
    /// Textured fills only.
    pub texcoord: Option<u32>,
}

/// A linked program plus the locations that are valid for it.
#[derive(Debug)]
pub struct Program {
    fill_mode: FillMode,
    handle: ProgramHandle,
    vertex: ShaderHandle,
    fragment: ShaderHandle,
    uniforms: UniformLocations,
    attributes: AttributeLocations,
}

impl Program {
    /// Compiles and links the program for `fill`.
    ///
    /// Compile or link failures are fatal configuration errors and are
    /// returned as [`RenderError::ShaderCompileOrLinkFailure`].
    pub fn build<D: Device>(device: &mut D, fill: FillMode) -> Result<Self, RenderError> {
        let src = sources::for_fill(fill);
        Self::build_from_sources(device, fill, src.vertex, src.fragment)
    }

    pub(crate) fn build_from_sources<D: Device>(
        device: &mut D,
        fill: FillMode,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, RenderError> {
        let vertex = device.compile_shader(ShaderStage::Vertex, vertex_src)?;
        let fragment = match device.compile_shader(ShaderStage::Fragment, fragment_src) {
            Ok(f) => f,
            Err(e) => {
                device.release_shader(vertex);
                return Err(e.into());
            }
        };

        let handle = match device.link_program(vertex, fragment) {
            Ok(h) => h,
            Err(e) => {
                device.release_shader(vertex);
                device.release_shader(fragment);
                return Err(e.into());
            }
        };

        match resolve_locations(device, handle, fill) {
            Ok((uniforms, attributes)) => {
                log::debug!("built {fill:?} program {handle:?}");
                Ok(Self { fill_mode: fill, handle, vertex, fragment, uniforms, attributes })
            }
            Err(e) => {
                device.release_program(handle);
                device.release_shader(vertex);
                device.release_shader(fragment);
                Err(e)
            }
        }
    }

    #[inline]
    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }

    #[inline]
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    #[inline]
    pub fn uniforms(&self) -> &UniformLocations {
        &self.uniforms
    }

    #[inline]
    pub fn attributes(&self) -> &AttributeLocations {
        &self.attributes
    }

    /// Releases the program and both shader stages.
    pub fn release<D: Device>(self, device: &mut D) {
        device.release_program(self.handle);
        device.release_shader(self.vertex);
        device.release_shader(self.fragment);
    }
}

fn resolve_locations<D: Device>(
    device: &D,
    program: ProgramHandle,
    fill: FillMode,
) -> Result<(UniformLocations, AttributeLocations), RenderError> {
    let uniform = |name: &str| {
        device
            .uniform_location(program, name)
            .ok_or_else(|| missing(fill, "uniform", name))
    };
    let attribute = |name: &str| {
        device
            .attribute_location(program, name)
            .ok_or_else(|| missing(fill, "attribute", name))
    };

    let textured = fill == FillMode::Textured;

    let uniforms = UniformLocations {
        resolution: uniform("u_resolution")?,
        translation: uniform("u_translation")?,
        rotation: uniform("u_rotation")?,
        scale: uniform("u_scale")?,
        background_color: if textured { None } else { Some(uniform("u_background_color")?) },
        texture: if textured { Some(uniform("u_texture")?) } else { None },
    };
    let attributes = AttributeLocations {
        position: attribute("a_position")?,
        texcoord: if textured { Some(attribute("a_texcoord")?) } else { None },
    };

    Ok((uniforms, attributes))
}

fn missing(fill: FillMode, what: &str, name: &str) -> RenderError {
    RenderError::ShaderCompileOrLinkFailure {
        stage: None,
        message: format!("{fill:?} program has no {what} `{name}`"),
    }
}
