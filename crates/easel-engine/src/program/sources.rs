//! WGSL sources per fill mode.
//!
//! WGSL has no includes, so the shared uniform block and transform are
//! spliced in front of each stage at compile time.

use super::FillMode;

const SOLID_VS: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/transform.wgsl"),
    include_str!("shaders/solid_vs.wgsl"),
);

const SOLID_FS: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/solid_fs.wgsl"),
);

const TEXTURED_VS: &str = concat!(
    include_str!("shaders/uniforms.wgsl"),
    include_str!("shaders/transform.wgsl"),
    include_str!("shaders/textured_vs.wgsl"),
);

const TEXTURED_FS: &str = include_str!("shaders/textured_fs.wgsl");

/// Vertex + fragment source pair.
#[derive(Debug, Copy, Clone)]
pub struct ProgramSources {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

pub fn for_fill(fill: FillMode) -> ProgramSources {
    match fill {
        FillMode::SolidColor => ProgramSources { vertex: SOLID_VS, fragment: SOLID_FS },
        FillMode::Textured => ProgramSources { vertex: TEXTURED_VS, fragment: TEXTURED_FS },
    }
}
