//! Shader compile, link and reflection on top of naga.
//!
//! Both device adapters go through this module, so a program that links on
//! the headless device links on the GPU too, and uniform/attribute locations
//! are derived the same way everywhere.

use std::collections::BTreeMap;

use naga::{AddressSpace, Binding, TypeInner};

use crate::device::{DeviceError, ShaderStage, UniformLocation};

/// Byte range of a uniform block member.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct BlockMember {
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub group: u32,
    pub binding: u32,
    pub size: u32,
    pub members: BTreeMap<String, BlockMember>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    Texture,
    Sampler,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ResourceSlot {
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
}

/// What a single compiled stage consumes and produces.
#[derive(Debug, Clone)]
pub(crate) struct ShaderInterface {
    pub stage: ShaderStage,
    pub entry_point: String,
    /// location -> name
    pub inputs: BTreeMap<u32, String>,
    pub outputs: BTreeMap<u32, String>,
    pub block: Option<UniformBlock>,
    pub resources: BTreeMap<String, ResourceSlot>,
}

/// Linked program: everything location queries are answered from.
#[derive(Debug, Clone)]
pub(crate) struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub attributes: BTreeMap<String, u32>,
    pub block: Option<UniformBlock>,
    pub resources: BTreeMap<String, ResourceSlot>,
}

impl ProgramInterface {
    pub(crate) fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    pub(crate) fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        if let Some(m) = self.block.as_ref().and_then(|b| b.members.get(name)) {
            return Some(UniformLocation::Block { offset: m.offset, size: m.size });
        }
        self.resources
            .get(name)
            .map(|slot| UniformLocation::Binding(slot.binding))
    }

    /// Size of the uniform block in bytes (0 without a block).
    pub(crate) fn block_size(&self) -> u32 {
        self.block.as_ref().map_or(0, |b| b.size)
    }

    /// Attribute locations in ascending order; one vertex buffer slot each.
    pub(crate) fn attribute_slots(&self) -> Vec<u32> {
        let mut locs: Vec<u32> = self.attributes.values().copied().collect();
        locs.sort_unstable();
        locs
    }

    pub(crate) fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = u32> + '_ {
        self.resources
            .values()
            .filter(move |s| s.kind == kind)
            .map(|s| s.binding)
    }
}

/// Parses and validates a WGSL stage and extracts its interface.
pub(crate) fn compile(stage: ShaderStage, source: &str) -> Result<ShaderInterface, DeviceError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| DeviceError::Compile {
        stage,
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| DeviceError::Compile { stage, message: e.to_string() })?;

    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let Some(entry) = module.entry_points.iter().find(|ep| ep.stage == naga_stage) else {
        return Err(DeviceError::Compile {
            stage,
            message: format!("no {stage:?} entry point"),
        });
    };

    let mut inputs = BTreeMap::new();
    for arg in &entry.function.arguments {
        collect_locations(&module, arg.binding.as_ref(), arg.name.as_deref(), arg.ty, &mut inputs);
    }

    let mut outputs = BTreeMap::new();
    if let Some(result) = &entry.function.result {
        collect_locations(&module, result.binding.as_ref(), None, result.ty, &mut outputs);
    }

    let mut block = None;
    let mut resources = BTreeMap::new();
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        let name = var.name.clone().unwrap_or_default();
        match var.space {
            AddressSpace::Uniform => {
                block = Some(uniform_block(&module, rb.group, rb.binding, var.ty, &name));
            }
            AddressSpace::Handle => {
                let kind = match module.types[var.ty].inner {
                    TypeInner::Image { .. } => ResourceKind::Texture,
                    TypeInner::Sampler { .. } => ResourceKind::Sampler,
                    _ => continue,
                };
                resources.insert(
                    name,
                    ResourceSlot { group: rb.group, binding: rb.binding, kind },
                );
            }
            _ => {}
        }
    }

    Ok(ShaderInterface {
        stage,
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        block,
        resources,
    })
}

/// Checks that `vertex` feeds every input of `fragment` and that both stages
/// agree on shared bindings.
pub(crate) fn link(
    vertex: &ShaderInterface,
    fragment: &ShaderInterface,
) -> Result<ProgramInterface, DeviceError> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err(DeviceError::Link(format!(
            "expected vertex + fragment stages, got {:?} + {:?}",
            vertex.stage, fragment.stage
        )));
    }

    for (loc, name) in &fragment.inputs {
        if !vertex.outputs.contains_key(loc) {
            return Err(DeviceError::Link(format!(
                "fragment input `{name}` at location {loc} is not written by the vertex stage"
            )));
        }
    }

    let block = match (&vertex.block, &fragment.block) {
        (Some(v), Some(f)) if v != f => {
            return Err(DeviceError::Link(
                "vertex and fragment stages declare different uniform blocks".into(),
            ));
        }
        (Some(b), _) | (None, Some(b)) => Some(b.clone()),
        (None, None) => None,
    };

    let mut resources = vertex.resources.clone();
    for (name, slot) in &fragment.resources {
        match resources.get(name) {
            Some(existing) if existing != slot => {
                return Err(DeviceError::Link(format!(
                    "`{name}` is bound differently in the two stages"
                )));
            }
            _ => {
                resources.insert(name.clone(), *slot);
            }
        }
    }

    let attributes = vertex
        .inputs
        .iter()
        .map(|(loc, name)| (name.clone(), *loc))
        .collect();

    Ok(ProgramInterface {
        vertex_entry: vertex.entry_point.clone(),
        fragment_entry: fragment.entry_point.clone(),
        attributes,
        block,
        resources,
    })
}

fn collect_locations(
    module: &naga::Module,
    binding: Option<&Binding>,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    out: &mut BTreeMap<u32, String>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.insert(*location, name.unwrap_or_default().to_string());
        }
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    if let Some(Binding::Location { location, .. }) = &m.binding {
                        out.insert(*location, m.name.clone().unwrap_or_default());
                    }
                }
            }
        }
    }
}

fn uniform_block(
    module: &naga::Module,
    group: u32,
    binding: u32,
    ty: naga::Handle<naga::Type>,
    var_name: &str,
) -> UniformBlock {
    let ctx = module.to_ctx();
    let inner = &module.types[ty].inner;

    let mut members = BTreeMap::new();
    let size = match inner {
        TypeInner::Struct { members: fields, span } => {
            for f in fields {
                let size = module.types[f.ty].inner.size(ctx);
                members.insert(
                    f.name.clone().unwrap_or_default(),
                    BlockMember { offset: f.offset, size },
                );
            }
            *span
        }
        other => {
            let size = other.size(ctx);
            members.insert(var_name.to_string(), BlockMember { offset: 0, size });
            size
        }
    };

    UniformBlock { group, binding, size, members }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{sources, FillMode};

    fn compiled(fill: FillMode) -> (ShaderInterface, ShaderInterface) {
        let src = sources::for_fill(fill);
        (
            compile(ShaderStage::Vertex, src.vertex).unwrap(),
            compile(ShaderStage::Fragment, src.fragment).unwrap(),
        )
    }

    #[test]
    fn solid_program_reflects_uniform_block() {
        let (vs, fs) = compiled(FillMode::SolidColor);
        let program = link(&vs, &fs).unwrap();

        assert_eq!(program.attribute_location("a_position"), Some(0));
        assert_eq!(program.attribute_location("a_texcoord"), None);
        assert_eq!(
            program.uniform_location("u_resolution"),
            Some(UniformLocation::Block { offset: 0, size: 8 })
        );
        assert_eq!(
            program.uniform_location("u_scale"),
            Some(UniformLocation::Block { offset: 24, size: 8 })
        );
        assert_eq!(
            program.uniform_location("u_background_color"),
            Some(UniformLocation::Block { offset: 32, size: 16 })
        );
        assert_eq!(program.block_size(), 48);
    }

    #[test]
    fn textured_program_reflects_texture_and_sampler() {
        let (vs, fs) = compiled(FillMode::Textured);
        let program = link(&vs, &fs).unwrap();

        assert_eq!(program.attribute_slots(), vec![0, 1]);
        assert_eq!(program.attribute_location("a_texcoord"), Some(1));
        assert_eq!(program.uniform_location("u_texture"), Some(UniformLocation::Binding(1)));
        assert_eq!(program.uniform_location("u_sampler"), Some(UniformLocation::Binding(2)));
        assert_eq!(program.resources_of(ResourceKind::Texture).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn syntax_error_is_a_compile_failure() {
        let err = compile(ShaderStage::Vertex, "@vertex fn vs_main( -> {").unwrap_err();
        assert!(matches!(err, DeviceError::Compile { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn missing_entry_point_is_a_compile_failure() {
        let src = sources::for_fill(FillMode::SolidColor);
        let err = compile(ShaderStage::Fragment, src.vertex).unwrap_err();
        assert!(matches!(err, DeviceError::Compile { stage: ShaderStage::Fragment, .. }));
    }

    #[test]
    fn unfed_fragment_input_fails_to_link() {
        // Solid vertex stage writes no varyings; the textured fragment stage reads one.
        let solid = sources::for_fill(FillMode::SolidColor);
        let textured = sources::for_fill(FillMode::Textured);
        let vs = compile(ShaderStage::Vertex, solid.vertex).unwrap();
        let fs = compile(ShaderStage::Fragment, textured.fragment).unwrap();
        assert!(matches!(link(&vs, &fs), Err(DeviceError::Link(_))));
    }

    #[test]
    fn swapped_stages_fail_to_link() {
        let (vs, fs) = compiled(FillMode::SolidColor);
        assert!(matches!(link(&fs, &vs), Err(DeviceError::Link(_))));
    }
}
