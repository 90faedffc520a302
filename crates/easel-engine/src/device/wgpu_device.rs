use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU64;
use std::rc::Rc;

use winit::dpi::PhysicalSize;

use crate::imaging::Pixels;
use crate::program::reflect::{self, ProgramInterface, ResourceKind, ShaderInterface};

use super::{
    write_uniform, BufferHandle, Device, DeviceError, FrameOutcome, Gpu, HandleAlloc,
    ProgramHandle, ShaderHandle, ShaderStage, SurfaceConfig, SurfaceErrorAction, TextureFilter,
    TextureHandle, TextureParams, TextureWrap, UniformLocation, UniformValue,
};

/// Every vertex attribute is a tightly packed `vec2<f32>`.
const ATTRIBUTE_STRIDE: u64 = 2 * std::mem::size_of::<f32>() as u64;
const UNIFORM_BINDING: u32 = 0;

struct GpuBuffer {
    label: String,
    raw: Option<wgpu::Buffer>,
    capacity: u64,
    /// Bytes written by the last upload.
    len: u64,
}

struct GpuShader {
    interface: ShaderInterface,
    module: Rc<wgpu::ShaderModule>,
}

struct GpuProgram {
    interface: ProgramInterface,
    vertex: Rc<wgpu::ShaderModule>,
    fragment: Rc<wgpu::ShaderModule>,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    /// CPU copy of the uniform block; snapshotted into the frame buffer at each draw.
    block: Vec<u8>,
    attributes: BTreeMap<u32, BufferHandle>,
    textures: BTreeMap<u32, TextureHandle>,
}

struct GpuTexture {
    params: TextureParams,
    raw: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
    /// Bumped whenever `raw` is reallocated; bind groups keyed on it go stale.
    version: u64,
}

struct PendingDraw {
    program: ProgramHandle,
    vertex_count: u32,
    uniform_offset: u32,
    texture: Option<TextureHandle>,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
struct BindKey {
    program: u32,
    texture: Option<(u32, u64)>,
    uniforms: u64,
}

/// Drops cached bind groups that sample `texture`. With `Some(version)` only
/// that allocation's groups go.
fn evict_texture_binds<V>(groups: &mut HashMap<BindKey, V>, texture: u32, version: Option<u64>) {
    groups.retain(|key, _| match key.texture {
        Some((id, v)) if id == texture => version.is_some_and(|old| old != v),
        _ => true,
    });
}

struct Multisample {
    view: wgpu::TextureView,
    size: (u32, u32),
    samples: u32,
}

/// [`Device`] adapter drawing through wgpu onto a window surface.
///
/// Draws are validated and queued as they are issued, then replayed into a
/// single render pass at `end_frame`. Uniform values are snapshotted per draw
/// into one frame-wide buffer addressed with dynamic offsets.
pub struct WgpuDevice {
    gpu: Gpu,
    ids: HandleAlloc,
    config: SurfaceConfig,

    buffers: HashMap<u32, GpuBuffer>,
    shaders: HashMap<u32, GpuShader>,
    programs: HashMap<u32, GpuProgram>,
    textures: HashMap<u32, GpuTexture>,
    samplers: HashMap<TextureParams, wgpu::Sampler>,
    current: Option<ProgramHandle>,

    frame: Option<Vec<PendingDraw>>,
    frame_uniforms: Vec<u8>,
    uniform_buffer: Option<(wgpu::Buffer, u64)>,
    uniform_generation: u64,
    bind_groups: HashMap<BindKey, wgpu::BindGroup>,
    texture_versions: u64,
    multisample: Option<Multisample>,
}

impl WgpuDevice {
    pub fn new(gpu: Gpu) -> Self {
        Self {
            gpu,
            ids: HandleAlloc::default(),
            config: SurfaceConfig::default(),
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            samplers: HashMap::new(),
            current: None,
            frame: None,
            frame_uniforms: Vec::new(),
            uniform_buffer: None,
            uniform_generation: 0,
            bind_groups: HashMap::new(),
            texture_versions: 0,
            multisample: None,
        }
    }

    fn current_program(&mut self) -> Result<&mut GpuProgram, DeviceError> {
        let handle = self.current.ok_or(DeviceError::NoProgramBound)?;
        self.programs
            .get_mut(&handle.0)
            .ok_or_else(|| DeviceError::unknown("program", handle.0))
    }

    fn alloc_texture(&self, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
        let raw = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("easel element texture"),
            size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = raw.create_view(&wgpu::TextureViewDescriptor::default());
        (raw, view)
    }

    fn write_texels(&self, texture: &wgpu::Texture, pixels: &Pixels) {
        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.rgba(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * pixels.width()),
                rows_per_image: Some(pixels.height()),
            },
            wgpu::Extent3d {
                width: pixels.width(),
                height: pixels.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    fn ensure_sampler(&mut self, params: TextureParams) {
        if self.samplers.contains_key(&params) {
            return;
        }
        let address = match params.wrap {
            TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            TextureWrap::Repeat => wgpu::AddressMode::Repeat,
        };
        let filter = match params.filter {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        };
        let sampler = self.gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("easel sampler"),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        self.samplers.insert(params, sampler);
    }

    /// Grows the frame uniform buffer to hold `needed` bytes.
    fn ensure_uniform_capacity(&mut self, needed: u64) {
        if matches!(&self.uniform_buffer, Some((_, cap)) if *cap >= needed) {
            return;
        }
        let capacity = needed.next_power_of_two().max(4096);
        let raw = self.gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("easel frame uniforms"),
            size: capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.uniform_buffer = Some((raw, capacity));
        self.uniform_generation += 1;
        self.bind_groups.clear();
        log::debug!("frame uniform buffer grown to {capacity} bytes");
    }

    fn bind_key(&self, draw: &PendingDraw) -> BindKey {
        BindKey {
            program: draw.program.0,
            texture: draw
                .texture
                .and_then(|t| self.textures.get(&t.0).map(|tex| (t.0, tex.version))),
            uniforms: self.uniform_generation,
        }
    }

    fn ensure_bind_group(&mut self, draw: &PendingDraw) -> Result<BindKey, DeviceError> {
        let key = self.bind_key(draw);
        if self.bind_groups.contains_key(&key) {
            return Ok(key);
        }

        let params = draw
            .texture
            .and_then(|t| self.textures.get(&t.0))
            .map_or_else(TextureParams::default, |t| t.params);
        self.ensure_sampler(params);

        let program = self
            .programs
            .get(&draw.program.0)
            .ok_or_else(|| DeviceError::unknown("program", draw.program.0))?;
        let texture = draw.texture.and_then(|t| self.textures.get(&t.0));

        let mut entries = Vec::new();
        if let Some(block) = &program.interface.block {
            let (buffer, _) = self
                .uniform_buffer
                .as_ref()
                .ok_or_else(|| DeviceError::Surface("uniform buffer missing".into()))?;
            entries.push(wgpu::BindGroupEntry {
                binding: block.binding,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(u64::from(block.size)),
                }),
            });
        }
        for slot in program.interface.resources.values() {
            let resource = match slot.kind {
                ResourceKind::Texture => {
                    let tex = texture.ok_or(DeviceError::MissingTexture(slot.binding))?;
                    wgpu::BindingResource::TextureView(&tex.view)
                }
                ResourceKind::Sampler => {
                    let sampler = self
                        .samplers
                        .get(&params)
                        .ok_or_else(|| DeviceError::Surface("sampler missing".into()))?;
                    wgpu::BindingResource::Sampler(sampler)
                }
            };
            entries.push(wgpu::BindGroupEntry { binding: slot.binding, resource });
        }

        let group = self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("easel program bind group"),
            layout: &program.layout,
            entries: &entries,
        });
        self.bind_groups.insert(key, group);
        Ok(key)
    }

    fn ensure_multisample(&mut self) {
        let samples = self.config.sample_count();
        if samples <= 1 {
            self.multisample = None;
            return;
        }
        let size = self.gpu.size();
        let size = (size.width.max(1), size.height.max(1));
        if matches!(&self.multisample, Some(m) if m.size == size && m.samples == samples) {
            return;
        }
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("easel msaa color"),
            size: wgpu::Extent3d { width: size.0, height: size.1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format: self.gpu.surface_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.multisample = Some(Multisample { view, size, samples });
    }

    fn rebuild_pipelines(&mut self) {
        let device = self.gpu.device();
        let format = self.gpu.surface_format();
        let samples = self.config.sample_count();
        for program in self.programs.values_mut() {
            program.pipeline = create_pipeline(
                device,
                format,
                samples,
                &program.interface,
                &program.layout,
                &program.vertex,
                &program.fragment,
            );
        }
    }
}

impl Device for WgpuDevice {
    fn configure(&mut self, config: &SurfaceConfig) {
        let resample = config.sample_count() != self.config.sample_count();
        self.config = *config;
        self.gpu.apply_surface_config(config);
        if config.depth || config.stencil {
            log::debug!("depth/stencil requested; elements are coplanar, drawing in order");
        }
        if resample {
            self.multisample = None;
            self.rebuild_pipelines();
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.gpu.resize(PhysicalSize::new(width, height));
    }

    fn create_buffer(&mut self, label: &str) -> BufferHandle {
        let id = self.ids.next();
        self.buffers.insert(
            id,
            GpuBuffer { label: label.to_string(), raw: None, capacity: 0, len: 0 },
        );
        BufferHandle(id)
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), DeviceError> {
        let device = self.gpu.device();
        let slot = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| DeviceError::unknown("buffer", buffer.0))?;

        let bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = bytes.len() as u64;
        if slot.raw.is_none() || slot.capacity < needed {
            let capacity = needed.next_power_of_two().max(64);
            slot.raw = Some(device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(slot.label.as_str()),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            slot.capacity = capacity;
        }
        if let Some(raw) = &slot.raw {
            if !bytes.is_empty() {
                self.gpu.queue().write_buffer(raw, 0, bytes);
            }
        }
        slot.len = needed;
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderHandle, DeviceError> {
        let interface = reflect::compile(stage, source)?;
        let module = self.gpu.device().create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(match stage {
                ShaderStage::Vertex => "easel vertex shader",
                ShaderStage::Fragment => "easel fragment shader",
            }),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let id = self.ids.next();
        self.shaders.insert(id, GpuShader { interface, module: Rc::new(module) });
        Ok(ShaderHandle(id))
    }

    fn release_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader.0);
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, DeviceError> {
        let vs = self
            .shaders
            .get(&vertex.0)
            .ok_or_else(|| DeviceError::unknown("shader", vertex.0))?;
        let fs = self
            .shaders
            .get(&fragment.0)
            .ok_or_else(|| DeviceError::unknown("shader", fragment.0))?;
        let interface = reflect::link(&vs.interface, &fs.interface)?;

        let device = self.gpu.device();
        let layout = create_bind_group_layout(device, &interface)?;
        let pipeline = create_pipeline(
            device,
            self.gpu.surface_format(),
            self.config.sample_count(),
            &interface,
            &layout,
            &vs.module,
            &fs.module,
        );

        let id = self.ids.next();
        let program = GpuProgram {
            block: vec![0u8; interface.block_size() as usize],
            vertex: Rc::clone(&vs.module),
            fragment: Rc::clone(&fs.module),
            interface,
            layout,
            pipeline,
            attributes: BTreeMap::new(),
            textures: BTreeMap::new(),
        };
        self.programs.insert(id, program);
        Ok(ProgramHandle(id))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
        self.bind_groups.retain(|key, _| key.program != program.0);
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs.get(&program.0)?.interface.attribute_location(name)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program.0)?.interface.uniform_location(name)
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), DeviceError> {
        if !self.programs.contains_key(&program.0) {
            return Err(DeviceError::unknown("program", program.0));
        }
        self.current = Some(program);
        Ok(())
    }

    fn set_uniform(
        &mut self,
        location: UniformLocation,
        value: UniformValue,
    ) -> Result<(), DeviceError> {
        write_uniform(&mut self.current_program()?.block, location, value)
    }

    fn bind_attribute(&mut self, location: u32, buffer: BufferHandle) -> Result<(), DeviceError> {
        if !self.buffers.contains_key(&buffer.0) {
            return Err(DeviceError::unknown("buffer", buffer.0));
        }
        self.current_program()?.attributes.insert(location, buffer);
        Ok(())
    }

    fn bind_texture(
        &mut self,
        location: UniformLocation,
        texture: TextureHandle,
    ) -> Result<(), DeviceError> {
        if !self.textures.contains_key(&texture.0) {
            return Err(DeviceError::unknown("texture", texture.0));
        }
        let UniformLocation::Binding(binding) = location else {
            return Err(DeviceError::UniformMismatch(format!(
                "{location:?} is not a texture binding"
            )));
        };
        self.current_program()?.textures.insert(binding, texture);
        Ok(())
    }

    fn create_texture(&mut self, params: TextureParams) -> TextureHandle {
        let placeholder = Pixels::transparent_placeholder();
        let (raw, view) = self.alloc_texture(1, 1);
        self.write_texels(&raw, &placeholder);

        self.texture_versions += 1;
        let id = self.ids.next();
        self.textures.insert(
            id,
            GpuTexture { params, raw, view, size: (1, 1), version: self.texture_versions },
        );
        TextureHandle(id)
    }

    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        pixels: &Pixels,
    ) -> Result<(), DeviceError> {
        let size = (pixels.width(), pixels.height());
        let (current, old_version) = self
            .textures
            .get(&texture.0)
            .map(|t| (t.size, t.version))
            .ok_or_else(|| DeviceError::unknown("texture", texture.0))?;

        if current != size {
            let (raw, view) = self.alloc_texture(size.0, size.1);
            self.texture_versions += 1;
            let version = self.texture_versions;
            if let Some(entry) = self.textures.get_mut(&texture.0) {
                entry.raw = raw;
                entry.view = view;
                entry.size = size;
                entry.version = version;
            }
            evict_texture_binds(&mut self.bind_groups, texture.0, Some(old_version));
        }

        if let Some(entry) = self.textures.get(&texture.0) {
            self.write_texels(&entry.raw, pixels);
        }
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
        evict_texture_binds(&mut self.bind_groups, texture.0, None);
    }

    fn begin_frame(&mut self) -> Result<(), DeviceError> {
        self.frame_uniforms.clear();
        self.frame = Some(Vec::new());
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32) -> Result<(), DeviceError> {
        let handle = self.current.ok_or(DeviceError::NoProgramBound)?;
        if self.frame.is_none() {
            return Err(DeviceError::NoFrame);
        }
        let program = self
            .programs
            .get(&handle.0)
            .ok_or_else(|| DeviceError::unknown("program", handle.0))?;

        for loc in program.interface.attribute_slots() {
            let buffer = program
                .attributes
                .get(&loc)
                .ok_or(DeviceError::MissingAttribute(loc))?;
            let data = self
                .buffers
                .get(&buffer.0)
                .ok_or_else(|| DeviceError::unknown("buffer", buffer.0))?;
            if data.len < u64::from(vertex_count) * ATTRIBUTE_STRIDE {
                return Err(DeviceError::MissingAttribute(loc));
            }
        }

        let mut texture = None;
        for binding in program.interface.resources_of(ResourceKind::Texture) {
            let bound = *program
                .textures
                .get(&binding)
                .ok_or(DeviceError::MissingTexture(binding))?;
            if !self.textures.contains_key(&bound.0) {
                return Err(DeviceError::unknown("texture", bound.0));
            }
            texture = Some(bound);
        }

        let align = self.gpu.device().limits().min_uniform_buffer_offset_alignment as usize;
        let uniform_offset = self.frame_uniforms.len().next_multiple_of(align.max(1));
        self.frame_uniforms.resize(uniform_offset, 0);
        self.frame_uniforms.extend_from_slice(&program.block);

        let pending = PendingDraw {
            program: handle,
            vertex_count,
            uniform_offset: uniform_offset as u32,
            texture,
        };
        if let Some(frame) = self.frame.as_mut() {
            frame.push(pending);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameOutcome, DeviceError> {
        let draws = self.frame.take().ok_or(DeviceError::NoFrame)?;

        self.ensure_uniform_capacity(self.frame_uniforms.len() as u64);
        if let Some((buffer, _)) = &self.uniform_buffer {
            if !self.frame_uniforms.is_empty() {
                self.gpu.queue().write_buffer(buffer, 0, &self.frame_uniforms);
            }
        }

        let mut keys = Vec::with_capacity(draws.len());
        for draw in &draws {
            keys.push(self.ensure_bind_group(draw)?);
        }
        self.ensure_multisample();

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        Err(DeviceError::Surface("surface out of memory".into()))
                    }
                    action => {
                        log::debug!("frame skipped: {action:?}");
                        Ok(FrameOutcome::Skipped)
                    }
                };
            }
        };

        {
            let (view, resolve_target) = match &self.multisample {
                Some(ms) => (&ms.view, Some(&frame.view)),
                None => (&frame.view, None),
            };
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("easel scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (draw, key) in draws.iter().zip(&keys) {
                let (Some(program), Some(group)) =
                    (self.programs.get(&draw.program.0), self.bind_groups.get(key))
                else {
                    continue;
                };
                pass.set_pipeline(&program.pipeline);
                if program.interface.block.is_some() {
                    pass.set_bind_group(0, group, &[draw.uniform_offset]);
                } else {
                    pass.set_bind_group(0, group, &[]);
                }
                for (slot, loc) in program.interface.attribute_slots().into_iter().enumerate() {
                    let buffer = program
                        .attributes
                        .get(&loc)
                        .and_then(|b| self.buffers.get(&b.0))
                        .and_then(|b| b.raw.as_ref().map(|raw| (raw, b.len)));
                    if let Some((raw, len)) = buffer {
                        pass.set_vertex_buffer(slot as u32, raw.slice(..len));
                    }
                }
                pass.draw(0..draw.vertex_count, 0..1);
            }
        }

        self.gpu.submit(frame);
        Ok(FrameOutcome::Presented)
    }
}

fn create_bind_group_layout(
    device: &wgpu::Device,
    interface: &ProgramInterface,
) -> Result<wgpu::BindGroupLayout, DeviceError> {
    let mut entries = Vec::new();
    if let Some(block) = &interface.block {
        if block.group != 0 || block.binding != UNIFORM_BINDING {
            return Err(DeviceError::Link(format!(
                "uniform block must live at @group(0) @binding({UNIFORM_BINDING})"
            )));
        }
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: block.binding,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(u64::from(block.size)),
            },
            count: None,
        });
    }
    for (name, slot) in &interface.resources {
        if slot.group != 0 {
            return Err(DeviceError::Link(format!("`{name}` must be bound in @group(0)")));
        }
        let ty = match slot.kind {
            ResourceKind::Texture => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            ResourceKind::Sampler => {
                wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
            }
        };
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot.binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty,
            count: None,
        });
    }

    Ok(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("easel program bgl"),
        entries: &entries,
    }))
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    sample_count: u32,
    interface: &ProgramInterface,
    layout: &wgpu::BindGroupLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = interface
        .attribute_slots()
        .into_iter()
        .map(|loc| {
            [wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: loc,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attributes
        .iter()
        .map(|attrs| wgpu::VertexBufferLayout {
            array_stride: ATTRIBUTE_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("easel pipeline layout"),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("easel element pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some(interface.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some(interface.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    })
}

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(program: u32, texture: Option<(u32, u64)>) -> BindKey {
        BindKey { program, texture, uniforms: 0 }
    }

    #[test]
    fn reallocation_evicts_only_the_old_allocation() {
        let mut groups: HashMap<BindKey, ()> = HashMap::new();
        groups.insert(key(1, Some((7, 1))), ());
        groups.insert(key(2, Some((7, 1))), ());
        groups.insert(key(1, Some((7, 2))), ());
        groups.insert(key(1, Some((8, 1))), ());
        groups.insert(key(3, None), ());

        evict_texture_binds(&mut groups, 7, Some(1));

        let mut left: Vec<_> = groups.keys().map(|k| (k.program, k.texture)).collect();
        left.sort();
        assert_eq!(left, vec![(1, Some((7, 2))), (1, Some((8, 1))), (3, None)]);
    }

    #[test]
    fn release_evicts_every_allocation_of_the_texture() {
        let mut groups: HashMap<BindKey, ()> = HashMap::new();
        groups.insert(key(1, Some((7, 1))), ());
        groups.insert(key(1, Some((7, 2))), ());
        groups.insert(key(1, Some((8, 3))), ());

        evict_texture_binds(&mut groups, 7, None);

        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key(&key(1, Some((8, 3)))));
    }

    #[test]
    fn repeated_resizes_keep_one_group_per_program() {
        let mut groups: HashMap<BindKey, ()> = HashMap::new();
        for version in 1..=50 {
            if version > 1 {
                evict_texture_binds(&mut groups, 4, Some(version - 1));
            }
            groups.insert(key(9, Some((4, version))), ());
        }
        assert_eq!(groups.len(), 1);
    }
}
