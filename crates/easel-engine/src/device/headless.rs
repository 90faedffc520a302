use std::collections::{BTreeMap, HashMap};

use crate::imaging::Pixels;
use crate::program::reflect::{self, ProgramInterface, ResourceKind, ShaderInterface};

use super::{
    read_uniform, write_uniform, BufferHandle, Device, DeviceError, FrameOutcome, HandleAlloc,
    ProgramHandle, ShaderHandle, ShaderStage, SurfaceConfig, TextureHandle, TextureParams,
    UniformLocation, UniformValue,
};

/// One recorded `draw` with the state it was issued with.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub vertex_count: u32,
    /// Uniform block contents by member name.
    pub uniforms: BTreeMap<String, Vec<f32>>,
    /// Vertex data by attribute name.
    pub attributes: BTreeMap<String, Vec<f32>>,
    pub texture: Option<(TextureHandle, Pixels)>,
}

impl DrawCall {
    pub fn uniform(&self, name: &str) -> Option<&[f32]> {
        self.uniforms.get(name).map(Vec::as_slice)
    }

    pub fn attribute(&self, name: &str) -> Option<&[f32]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// The vertex positions (`a_position`) as `[x, y]` pairs.
    pub fn positions(&self) -> Vec<[f32; 2]> {
        self.attribute("a_position")
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|p| [p[0], p[1]])
            .collect()
    }
}

#[derive(Debug)]
struct ProgramEntry {
    interface: ProgramInterface,
    block: Vec<u8>,
    attributes: BTreeMap<u32, BufferHandle>,
    textures: BTreeMap<u32, TextureHandle>,
}

#[derive(Debug)]
struct TextureEntry {
    params: TextureParams,
    pixels: Pixels,
}

/// In-memory [`Device`]: validates every call like a GPU driver would and
/// records frames as lists of [`DrawCall`]s.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    ids: HandleAlloc,
    config: Option<SurfaceConfig>,
    viewport: (u32, u32),

    buffers: HashMap<u32, Vec<f32>>,
    shaders: HashMap<u32, ShaderInterface>,
    programs: HashMap<u32, ProgramEntry>,
    textures: HashMap<u32, TextureEntry>,
    current: Option<ProgramHandle>,

    frame: Option<Vec<DrawCall>>,
    frames: Vec<Vec<DrawCall>>,
    lose_next_frame: bool,

    buffers_created: usize,
    programs_linked: usize,
    textures_created: usize,
    texture_uploads: usize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SurfaceConfig> {
        self.config.as_ref()
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    pub fn programs_linked(&self) -> usize {
        self.programs_linked
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    pub fn texture_uploads(&self) -> usize {
        self.texture_uploads
    }

    pub fn is_buffer_alive(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer.0)
    }

    pub fn is_texture_alive(&self, texture: TextureHandle) -> bool {
        self.textures.contains_key(&texture.0)
    }

    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[f32]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    pub fn texture_pixels(&self, texture: TextureHandle) -> Option<&Pixels> {
        self.textures.get(&texture.0).map(|t| &t.pixels)
    }

    pub fn texture_params(&self, texture: TextureHandle) -> Option<TextureParams> {
        self.textures.get(&texture.0).map(|t| t.params)
    }

    /// Completed frames, oldest first.
    pub fn frames(&self) -> &[Vec<DrawCall>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[DrawCall]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Makes the next `end_frame` report [`FrameOutcome::Skipped`], as if the
    /// surface had been lost.
    pub fn lose_next_frame(&mut self) {
        self.lose_next_frame = true;
    }

    fn current_program(&mut self) -> Result<&mut ProgramEntry, DeviceError> {
        let handle = self.current.ok_or(DeviceError::NoProgramBound)?;
        self.programs
            .get_mut(&handle.0)
            .ok_or_else(|| DeviceError::unknown("program", handle.0))
    }

    fn record(&self, handle: ProgramHandle, vertex_count: u32) -> Result<DrawCall, DeviceError> {
        let entry = self
            .programs
            .get(&handle.0)
            .ok_or_else(|| DeviceError::unknown("program", handle.0))?;

        let mut attributes = BTreeMap::new();
        for (name, loc) in &entry.interface.attributes {
            let buffer = entry
                .attributes
                .get(loc)
                .ok_or(DeviceError::MissingAttribute(*loc))?;
            let data = self
                .buffers
                .get(&buffer.0)
                .ok_or_else(|| DeviceError::unknown("buffer", buffer.0))?;
            if data.len() < vertex_count as usize * 2 {
                return Err(DeviceError::MissingAttribute(*loc));
            }
            attributes.insert(name.clone(), data.clone());
        }

        let mut texture = None;
        for binding in entry.interface.resources_of(ResourceKind::Texture) {
            let handle = *entry
                .textures
                .get(&binding)
                .ok_or(DeviceError::MissingTexture(binding))?;
            let tex = self
                .textures
                .get(&handle.0)
                .ok_or_else(|| DeviceError::unknown("texture", handle.0))?;
            texture = Some((handle, tex.pixels.clone()));
        }

        let uniforms = entry
            .interface
            .block
            .iter()
            .flat_map(|b| b.members.iter())
            .filter_map(|(name, m)| {
                read_uniform(&entry.block, m.offset, m.size).map(|v| (name.clone(), v))
            })
            .collect();

        Ok(DrawCall {
            program: handle,
            vertex_count,
            uniforms,
            attributes,
            texture,
        })
    }
}

impl Device for HeadlessDevice {
    fn configure(&mut self, config: &SurfaceConfig) {
        self.config = Some(*config);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn create_buffer(&mut self, _label: &str) -> BufferHandle {
        let id = self.ids.next();
        self.buffers.insert(id, Vec::new());
        self.buffers_created += 1;
        BufferHandle(id)
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[f32]) -> Result<(), DeviceError> {
        let slot = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or_else(|| DeviceError::unknown("buffer", buffer.0))?;
        slot.clear();
        slot.extend_from_slice(data);
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
        let id = self.ids.next();
        self.shaders.insert(id, interface);
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
        let interface = reflect::link(vs, fs)?;

        let id = self.ids.next();
        let block = vec![0u8; interface.block_size() as usize];
        self.programs.insert(
            id,
            ProgramEntry {
                interface,
                block,
                attributes: BTreeMap::new(),
                textures: BTreeMap::new(),
            },
        );
        self.programs_linked += 1;
        Ok(ProgramHandle(id))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.0);
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
        let entry = self.current_program()?;
        write_uniform(&mut entry.block, location, value)
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
        let id = self.ids.next();
        self.textures.insert(
            id,
            TextureEntry {
                params,
                pixels: Pixels::transparent_placeholder(),
            },
        );
        self.textures_created += 1;
        TextureHandle(id)
    }

    fn upload_texture(
        &mut self,
        texture: TextureHandle,
        pixels: &Pixels,
    ) -> Result<(), DeviceError> {
        let entry = self
            .textures
            .get_mut(&texture.0)
            .ok_or_else(|| DeviceError::unknown("texture", texture.0))?;
        entry.pixels = pixels.clone();
        self.texture_uploads += 1;
        Ok(())
    }

    fn release_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }

    fn begin_frame(&mut self) -> Result<(), DeviceError> {
        self.frame = Some(Vec::new());
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32) -> Result<(), DeviceError> {
        let handle = self.current.ok_or(DeviceError::NoProgramBound)?;
        let call = self.record(handle, vertex_count)?;
        self.frame.as_mut().ok_or(DeviceError::NoFrame)?.push(call);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameOutcome, DeviceError> {
        let Some(draws) = self.frame.take() else {
            return Err(DeviceError::NoFrame);
        };
        if std::mem::take(&mut self.lose_next_frame) {
            log::debug!("headless frame dropped ({} draws)", draws.len());
            return Ok(FrameOutcome::Skipped);
        }
        self.frames.push(draws);
        Ok(FrameOutcome::Presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{sources, FillMode};

    fn solid_program(device: &mut HeadlessDevice) -> ProgramHandle {
        let src = sources::for_fill(FillMode::SolidColor);
        let vs = device.compile_shader(ShaderStage::Vertex, src.vertex).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, src.fragment).unwrap();
        device.link_program(vs, fs).unwrap()
    }

    #[test]
    fn draw_records_uniforms_and_vertices() {
        let mut device = HeadlessDevice::new();
        let program = solid_program(&mut device);
        let buffer = device.create_buffer("quad");
        device.upload_buffer(buffer, &[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]).unwrap();

        device.use_program(program).unwrap();
        let color = device.uniform_location(program, "u_background_color").unwrap();
        device.set_uniform(color, UniformValue::Vec4([1.0, 0.5, 0.0, 1.0])).unwrap();
        let pos = device.attribute_location(program, "a_position").unwrap();
        device.bind_attribute(pos, buffer).unwrap();

        device.begin_frame().unwrap();
        device.draw(3).unwrap();
        assert_eq!(device.end_frame().unwrap(), FrameOutcome::Presented);

        let call = &device.last_frame().unwrap()[0];
        assert_eq!(call.vertex_count, 3);
        assert_eq!(call.uniform("u_background_color").unwrap(), &[1.0, 0.5, 0.0, 1.0]);
        assert_eq!(call.positions(), vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn draw_without_attribute_buffer_fails() {
        let mut device = HeadlessDevice::new();
        let program = solid_program(&mut device);
        device.use_program(program).unwrap();
        device.begin_frame().unwrap();
        assert_eq!(device.draw(6), Err(DeviceError::MissingAttribute(0)));
    }

    #[test]
    fn released_handles_are_rejected() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer("gone");
        device.release_buffer(buffer);
        assert!(matches!(
            device.upload_buffer(buffer, &[1.0]),
            Err(DeviceError::UnknownHandle { kind: "buffer", .. })
        ));

        let program = solid_program(&mut device);
        device.release_program(program);
        assert!(matches!(
            device.use_program(program),
            Err(DeviceError::UnknownHandle { kind: "program", .. })
        ));
        assert_eq!(device.set_uniform(
            UniformLocation::Block { offset: 0, size: 8 },
            UniformValue::Vec2([0.0, 0.0]),
        ), Err(DeviceError::NoProgramBound));
    }

    #[test]
    fn lost_frame_is_skipped() {
        let mut device = HeadlessDevice::new();
        device.lose_next_frame();
        device.begin_frame().unwrap();
        assert_eq!(device.end_frame().unwrap(), FrameOutcome::Skipped);
        assert!(device.frames().is_empty());

        device.begin_frame().unwrap();
        assert_eq!(device.end_frame().unwrap(), FrameOutcome::Presented);
        assert_eq!(device.frames().len(), 1);
    }
}
