//! Retained-mode scene driver.
//!
//! The [`Renderer`] owns the device, the bound [`Surface`], the element
//! [`Scene`] and the image loader. Callers create elements, mutate their
//! style between frames, and call [`Renderer::render_frame`] once per display
//! refresh (the window runtime does this for you).

mod load;
#[cfg(test)]
mod tests;

pub use load::{LoadState, LoadTicket};

use std::collections::{HashMap, VecDeque};

use crate::device::{Device, FrameOutcome, SurfaceConfig, TextureParams, UniformValue};
use crate::element::Element;
use crate::error::RenderError;
use crate::imaging::{ImageLoader, LoadId, LoadRequest, Pixels};
use crate::paint::Color;
use crate::program::{FillMode, Program};
use crate::scene::{ElementId, Scene};
use crate::style::{Style, StyleOverrides};
use crate::surface::{RenderTarget, Surface};
use crate::transform::{quad_positions, rotation_vector, QUAD_TEXCOORDS, QUAD_VERTEX_COUNT};

use load::LoadRecord;

/// Finished loads whose state stays queryable; older ones are forgotten.
const FINISHED_LOAD_HISTORY: usize = 64;

/// Whether the render loop has been started by a surface bind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// No surface bound yet; frames are no-ops.
    Idle,
    /// A surface is bound; every frame draws the scene.
    Running,
}

/// Per-frame counters.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub drawn: usize,
    /// Elements skipped because one of their resources was already released.
    pub skipped: usize,
    /// Whether the frame reached the screen.
    pub presented: bool,
}

pub struct Renderer<D: Device> {
    device: D,
    loader: Box<dyn ImageLoader>,
    surface_config: SurfaceConfig,
    surface: Option<Surface>,
    discoverable: Vec<Box<dyn RenderTarget>>,
    scene: Scene<Element>,
    loads: HashMap<LoadId, LoadRecord>,
    finished: VecDeque<LoadId>,
    next_load: u64,
    state: LoopState,
}

impl<D: Device> Renderer<D> {
    pub fn new(device: D, loader: Box<dyn ImageLoader>) -> Self {
        Self {
            device,
            loader,
            surface_config: SurfaceConfig::default(),
            surface: None,
            discoverable: Vec::new(),
            scene: Scene::new(),
            loads: HashMap::new(),
            finished: VecDeque::new(),
            next_load: 0,
            state: LoopState::Idle,
        }
    }

    /// Capability flags used by subsequent binds.
    pub fn set_surface_config(&mut self, config: SurfaceConfig) {
        self.surface_config = config;
    }

    /// Registers a target that `bind(None)` (and element creation) may pick up.
    pub fn offer_target(&mut self, target: Box<dyn RenderTarget>) {
        self.discoverable.push(target);
    }

    /// Binds `target`, or the first offered one when `None`.
    ///
    /// Replaces any previously bound surface and starts the render loop.
    pub fn bind(&mut self, target: Option<Box<dyn RenderTarget>>) -> Result<(), RenderError> {
        let target = match target {
            Some(target) => target,
            None if !self.discoverable.is_empty() => self.discoverable.remove(0),
            None => return Err(RenderError::NoRenderTargetAvailable),
        };

        if self.surface.is_some() {
            log::debug!("replacing bound surface");
        }
        let surface = Surface::bind(target, self.surface_config, &mut self.device);
        log::debug!("surface bound at {}x{}", surface.width(), surface.height());
        self.surface = Some(surface);
        self.state = LoopState::Running;
        Ok(())
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.surface.is_some()
    }

    #[inline]
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    #[inline]
    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    /// Re-reads the bound target's size. Call on every resize notification.
    pub fn resize(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(&mut self.device);
        }
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Creates an element at the end of the draw order.
    ///
    /// Binds the first offered target if no surface is bound yet.
    pub fn create_element(
        &mut self,
        name: &str,
        overrides: StyleOverrides,
    ) -> Result<ElementId, RenderError> {
        if self.surface.is_none() {
            self.bind(None)?;
        }
        let resolution = self.surface.as_ref().map_or((0, 0), Surface::size);

        let fill = FillMode::of(overrides.background_image.as_deref());
        let program = Program::build(&mut self.device, fill)?;
        let position_buffer = self.device.create_buffer(&format!("{name} positions"));

        let mut style = Style::default();
        style.apply(&overrides);

        let id = self
            .scene
            .insert(Element::new(name.to_string(), style, position_buffer, program, resolution));

        if let Some(uri) = overrides.background_image {
            if let Err(e) = self.set_background_image(id, Some(&uri)) {
                self.remove(id);
                return Err(e);
            }
        }

        if let Some(element) = self.scene.get(id) {
            let program = element.program();
            self.device.use_program(program.handle())?;
            self.device.set_uniform(
                program.uniforms().resolution,
                UniformValue::Vec2([resolution.0 as f32, resolution.1 as f32]),
            )?;
        }

        log::debug!("created element `{name}` as {id:?} ({fill:?})");
        Ok(id)
    }

    /// Removes the element and releases everything it owns.
    ///
    /// Returns `false` (and does nothing) if `id` was already removed.
    pub fn remove(&mut self, id: ElementId) -> bool {
        let Some(mut element) = self.scene.remove(id) else {
            return false;
        };
        if let Some(load) = element.set_load(None) {
            self.cancel_load(load);
        }
        log::debug!("removed element `{}` ({id:?})", element.name());
        element.release(&mut self.device);
        true
    }

    /// Sets or clears an element's background image.
    ///
    /// `Some(uri)` switches the element to the textured program (built before
    /// anything else changes), allocates its texture resources on first use,
    /// resets the texture to a transparent placeholder and starts loading
    /// `uri`. `None` cancels any pending load and switches back to the solid
    /// program; texture resources stay allocated until removal.
    pub fn set_background_image(
        &mut self,
        id: ElementId,
        uri: Option<&str>,
    ) -> Result<Option<LoadTicket>, RenderError> {
        let fill = FillMode::of(uri);
        let current = self
            .scene
            .get(id)
            .ok_or_else(|| RenderError::stale(format!("element {id:?}")))?
            .fill_mode();

        let rebuilt = if current != fill {
            Some(Program::build(&mut self.device, fill)?)
        } else {
            None
        };

        let Some(element) = self.scene.get_mut(id) else {
            return Err(RenderError::stale(format!("element {id:?}")));
        };

        if fill == FillMode::Textured && element.texture().is_none() {
            let texcoords = self.device.create_buffer(&format!("{} texcoords", element.name()));
            self.device.upload_buffer(texcoords, &QUAD_TEXCOORDS)?;
            let texture = self.device.create_texture(TextureParams::default());
            element.set_texture_resources(texcoords, texture);
        }

        if let Some(program) = rebuilt {
            let old = element.replace_program(program);
            log::debug!("element {id:?} program rebuilt {:?} -> {fill:?}", old.fill_mode());
            old.release(&mut self.device);
        }

        let previous = element.set_load(None);
        element.style_mut().set_background_image_uri(uri.map(str::to_string));

        let ticket = match uri {
            Some(uri) => {
                if let Some(texture) = element.texture() {
                    self.device.upload_texture(texture, &Pixels::transparent_placeholder())?;
                }
                let load = LoadId(self.next_load);
                self.next_load += 1;
                element.set_load(Some(load));
                self.loads.insert(load, LoadRecord { element: id, state: LoadState::Pending });
                self.loader.start(LoadRequest { id: load, uri: uri.to_string() });
                Some(LoadTicket { element: id, load })
            }
            None => None,
        };

        if let Some(load) = previous {
            self.cancel_load(load);
        }
        Ok(ticket)
    }

    /// State of a load started by [`set_background_image`](Self::set_background_image).
    ///
    /// `None` once the load has finished and dropped out of the recent
    /// history.
    pub fn load_state(&self, ticket: LoadTicket) -> Option<&LoadState> {
        self.loads.get(&ticket.load).map(|r| &r.state)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.scene.get(id)
    }

    pub fn style(&self, id: ElementId) -> Result<&Style, RenderError> {
        self.scene
            .get(id)
            .map(Element::style)
            .ok_or_else(|| RenderError::stale(format!("element {id:?}")))
    }

    /// Mutable style access. Writes take effect on the next frame.
    pub fn style_mut(&mut self, id: ElementId) -> Result<&mut Style, RenderError> {
        self.scene
            .get_mut(id)
            .map(Element::style_mut)
            .ok_or_else(|| RenderError::stale(format!("element {id:?}")))
    }

    /// Live elements in draw order.
    pub fn children(&self) -> impl Iterator<Item = (ElementId, &Element)> + '_ {
        self.scene.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.scene.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.scene.is_empty()
    }

    /// Draws every element once, in insertion order.
    ///
    /// A no-op while [`LoopState::Idle`]. Elements whose resources turn out to
    /// be released are skipped; any other failure aborts the frame.
    pub fn render_frame(&mut self) -> Result<FrameStats, RenderError> {
        let Some(resolution) = self.surface.as_ref().map(Surface::size) else {
            return Ok(FrameStats::default());
        };

        self.pump_loads()?;

        let mut stats = FrameStats::default();
        self.device.begin_frame()?;
        for id in self.scene.ids() {
            let Some(element) = self.scene.get(id) else { continue };
            match draw_element(&mut self.device, element, resolution) {
                Ok(()) => stats.drawn += 1,
                Err(e) if e.is_stale() => {
                    log::warn!("skipping element `{}`: {e}", element.name());
                    stats.skipped += 1;
                }
                Err(e) => {
                    log::error!("frame aborted at element `{}`: {e}", element.name());
                    return Err(e);
                }
            }
        }
        stats.presented = self.device.end_frame()? == FrameOutcome::Presented;
        Ok(stats)
    }

    fn cancel_load(&mut self, load: LoadId) {
        self.loader.cancel(load);
        self.finish_load(load, LoadState::Cancelled);
    }

    /// Moves a pending load to its final state and trims the history.
    fn finish_load(&mut self, load: LoadId, state: LoadState) {
        let Some(record) = self.loads.get_mut(&load) else { return };
        if record.state != LoadState::Pending {
            return;
        }
        record.state = state;
        self.finished.push_back(load);
        while self.finished.len() > FINISHED_LOAD_HISTORY {
            if let Some(oldest) = self.finished.pop_front() {
                self.loads.remove(&oldest);
            }
        }
    }

    /// Applies finished loads that still belong to a live element.
    ///
    /// A texture released behind the renderer's back drops the image; the
    /// element itself is skipped when drawn.
    fn pump_loads(&mut self) -> Result<(), RenderError> {
        for completion in self.loader.poll() {
            let id = completion.id;
            let owner = match self.loads.get(&id) {
                Some(record) if record.state == LoadState::Pending => record.element,
                _ => continue,
            };

            let state = match self.scene.get_mut(owner) {
                Some(element) if element.pending_load() == Some(id) => {
                    element.set_load(None);
                    match completion.result {
                        Ok(pixels) => {
                            let uploaded = match element.texture() {
                                Some(texture) => self
                                    .device
                                    .upload_texture(texture, &pixels)
                                    .map_err(RenderError::from),
                                None => Ok(()),
                            };
                            match uploaded {
                                Ok(()) => {
                                    log::debug!(
                                        "loaded {}x{} image into `{}`",
                                        pixels.width(),
                                        pixels.height(),
                                        element.name()
                                    );
                                    LoadState::Ready
                                }
                                Err(e) if e.is_stale() => {
                                    log::warn!("dropping image for `{}`: {e}", element.name());
                                    LoadState::Cancelled
                                }
                                Err(e) => return Err(e),
                            }
                        }
                        Err(err) => {
                            log::warn!("image for `{}` failed to load: {err}", element.name());
                            LoadState::Failed(err)
                        }
                    }
                }
                _ => LoadState::Cancelled,
            };
            self.finish_load(id, state);
        }
        Ok(())
    }
}

impl<D: Device> Drop for Renderer<D> {
    fn drop(&mut self) {
        for mut element in self.scene.drain() {
            if let Some(load) = element.set_load(None) {
                self.loader.cancel(load);
            }
            element.release(&mut self.device);
        }
    }
}

fn draw_element<D: Device>(
    device: &mut D,
    element: &Element,
    (width, height): (u32, u32),
) -> Result<(), RenderError> {
    let program = element.program();
    let style = element.style();
    let uniforms = program.uniforms();
    let attributes = program.attributes();

    device.use_program(program.handle())?;
    device.set_uniform(
        uniforms.resolution,
        UniformValue::Vec2([width as f32, height as f32]),
    )?;
    device.set_uniform(uniforms.translation, UniformValue::Vec2([style.left(), style.top()]))?;
    device.set_uniform(uniforms.rotation, UniformValue::Vec2(rotation_vector(style.rotation())))?;
    device.set_uniform(uniforms.scale, UniformValue::Vec2(style.scale()))?;

    let positions = element.position_buffer();
    device.upload_buffer(positions, &quad_positions(style.width(), style.height()))?;
    device.bind_attribute(attributes.position, positions)?;

    match program.fill_mode() {
        FillMode::Textured => {
            let (Some(texture), Some(texcoords), Some(unit), Some(texcoord_loc)) = (
                element.texture(),
                element.texcoord_buffer(),
                uniforms.texture,
                attributes.texcoord,
            ) else {
                return Err(RenderError::stale(format!(
                    "texture resources of `{}`",
                    element.name()
                )));
            };
            device.bind_texture(unit, texture)?;
            device.bind_attribute(texcoord_loc, texcoords)?;
        }
        FillMode::SolidColor => {
            if let Some(color) = uniforms.background_color {
                let rgba = Color::from_packed_rgb(style.background_color()).to_array();
                device.set_uniform(color, UniformValue::Vec4(rgba))?;
            }
        }
    }

    device.draw(QUAD_VERTEX_COUNT)?;
    Ok(())
}
