use std::io::Cursor;

use super::*;
use crate::coords::Vec2;
use crate::device::{DrawCall, HeadlessDevice};
use crate::imaging::{LoadError, ManualLoader};
use crate::surface::SharedTarget;
use crate::transform::Transform;

fn bound(width: u32, height: u32) -> (Renderer<HeadlessDevice>, ManualLoader, SharedTarget) {
    let loader = ManualLoader::new();
    let mut renderer = Renderer::new(HeadlessDevice::new(), Box::new(loader.clone()));
    let target = SharedTarget::new(width, height);
    renderer.bind(Some(Box::new(target.clone()))).unwrap();
    (renderer, loader, target)
}

fn png_2x2() -> Pixels {
    let mut img = image::RgbaImage::new(2, 2);
    img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
    img.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
    img.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
    img.put_pixel(1, 1, image::Rgba([255, 255, 255, 128]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    Pixels::decode(bytes.get_ref()).unwrap()
}

fn vec2(values: &[f32]) -> Vec2 {
    Vec2::new(values[0], values[1])
}

/// Projects every recorded vertex back into target pixels.
fn target_corners(call: &DrawCall) -> Vec<Vec2> {
    let resolution = vec2(call.uniform("u_resolution").unwrap());
    let t = Transform {
        resolution,
        translation: vec2(call.uniform("u_translation").unwrap()),
        rotation: vec2(call.uniform("u_rotation").unwrap()),
        scale: vec2(call.uniform("u_scale").unwrap()),
    };
    call.positions()
        .into_iter()
        .map(|p| Transform::clip_to_target(t.to_clip(Vec2::from(p)), resolution))
        .collect()
}

fn has_corner(corners: &[Vec2], x: f32, y: f32) -> bool {
    corners
        .iter()
        .any(|c| (c.x - x).abs() < 1e-3 && (c.y - y).abs() < 1e-3)
}

#[test]
fn solid_rect_end_to_end() {
    let (mut r, _, _) = bound(800, 600);
    r.create_element(
        "box",
        StyleOverrides::new()
            .position(10.0, 20.0)
            .size(100.0, 50.0)
            .background_color(0xFF0000),
    )
    .unwrap();

    let stats = r.render_frame().unwrap();
    assert_eq!(stats, FrameStats { drawn: 1, skipped: 0, presented: true });

    let frame = r.device().last_frame().unwrap();
    assert_eq!(frame.len(), 1);
    let call = &frame[0];
    assert_eq!(call.vertex_count, 6);
    assert_eq!(call.uniform("u_resolution").unwrap(), &[800.0, 600.0]);
    assert_eq!(call.uniform("u_background_color").unwrap(), &[1.0, 0.0, 0.0, 1.0]);
    assert!(call.texture.is_none());

    let corners = target_corners(call);
    assert_eq!(corners.len(), 6);
    for (x, y) in [(10.0, 20.0), (110.0, 20.0), (10.0, 70.0), (110.0, 70.0)] {
        assert!(has_corner(&corners, x, y), "missing corner ({x}, {y}) in {corners:?}");
    }
}

#[test]
fn geometry_writes_read_back_and_never_rebuild() {
    let (mut r, _, _) = bound(320, 240);
    let id = r.create_element("a", StyleOverrides::new()).unwrap();
    let linked = r.device().programs_linked();

    let style = r.style_mut(id).unwrap();
    style.set_left(5.0);
    style.set_top(6.0);
    style.set_width(7.0);
    style.set_height(8.0);
    style.set_rotation(45.0);
    style.set_scale([0.5, 2.0]);
    style.set_background_color(0x00FF00);

    let style = r.style(id).unwrap();
    assert_eq!(
        (style.left(), style.top(), style.width(), style.height()),
        (5.0, 6.0, 7.0, 8.0)
    );
    assert_eq!(style.rotation(), 45.0);
    assert_eq!(style.scale(), [0.5, 2.0]);
    assert_eq!(style.background_color(), 0x00FF00);

    r.render_frame().unwrap();
    assert_eq!(r.device().programs_linked(), linked);

    let call = &r.device().last_frame().unwrap()[0];
    assert_eq!(call.uniform("u_translation").unwrap(), &[5.0, 6.0]);
    assert_eq!(call.uniform("u_scale").unwrap(), &[0.5, 2.0]);
    assert_eq!(call.uniform("u_rotation").unwrap(), &rotation_vector(45.0));
    assert_eq!(call.uniform("u_background_color").unwrap(), &[0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn first_image_rebuilds_once_and_allocates_once() {
    let (mut r, loader, _) = bound(100, 100);
    let id = r.create_element("pic", StyleOverrides::new()).unwrap();

    let linked = r.device().programs_linked();
    let buffers = r.device().buffers_created();
    let textures = r.device().textures_created();

    let first = r.set_background_image(id, Some("a.png")).unwrap().unwrap();
    assert_eq!(r.device().programs_linked(), linked + 1);
    assert_eq!(r.device().buffers_created(), buffers + 1);
    assert_eq!(r.device().textures_created(), textures + 1);
    assert_eq!(r.element(id).unwrap().fill_mode(), FillMode::Textured);
    assert_eq!(r.style(id).unwrap().background_image(), Some("a.png"));
    // Old solid program released, new textured one live.
    assert_eq!(r.device().live_programs(), 1);

    let texcoords = r.element(id).unwrap().texcoord_buffer();
    assert_eq!(r.device().buffer_data(texcoords.unwrap()), Some(&QUAD_TEXCOORDS[..]));
    let texture = r.element(id).unwrap().texture().unwrap();
    assert_eq!(r.device().texture_params(texture), Some(TextureParams::default()));

    let uploads = r.device().texture_uploads();
    let second = r.set_background_image(id, Some("b.png")).unwrap().unwrap();
    assert_eq!(r.device().programs_linked(), linked + 1);
    assert_eq!(r.device().buffers_created(), buffers + 1);
    assert_eq!(r.device().textures_created(), textures + 1);
    assert_eq!(r.element(id).unwrap().texcoord_buffer(), texcoords);
    // The new image starts from a freshly uploaded placeholder.
    assert_eq!(r.device().texture_uploads(), uploads + 1);

    assert_eq!(r.load_state(first), Some(&LoadState::Cancelled));
    assert_eq!(r.load_state(second), Some(&LoadState::Pending));
    let uris: Vec<_> = loader.pending().into_iter().map(|p| p.uri).collect();
    assert_eq!(uris, vec!["b.png".to_string()]);
}

#[test]
fn placeholder_until_image_loads() {
    let (mut r, loader, _) = bound(64, 64);
    let id = r
        .create_element("pic", StyleOverrides::new().size(2.0, 2.0).background_image("tile.png"))
        .unwrap();
    assert_eq!(r.device().programs_linked(), 1);

    r.render_frame().unwrap();
    let (_, pixels) = r.device().last_frame().unwrap()[0].texture.clone().unwrap();
    assert_eq!((pixels.width(), pixels.height()), (1, 1));
    assert!(pixels.is_fully_transparent());

    let image = png_2x2();
    assert!(loader.resolve("tile.png", image.clone()));
    r.render_frame().unwrap();

    let call = &r.device().last_frame().unwrap()[0];
    let (texture, pixels) = call.texture.clone().unwrap();
    assert_eq!(Some(texture), r.element(id).unwrap().texture());
    assert_eq!(pixels, image);
    assert_eq!(&pixels.rgba()[12..], &[255, 255, 255, 128]);
    assert_eq!(call.attribute("a_texcoord").unwrap(), &QUAD_TEXCOORDS);
    assert_eq!(r.element(id).unwrap().pending_load(), None);
}

#[test]
fn new_image_resets_to_placeholder_and_ignores_superseded_load() {
    let (mut r, loader, _) = bound(64, 64);
    let id = r.create_element("pic", StyleOverrides::new()).unwrap();
    r.set_background_image(id, Some("one.png")).unwrap();
    loader.resolve("one.png", png_2x2());
    r.render_frame().unwrap();

    let ticket = r.set_background_image(id, Some("two.png")).unwrap().unwrap();
    r.render_frame().unwrap();
    let (_, pixels) = r.device().last_frame().unwrap()[0].texture.clone().unwrap();
    assert!(pixels.is_fully_transparent());

    assert!(!loader.resolve("one.png", png_2x2()));
    assert!(loader.fail("two.png", "unreachable"));
    r.render_frame().unwrap();
    assert_eq!(
        r.load_state(ticket),
        Some(&LoadState::Failed(LoadError::Io("unreachable".into())))
    );
    let (_, pixels) = r.device().last_frame().unwrap()[0].texture.clone().unwrap();
    assert!(pixels.is_fully_transparent());
}

#[test]
fn clearing_image_goes_back_to_solid_but_keeps_texture() {
    let (mut r, loader, _) = bound(64, 64);
    let id = r
        .create_element("pic", StyleOverrides::new().background_image("x.png"))
        .unwrap();
    let texture = r.element(id).unwrap().texture().unwrap();

    assert_eq!(r.set_background_image(id, None).unwrap(), None);
    assert_eq!(r.element(id).unwrap().fill_mode(), FillMode::SolidColor);
    assert_eq!(r.style(id).unwrap().background_image(), None);
    assert!(r.device().is_texture_alive(texture));
    assert!(loader.pending().is_empty());

    r.render_frame().unwrap();
    let call = &r.device().last_frame().unwrap()[0];
    assert!(call.texture.is_none());
    assert!(call.uniform("u_background_color").is_some());
}

#[test]
fn resize_reaches_every_element_next_frame() {
    let (mut r, _, target) = bound(800, 600);
    r.create_element("a", StyleOverrides::new()).unwrap();
    r.create_element("b", StyleOverrides::new().background_image("b.png")).unwrap();
    r.render_frame().unwrap();

    target.set_size(1024, 768);
    r.resize();
    assert_eq!(r.device().viewport(), (1024, 768));
    assert_eq!(r.surface().unwrap().size(), (1024, 768));

    r.render_frame().unwrap();
    for call in r.device().last_frame().unwrap() {
        assert_eq!(call.uniform("u_resolution").unwrap(), &[1024.0, 768.0]);
    }
}

#[test]
fn remove_is_by_identity_and_idempotent() {
    let (mut r, _, _) = bound(100, 100);
    let a = r.create_element("A", StyleOverrides::new().background_color(0xAA0000)).unwrap();
    let b = r.create_element("B", StyleOverrides::new().background_color(0x00BB00)).unwrap();
    let c = r.create_element("C", StyleOverrides::new().background_color(0x0000CC)).unwrap();

    assert!(r.remove(a));
    let names: Vec<_> = r.children().map(|(_, e)| e.name().to_string()).collect();
    assert_eq!(names, vec!["B", "C"]);

    assert!(!r.remove(a));
    assert_eq!(r.children().map(|(id, _)| id).collect::<Vec<_>>(), vec![b, c]);

    r.render_frame().unwrap();
    let colors: Vec<_> = r
        .device()
        .last_frame()
        .unwrap()
        .iter()
        .map(|call| call.uniform("u_background_color").unwrap()[1])
        .collect();
    assert_eq!(colors, vec![0xBB as f32 / 255.0, 0.0]);
}

#[test]
fn remove_releases_every_resource() {
    let (mut r, _, _) = bound(100, 100);
    let id = r
        .create_element("pic", StyleOverrides::new().background_image("p.png"))
        .unwrap();
    assert_eq!(r.device().live_buffers(), 2);
    assert_eq!(r.device().live_textures(), 1);
    assert_eq!(r.device().live_programs(), 1);
    let positions = r.element(id).unwrap().position_buffer();
    assert!(r.device().is_buffer_alive(positions));

    assert!(r.remove(id));
    assert!(!r.device().is_buffer_alive(positions));
    assert_eq!(r.device().live_buffers(), 0);
    assert_eq!(r.device().live_textures(), 0);
    assert_eq!(r.device().live_programs(), 0);
    assert_eq!(r.device().live_shaders(), 0);
    assert!(r.is_empty());
}

#[test]
fn removal_cancels_pending_load() {
    let (mut r, loader, _) = bound(100, 100);
    let id = r.create_element("pic", StyleOverrides::new()).unwrap();
    let ticket = r.set_background_image(id, Some("slow.png")).unwrap().unwrap();

    r.remove(id);
    assert_eq!(r.load_state(ticket), Some(&LoadState::Cancelled));
    assert_eq!(loader.cancelled(), vec![ticket.id()]);
    assert!(!loader.resolve("slow.png", png_2x2()));

    let stats = r.render_frame().unwrap();
    assert_eq!(stats.drawn, 0);
}

#[test]
fn stale_handles_are_reported() {
    let (mut r, _, _) = bound(100, 100);
    let id = r.create_element("gone", StyleOverrides::new()).unwrap();
    r.remove(id);

    assert!(r.style(id).unwrap_err().is_stale());
    assert!(r.style_mut(id).unwrap_err().is_stale());
    assert!(r.set_background_image(id, Some("x.png")).unwrap_err().is_stale());
}

#[test]
fn element_with_released_resources_is_skipped() {
    let (mut r, _, _) = bound(100, 100);
    let broken = r
        .create_element("broken", StyleOverrides::new().background_image("b.png"))
        .unwrap();
    r.create_element("fine", StyleOverrides::new()).unwrap();

    let texture = r.element(broken).unwrap().texture().unwrap();
    r.device_mut().release_texture(texture);

    let stats = r.render_frame().unwrap();
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(r.device().last_frame().unwrap().len(), 1);
}

#[test]
fn image_for_released_texture_is_dropped_without_failing_the_frame() {
    let (mut r, loader, _) = bound(100, 100);
    let broken = r.create_element("broken", StyleOverrides::new()).unwrap();
    let ticket = r.set_background_image(broken, Some("late.png")).unwrap().unwrap();
    r.create_element("fine", StyleOverrides::new().background_color(0x00FF00)).unwrap();

    let texture = r.element(broken).unwrap().texture().unwrap();
    r.device_mut().release_texture(texture);
    assert!(loader.resolve("late.png", png_2x2()));

    let stats = r.render_frame().unwrap();
    assert_eq!(stats.drawn, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(r.load_state(ticket), Some(&LoadState::Cancelled));
    let call = &r.device().last_frame().unwrap()[0];
    assert_eq!(call.uniform("u_background_color").unwrap(), &[0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn load_history_stays_bounded_under_churn() {
    let (mut r, loader, _) = bound(64, 64);
    let mut tickets = Vec::new();
    for i in 0..200 {
        let uri = format!("frame-{i}.png");
        let id = r.create_element("churn", StyleOverrides::new()).unwrap();
        tickets.push(r.set_background_image(id, Some(&uri)).unwrap().unwrap());
        assert!(loader.resolve(&uri, png_2x2()));
        r.render_frame().unwrap();
        assert!(r.remove(id));
    }

    assert!(r.is_empty());
    assert!(r.loads.len() <= FINISHED_LOAD_HISTORY);
    assert_eq!(r.load_state(tickets[0]), None);
    let last = r.load_state(*tickets.last().unwrap()).unwrap();
    assert_eq!(last, &LoadState::Ready);
    assert!(last.is_finished());
}

#[test]
fn pending_loads_survive_history_trimming() {
    let (mut r, _, _) = bound(64, 64);
    let keep = r.create_element("keep", StyleOverrides::new()).unwrap();
    let waiting = r.set_background_image(keep, Some("slow.png")).unwrap().unwrap();

    let other = r.create_element("other", StyleOverrides::new()).unwrap();
    for i in 0..(FINISHED_LOAD_HISTORY * 2) {
        r.set_background_image(other, Some(&format!("{i}.png"))).unwrap();
    }

    assert_eq!(r.load_state(waiting), Some(&LoadState::Pending));
    assert!(!r.load_state(waiting).unwrap().is_finished());
    assert!(r.loads.len() <= FINISHED_LOAD_HISTORY + 2);
}

#[test]
fn idle_until_bound() {
    let mut r = Renderer::new(HeadlessDevice::new(), Box::new(ManualLoader::new()));
    assert_eq!(r.loop_state(), LoopState::Idle);
    assert_eq!(r.render_frame().unwrap(), FrameStats::default());
    assert!(r.device().frames().is_empty());
}

#[test]
fn no_target_means_no_element() {
    let mut r = Renderer::new(HeadlessDevice::new(), Box::new(ManualLoader::new()));
    assert_eq!(
        r.create_element("x", StyleOverrides::new()),
        Err(RenderError::NoRenderTargetAvailable)
    );
    assert_eq!(r.bind(None), Err(RenderError::NoRenderTargetAvailable));
    assert!(r.is_empty());
    assert_eq!(r.device().live_buffers(), 0);
}

#[test]
fn creating_an_element_binds_the_offered_target() {
    let mut r = Renderer::new(HeadlessDevice::new(), Box::new(ManualLoader::new()));
    r.offer_target(Box::new(SharedTarget::new(640, 480)));

    let id = r.create_element("auto", StyleOverrides::new()).unwrap();
    assert_eq!(r.loop_state(), LoopState::Running);
    assert_eq!(r.device().config(), Some(&SurfaceConfig::default()));
    assert_eq!(r.device().viewport(), (640, 480));
    assert_eq!(r.element(id).unwrap().creation_resolution(), (640, 480));
}

#[test]
fn binding_again_replaces_the_surface() {
    let (mut r, _, old) = bound(100, 100);
    r.create_element("a", StyleOverrides::new()).unwrap();

    let new = SharedTarget::new(300, 200);
    r.bind(Some(Box::new(new.clone()))).unwrap();

    old.set_size(1, 1);
    r.resize();
    assert_eq!(r.surface().unwrap().size(), (300, 200));

    r.render_frame().unwrap();
    let call = &r.device().last_frame().unwrap()[0];
    assert_eq!(call.uniform("u_resolution").unwrap(), &[300.0, 200.0]);
}

#[test]
fn lost_frame_is_not_an_error() {
    let (mut r, _, _) = bound(100, 100);
    r.create_element("a", StyleOverrides::new()).unwrap();
    r.device_mut().lose_next_frame();

    let stats = r.render_frame().unwrap();
    assert_eq!(stats.drawn, 1);
    assert!(!stats.presented);
    assert!(r.render_frame().unwrap().presented);
}

#[test]
fn frames_are_idempotent() {
    let (mut r, _, _) = bound(200, 100);
    r.create_element("a", StyleOverrides::new().size(20.0, 10.0).rotation(30.0)).unwrap();
    r.render_frame().unwrap();
    r.render_frame().unwrap();

    let frames = r.device().frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0][0].uniforms, frames[1][0].uniforms);
    assert_eq!(frames[0][0].attributes, frames[1][0].attributes);
}

#[test]
fn dropping_the_renderer_cancels_loads() {
    let loader = ManualLoader::new();
    {
        let mut r = Renderer::new(HeadlessDevice::new(), Box::new(loader.clone()));
        r.bind(Some(Box::new(SharedTarget::new(10, 10)))).unwrap();
        r.create_element("pic", StyleOverrides::new().background_image("p.png")).unwrap();
    }
    assert_eq!(loader.cancelled().len(), 1);
    assert!(loader.pending().is_empty());
}
