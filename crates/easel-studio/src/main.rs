use anyhow::{Context, Result};

use easel_engine::core::{App, AppControl, FrameCtx};
use easel_engine::device::{GpuInit, WgpuDevice};
use easel_engine::logging::{init_logging, LoggingConfig};
use easel_engine::paint::pack_rgb;
use easel_engine::window::{Runtime, RuntimeConfig};
use easel_engine::{ElementId, Renderer, StyleOverrides};

/// Degrees per second for the spinning tile.
const SPIN_SPEED: f32 = 45.0;

struct Studio {
    image: Option<String>,
    spinner: Option<ElementId>,
    pulse: Option<ElementId>,
}

impl App for Studio {
    fn setup(&mut self, renderer: &mut Renderer<WgpuDevice>) -> Result<()> {
        renderer
            .create_element(
                "backdrop",
                StyleOverrides::new()
                    .position(40.0, 40.0)
                    .size(560.0, 400.0)
                    .background_color(pack_rgb(0x1E, 0x22, 0x2B)),
            )
            .context("failed to create backdrop")?;

        self.spinner = Some(
            renderer
                .create_element(
                    "spinner",
                    StyleOverrides::new()
                        .position(220.0, 140.0)
                        .size(120.0, 120.0)
                        .background_color(pack_rgb(0xE0, 0x6C, 0x3A)),
                )
                .context("failed to create spinner")?,
        );

        self.pulse = Some(
            renderer
                .create_element(
                    "pulse",
                    StyleOverrides::new()
                        .position(80.0, 320.0)
                        .size(60.0, 60.0)
                        .background_color(pack_rgb(0x4C, 0xAF, 0x7D)),
                )
                .context("failed to create pulse")?,
        );

        if let Some(path) = self.image.as_deref() {
            let overrides = StyleOverrides::new()
                .position(380.0, 80.0)
                .size(180.0, 180.0)
                .background_image(path);
            renderer
                .create_element("picture", overrides)
                .with_context(|| format!("failed to create picture for `{path}`"))?;
            log::info!("loading `{path}`");
        }

        log::info!("scene ready with {} elements", renderer.len());
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        let t = ctx.time.elapsed;

        if let Some(id) = self.spinner {
            if let Ok(style) = ctx.renderer.style_mut(id) {
                style.set_rotation((t * SPIN_SPEED) % 360.0);
            }
        }

        if let Some(id) = self.pulse {
            if let Ok(style) = ctx.renderer.style_mut(id) {
                let s = 1.0 + 0.25 * (t * 2.0).sin();
                style.set_scale([s, s]);
            }
        }

        AppControl::Continue
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let image = std::env::args().nth(1);
    let studio = Studio {
        image,
        spinner: None,
        pulse: None,
    };

    let config = RuntimeConfig {
        title: "easel studio".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), studio)
}
