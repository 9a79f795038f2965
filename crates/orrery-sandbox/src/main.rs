mod layer;

use anyhow::{Context, Result};
use clap::Parser;
use orrery_engine::app::{Application, ApplicationConfig};
use orrery_engine::logging::LoggingConfig;
use orrery_engine::renderer::RendererApi;

use crate::layer::SandboxLayer;

/// Orrery sandbox: a camera-driven demo scene.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Renderer backend: `wgpu`, `headless` or `none`. Defaults to
    /// `ORRERY_RENDERER`, then `wgpu`.
    #[arg(long)]
    renderer: Option<String>,

    /// Stop after this many frames instead of waiting for the window to
    /// close.
    #[arg(long)]
    frames: Option<u64>,

    /// Window width in logical pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Log filter in `env_logger` syntax, e.g. `debug` or
    /// `orrery_engine=trace`.
    #[arg(long)]
    log: Option<String>,
}

fn renderer_api(arg: Option<&str>) -> Result<RendererApi> {
    if let Some(name) = arg {
        return Ok(name.parse()?);
    }
    Ok(RendererApi::from_env()?.unwrap_or_default())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::default();
    if let Some(filter) = &args.log {
        logging = logging.with_filter(filter);
    }

    let renderer = renderer_api(args.renderer.as_deref()).context("invalid renderer selection")?;
    let config = ApplicationConfig::default()
        .with_title("Orrery Sandbox")
        .with_size(args.width, args.height)
        .with_renderer(renderer)
        .with_logging(logging);

    let mut app = Application::new(config).context("failed to start the application")?;
    let size = (app.window().width(), app.window().height());
    let sandbox = SandboxLayer::new(app.render_context(), size)?;
    app.push_layer(sandbox)?;

    match args.frames {
        Some(frames) => {
            let mut ran = 0;
            while ran < frames && app.is_running() {
                app.run_frame()?;
                ran += 1;
            }
            log::info!("stopped after {ran} frame(s)");
        }
        None => app.run()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse() {
        let args = Args::try_parse_from([
            "orrery-sandbox",
            "--renderer",
            "headless",
            "--frames",
            "3",
            "--width",
            "640",
        ])
        .unwrap();

        assert_eq!(args.frames, Some(3));
        assert_eq!((args.width, args.height), (640, 720));
        assert_eq!(renderer_api(args.renderer.as_deref()).unwrap(), RendererApi::Headless);
    }

    #[test]
    fn unknown_renderer_is_rejected() {
        assert!(renderer_api(Some("vulkan")).is_err());
    }
}
