use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use winit::dpi::LogicalSize;

use lumen_engine::device::GpuInit;
use lumen_engine::host::{mount, GpuHost, HostOptions, VertexBinding};
use lumen_engine::logging::{init_logging, LoggingConfig};
use lumen_engine::render::recording::RecordingDevice;
use lumen_engine::window::{Runtime, RuntimeConfig};
use lumen_markup::SceneDocument;

mod app;

use app::StudioApp;

const TRIANGLE: &str = include_str!("../scenes/triangle.lsm");

/// Renders a Lumen scene (`.lsm`) in a window.
#[derive(Debug, Parser)]
#[command(name = "lumen-studio", version)]
struct Args {
    /// Scene to render. Defaults to the bundled triangle.
    scene: Option<PathBuf>,

    /// Mount against a recording device and print the GPU calls instead of
    /// opening a window.
    #[arg(long)]
    headless: bool,

    /// Bind every vertex buffer of a mesh at its own slot instead of only the first.
    #[arg(long)]
    all_slots: bool,

    /// Background color as `r,g,b,a` in 0..=1.
    #[arg(long, value_name = "RGBA", value_parser = parse_color)]
    clear: Option<wgpu::Color>,

    /// Log filter in `env_logger` syntax; overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig { env_filter: args.log.clone(), ..LoggingConfig::default() });

    let (name, source) = match &args.scene {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read scene {}", path.display()))?;
            (path.display().to_string(), source)
        }
        None => ("triangle.lsm".to_string(), TRIANGLE.to_string()),
    };
    let doc = lumen_markup::parse_str(&source).with_context(|| format!("failed to parse {name}"))?;

    let mut options = HostOptions::default();
    if args.all_slots {
        options.vertex_binding = VertexBinding::AllSlots;
    }
    if let Some(clear) = args.clear {
        options.clear_color = clear;
    }

    if args.headless {
        return run_headless(&name, &doc, options);
    }

    let config = RuntimeConfig {
        title: format!("lumen studio - {name}"),
        initial_size: LogicalSize::new(960.0, 720.0),
    };
    Runtime::run(config, GpuInit::default(), StudioApp::new(name, doc, options))
}

fn run_headless(name: &str, doc: &SceneDocument, options: HostOptions) -> Result<()> {
    let ctx = Rc::new(RecordingDevice::default());
    let host = GpuHost::new(ctx.clone(), options, tracing::info_span!("scene", scene = name));
    let scene = mount(&host, &ctx, doc).with_context(|| format!("failed to mount {name}"))?;

    for event in ctx.take_events() {
        println!("{event:?}");
    }
    log::info!("{name}: {} instance(s) mounted and committed", scene.len());
    Ok(())
}

fn parse_color(s: &str) -> Result<wgpu::Color, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match parts[..] {
        [r, g, b, a] if parts.iter().all(|c| (0.0..=1.0).contains(c)) => Ok(wgpu::Color { r, g, b, a }),
        [_, _, _, _] => Err("components must be within 0..=1".to_string()),
        _ => Err(format!("expected 4 components, got {}", parts.len())),
    }
}
