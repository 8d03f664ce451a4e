mod logging;

use clap::{Parser, ValueEnum};
use progressive_tracer::raytracer::exporter::ToneMap;
use progressive_tracer::raytracer::{App, RenderConfig};
use std::path::PathBuf;
use tracing::error;

#[derive(Clone, Copy, ValueEnum)]
enum ToneMapArg {
    Off,
    Aces,
    Reinhard,
}

impl From<ToneMapArg> for ToneMap {
    fn from(arg: ToneMapArg) -> Self {
        match arg {
            ToneMapArg::Off => ToneMap::None,
            ToneMapArg::Aces => ToneMap::Aces,
            ToneMapArg::Reinhard => ToneMap::Reinhard,
        }
    }
}

#[derive(Parser)]
#[command(name = "progressive-tracer")]
#[command(version, about = "Progressive ray tracer: Enter keeps the preview, Esc quits")]
struct Cli {
    /// Image width in pixels
    #[arg(long, default_value_t = 320)]
    width: usize,

    /// Image height in pixels
    #[arg(long, default_value_t = 180)]
    height: usize,

    /// Window pixels per image pixel
    #[arg(long, default_value_t = 3)]
    scale: usize,

    /// Sample budget of the preview pass
    #[arg(long, default_value_t = 16)]
    preview_spp: u32,

    /// Samples per pixel of the final pass
    #[arg(long, default_value_t = 64)]
    spp: u32,

    /// Radiance output file
    #[arg(short, long, value_name = "FILE", default_value = "result.pf3")]
    output: PathBuf,

    /// Also write a tone-mapped PNG
    #[arg(long, value_name = "FILE")]
    png: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "aces")]
    tonemap: ToneMapArg,

    #[arg(long, default_value_t = 1.0)]
    exposure: f32,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.debug);

    let config = RenderConfig {
        width: cli.width,
        height: cli.height,
        window_scale: cli.scale,
        preview_spp: cli.preview_spp,
        spp: cli.spp,
        output: cli.output,
        png_output: cli.png,
        tonemap: cli.tonemap.into(),
        exposure: cli.exposure,
    };

    let result = App::new(config).and_then(|mut app| app.run());
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
