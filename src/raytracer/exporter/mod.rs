mod png;
mod radiance;
mod tonemapping;
mod window;

pub use png::PngExporter;
pub use radiance::{read_radiance_file, RadianceExporter};
pub use tonemapping::{linear_to_srgb_u8, ToneMap};
pub use window::WindowExporter;

use crate::raytracer::error::Result;
use crate::raytracer::framebuffer::FinalResult;
use std::path::Path;

pub trait Exporter {
    fn export(&self, result: &FinalResult, path: &Path) -> Result<()>;
}
