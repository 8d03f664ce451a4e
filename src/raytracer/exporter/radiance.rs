//! Plain-text radiance map.
//!
//! ```text
//! PF3
//! <width> <height>
//! <samples per pixel>
//! <r> <g> <b>        one line per pixel, row-major, top row first
//! ```
//!
//! Values use Rust's shortest round-trip float formatting, so reading a file
//! back yields bit-identical radiance.

use super::Exporter;
use crate::raytracer::color::Radiance;
use crate::raytracer::error::{Error, Result};
use crate::raytracer::framebuffer::FinalResult;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const MAGIC: &str = "PF3";

#[derive(Clone, Copy, Default)]
pub struct RadianceExporter;

impl Exporter for RadianceExporter {
    fn export(&self, result: &FinalResult, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{MAGIC}")?;
        writeln!(out, "{} {}", result.width(), result.height())?;
        writeln!(out, "{}", result.samples_per_pixel())?;
        for pixel in result.pixels() {
            writeln!(out, "{:?} {:?} {:?}", pixel.x, pixel.y, pixel.z)?;
        }
        out.flush()?;
        Ok(())
    }
}

pub fn read_radiance_file(path: &Path) -> Result<FinalResult> {
    let text = fs::read_to_string(path)?;
    let parse_error = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut tokens = text.split_whitespace();
    let mut next = |what: &str| {
        tokens
            .next()
            .ok_or_else(|| parse_error(format!("unexpected end of file reading {what}")))
    };

    let magic = next("magic")?;
    if magic != MAGIC {
        return Err(parse_error(format!("bad magic {magic:?}")));
    }

    let width: usize = next("width")?
        .parse()
        .map_err(|e| parse_error(format!("width: {e}")))?;
    let height: usize = next("height")?
        .parse()
        .map_err(|e| parse_error(format!("height: {e}")))?;
    let spp: u32 = next("samples per pixel")?
        .parse()
        .map_err(|e| parse_error(format!("samples per pixel: {e}")))?;

    let count = width
        .checked_mul(height)
        .ok_or_else(|| parse_error(format!("image size {width}x{height} overflows")))?;
    // Sizes come from the file; do not reserve from them.
    let mut pixels = Vec::new();
    for idx in 0..count {
        let mut channel = || -> Result<f64> {
            next("pixel")?
                .parse()
                .map_err(|e| parse_error(format!("pixel {idx}: {e}")))
        };
        let r = channel()?;
        let g = channel()?;
        let b = channel()?;
        pixels.push(Radiance::new(r, g, b));
    }

    if next("trailing data").is_ok() {
        return Err(parse_error("trailing data after last pixel".to_string()));
    }

    FinalResult::new(height, width, spp, pixels)
}
