use super::{linear_to_srgb_u8, Exporter, ToneMap};
use crate::raytracer::error::Result;
use crate::raytracer::framebuffer::FinalResult;
use image::{ImageBuffer, Rgb};
use std::path::Path;

/// Tone-mapped 8-bit companion image of the final result.
pub struct PngExporter {
    tonemap: ToneMap,
    exposure: f32,
}

impl PngExporter {
    pub fn with_tonemap(tonemap: ToneMap) -> Self {
        Self {
            tonemap,
            exposure: 1.0,
        }
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }
}

impl Exporter for PngExporter {
    fn export(&self, result: &FinalResult, path: &Path) -> Result<()> {
        let img = ImageBuffer::from_fn(result.width() as u32, result.height() as u32, |x, y| {
            let color = result.pixel(y as usize, x as usize).as_vec3();
            let mapped = self.tonemap.apply_with_exposure(color, self.exposure);
            Rgb(linear_to_srgb_u8(mapped))
        });
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracer::color::Radiance;
    use tempfile::tempdir;

    #[test]
    fn writes_top_row_first() {
        let result = FinalResult::new(2, 1, 1, vec![Radiance::ONE, Radiance::ZERO]).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        PngExporter::with_tonemap(ToneMap::None).export(&result, &path).unwrap();

        let img = image::open(&path).unwrap().into_rgb8();
        assert_eq!(img.dimensions(), (1, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(0, 1), &Rgb([0, 0, 0]));
    }
}
