use super::{PixelSink, Producer, StopAction, StopSignal};
use crate::raytracer::camera::Camera;
use crate::raytracer::color::{DisplayColor, Radiance};
use crate::raytracer::error::{Error, Result};
use crate::raytracer::exporter::ToneMap;
use crate::raytracer::framebuffer::RadianceBuffer;
use crate::raytracer::renderer::sampling::Rng;
use crate::raytracer::renderer::{Renderer, SceneAccess, UnshadedRenderer};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct ProducerConfig {
    pub width: usize,
    pub height: usize,
    /// Sample budget of the preview pass.
    pub preview_spp: u32,
    /// Samples per pixel of the final pass.
    pub spp: u32,
    pub tonemap: ToneMap,
    pub exposure: f32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            preview_spp: 16,
            spp: 64,
            tonemap: ToneMap::Aces,
            exposure: 1.0,
        }
    }
}

/// Renders a scene with rayon, one pixel per task.
///
/// The preview starts with a single headlight-shaded pass so the whole image
/// appears at once, then accumulates path-traced samples in passes that
/// double in size until the preview budget is spent. The stop signal is
/// checked before every row.
pub struct ParallelProducer<S, R> {
    scene: S,
    camera: Camera,
    renderer: R,
    config: ProducerConfig,
}

impl<S, R> ParallelProducer<S, R>
where
    S: SceneAccess + Sync,
    R: Renderer + Sync,
{
    pub fn new(scene: S, camera: Camera, renderer: R, config: ProducerConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(Error::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }
        Ok(Self {
            scene,
            camera,
            renderer,
            config,
        })
    }

    fn sample_pixel<T: Renderer>(&self, renderer: &T, row: usize, col: usize, sample_index: u32) -> Radiance {
        let mut rng = Rng::for_sample(row, col, sample_index);
        let u = (col as f32 + rng.next()) / self.config.width as f32;
        let v = (row as f32 + rng.next()) / self.config.height as f32;
        let ray = self.camera.generate_ray(u, v);
        renderer.render(&ray, &self.scene, &mut rng).as_dvec3()
    }

    fn to_display(&self, color: Radiance) -> DisplayColor {
        DisplayColor::from_radiance(color, self.config.tonemap, self.config.exposure)
    }
}

impl<S, R> Producer for ParallelProducer<S, R>
where
    S: SceneAccess + Sync,
    R: Renderer + Sync,
{
    fn height(&self) -> usize {
        self.config.height
    }

    fn width(&self) -> usize {
        self.config.width
    }

    fn samples_per_pixel(&self) -> u32 {
        self.config.spp
    }

    fn evolving_render(
        &self,
        on_pixel: PixelSink<'_>,
        on_start: &mut dyn FnMut(Arc<RadianceBuffer>, StopAction),
    ) -> Result<()> {
        let width = self.config.width;
        let height = self.config.height;
        let working = Arc::new(RadianceBuffer::new(width, height));
        let stop = StopSignal::new();
        on_start(Arc::clone(&working), stop.action());

        (0..height).into_par_iter().for_each(|row| {
            if stop.is_stopped() {
                return;
            }
            for col in 0..width {
                let color = self.sample_pixel(&UnshadedRenderer, row, col, 0);
                working.set_pixel(row, col, color);
                on_pixel(row, col, self.to_display(color));
            }
        });

        let mut sums = vec![Radiance::ZERO; width * height];
        let mut done = 0u32;
        let mut batch = 1u32;
        while done < self.config.preview_spp && !stop.is_stopped() {
            let count = batch.min(self.config.preview_spp - done);
            let first = done;
            sums.par_chunks_mut(width).enumerate().for_each(|(row, row_sums)| {
                if stop.is_stopped() {
                    return;
                }
                for (col, sum) in row_sums.iter_mut().enumerate() {
                    for sample in first..first + count {
                        *sum += self.sample_pixel(&self.renderer, row, col, sample);
                    }
                    let average = *sum / (first + count) as f64;
                    working.set_pixel(row, col, average);
                    on_pixel(row, col, self.to_display(average));
                }
            });
            done += count;
            batch = batch.saturating_mul(2);
            debug!(samples = done, budget = self.config.preview_spp, "preview pass finished");
        }

        if stop.is_stopped() {
            info!(samples = done, "preview stopped early");
        } else {
            info!(samples = done, "preview complete");
        }
        Ok(())
    }

    fn final_render(
        &self,
        on_pixel: PixelSink<'_>,
        on_complete: &mut dyn FnMut(Vec<Radiance>),
    ) -> Result<()> {
        let width = self.config.width;
        let spp = self.config.spp.max(1);

        let pixels: Vec<Radiance> = (0..width * self.config.height)
            .into_par_iter()
            .map(|idx| {
                let row = idx / width;
                let col = idx % width;
                let sum: Radiance = (0..spp)
                    .map(|sample| self.sample_pixel(&self.renderer, row, col, sample))
                    .sum();
                let average = sum / spp as f64;
                on_pixel(row, col, self.to_display(average));
                average
            })
            .collect();

        debug!(spp, "final pass finished");
        on_complete(pixels);
        Ok(())
    }
}
