//! The producer side of the pipeline: anything that can render an image in
//! two phases while reporting pixels through callbacks.

mod parallel;

use crate::raytracer::color::{DisplayColor, Radiance};
use crate::raytracer::error::Result;
use crate::raytracer::framebuffer::RadianceBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use parallel::{ParallelProducer, ProducerConfig};

/// Per-pixel callback `(row, col, color)`. May be called from any thread.
pub type PixelSink<'a> = &'a (dyn Fn(usize, usize, DisplayColor) + Sync);

/// Opaque request to end the preview pass early. Does not wait for it.
pub type StopAction = Box<dyn FnOnce() + Send>;

pub trait Producer {
    fn height(&self) -> usize;
    fn width(&self) -> usize;
    fn samples_per_pixel(&self) -> u32;

    /// Fast progressive pass. Must call `on_start` exactly once, before the
    /// first pixel, with its working buffer and a way to stop it.
    fn evolving_render(
        &self,
        on_pixel: PixelSink<'_>,
        on_start: &mut dyn FnMut(Arc<RadianceBuffer>, StopAction),
    ) -> Result<()>;

    /// Full-quality pass. Calls `on_complete` once with the row-major image.
    fn final_render(
        &self,
        on_pixel: PixelSink<'_>,
        on_complete: &mut dyn FnMut(Vec<Radiance>),
    ) -> Result<()>;
}

/// Shared flag a producer polls between units of work.
#[derive(Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn action(&self) -> StopAction {
        let signal = self.clone();
        Box::new(move || signal.stop())
    }
}
